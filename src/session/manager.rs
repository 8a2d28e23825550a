use chrono::DateTime;
use chrono::Utc;
use serde_json::json;
use tracing::debug;
use tracing::info;
use tracing::warn;
use zeroize::Zeroizing;

use super::audit::AuditEntry;
use super::audit::AuditIdentity;
use super::audit::AuditLog;
use super::clock::Clock;
use super::clock::SystemClock;
use super::format::EncryptedSecret;
use super::format::MasterCredential;
use super::key_manager::Argon2Params;
use super::key_manager::MasterKey;
use super::password::PasswordPrompt;
use super::password::PasswordStrength;
use super::password::MIN_PASSWORD_LEN;
use super::state::Session;
use crate::config_models::data_directory::DataDirectory;
use crate::config_models::session_config::SessionConfig;
use crate::error::Result;
use crate::error::WalletError;
use crate::secret_store::Namespace;
use crate::secret_store::SecretStore;

pub const MAX_TIMEOUT_MINUTES: u32 = 60;

const UNLOCK_PROMPT: &str = "Master password: ";

/// Owns the master credential, the one [`Session`] of this process and the
/// secret store behind it.
pub struct SessionManager {
    store: SecretStore,
    data_dir: DataDirectory,
    kdf: Argon2Params,
    credential: Option<MasterCredential>,
    session: Session,
    prompt: Box<dyn PasswordPrompt>,
    clock: Box<dyn Clock>,
    audit: AuditLog,
}

impl SessionManager {
    /// Selects the secret store backend for this host and loads the master
    /// credential from `data_dir`, if setup has run.
    pub fn open(
        data_dir: DataDirectory,
        config: SessionConfig,
        prompt: Box<dyn PasswordPrompt>,
    ) -> Result<Self> {
        let store = SecretStore::open(&config.host, &config.keychain_service, &data_dir);
        Self::new(
            store,
            data_dir,
            config.kdf,
            prompt,
            Box::new(SystemClock),
            AuditIdentity::current(),
        )
    }

    pub fn new(
        store: SecretStore,
        data_dir: DataDirectory,
        kdf: Argon2Params,
        prompt: Box<dyn PasswordPrompt>,
        clock: Box<dyn Clock>,
        identity: AuditIdentity,
    ) -> Result<Self> {
        let credential = DataDirectory::read_if_exists(&data_dir.master_credential_file_path())?
            .map(|json| MasterCredential::from_json(&json))
            .transpose()?;
        let timeout = credential.as_ref().map_or(0, |c| c.session_timeout);
        let audit = AuditLog::new(data_dir.audit_log_file_path(), identity);

        debug!(
            "session manager over {} backend, configured: {}",
            store.active_backend(),
            credential.is_some()
        );

        Ok(Self {
            store,
            data_dir,
            kdf,
            credential,
            session: Session::inactive(timeout),
            prompt,
            clock,
            audit,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credential.is_some()
    }

    /// Session timeout in minutes, once setup has run.
    pub fn timeout_minutes(&self) -> Option<u32> {
        self.credential.as_ref().map(|c| c.session_timeout)
    }

    pub fn store(&mut self) -> &mut SecretStore {
        &mut self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Creates the master credential and opens a session with it.
    ///
    /// Running setup again replaces the credential; secrets sealed under the
    /// previous password can then no longer be opened.
    pub fn setup(&mut self, password: &str, confirmation: &str, timeout_minutes: u32) -> Result<()> {
        if password != confirmation {
            return Err(WalletError::Validation("passwords do not match".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(WalletError::Validation(format!(
                "master password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let timeout_minutes = timeout_minutes.min(MAX_TIMEOUT_MINUTES);
        if self.credential.is_some() {
            warn!("Replacing existing master credential");
        }

        let now = self.clock.now();
        let (credential, master_key) =
            MasterCredential::create(password, timeout_minutes, self.kdf, now)?;
        DataDirectory::write_owner_only(
            &self.data_dir.master_credential_file_path(),
            &credential.to_json()?,
        )?;
        self.credential = Some(credential);

        self.session = Session::inactive(timeout_minutes);
        self.session.activate(master_key, now);
        info!("Master password set up, session timeout {timeout_minutes} minutes");

        self.record_audit_or_warn("setup", "master", true, json!({ "sessionTimeout": timeout_minutes }));
        Ok(())
    }

    /// Asks the prompt for a new password twice and runs [`Self::setup`].
    /// Returns the advisory strength of the accepted password.
    pub fn setup_with_prompt(&mut self, timeout_minutes: u32) -> Result<PasswordStrength> {
        let password = self.prompt.prompt_password("New master password: ")?;
        let strength = PasswordStrength::of(&password);
        let confirmation = self.prompt.prompt_password("Confirm master password: ")?;
        self.setup(&password, &confirmation, timeout_minutes)?;
        Ok(strength)
    }

    /// Recomputes the hash of `candidate` with the stored salt. Does not open
    /// a session.
    pub fn verify_master_password(&self, candidate: &str) -> Result<bool> {
        Ok(self.credential()?.unlock(candidate)?.is_some())
    }

    /// Prompts for the master password now and opens a session.
    pub fn unlock(&mut self) -> Result<()> {
        self.master_key().map(|_| ())
    }

    /// Encrypts `plaintext` under a fresh salt and IV and stores it as
    /// `wallet:<id>`, replacing any previous value.
    pub fn store_secret(&mut self, id: &str, plaintext: &str) -> Result<()> {
        let result = self.master_key().and_then(|master_key| {
            let sealed = EncryptedSecret::seal(&master_key, plaintext, self.clock.now())?;
            self.store.set_json(Namespace::Wallet, id, &sealed)
        });
        self.finish("store_secret", id, result)
    }

    /// Decrypts `wallet:<id>`, prompting for the master password unless a
    /// valid session exists.
    pub fn retrieve_secret(&mut self, id: &str) -> Result<Zeroizing<String>> {
        let result = self.sealed_secret(id).and_then(|sealed| {
            let master_key = self.master_key()?;
            sealed.open(&master_key)
        });
        self.finish("retrieve_secret", id, result)
    }

    /// Removes `wallet:<id>`. Requires the master password like any other
    /// access to secrets.
    pub fn delete_secret(&mut self, id: &str) -> Result<()> {
        let result = self.sealed_secret(id).and_then(|_| {
            self.master_key()?;
            self.store.delete(Namespace::Wallet, id)
        });
        self.finish("delete_secret", id, result)
    }

    pub fn has_secret(&mut self, id: &str) -> Result<bool> {
        self.store.contains(Namespace::Wallet, id)
    }

    /// Persists a new timeout, clamped to `[0, 60]` minutes.
    pub fn change_timeout(&mut self, timeout_minutes: u32) -> Result<()> {
        let timeout_minutes = timeout_minutes.min(MAX_TIMEOUT_MINUTES);
        let mut credential = self.credential()?.clone();
        credential.session_timeout = timeout_minutes;
        DataDirectory::write_owner_only(
            &self.data_dir.master_credential_file_path(),
            &credential.to_json()?,
        )?;
        self.credential = Some(credential);
        self.session.set_timeout(timeout_minutes);

        self.record_audit_or_warn(
            "change_timeout",
            "master",
            true,
            json!({ "sessionTimeout": timeout_minutes }),
        );
        Ok(())
    }

    pub fn is_session_valid(&self) -> bool {
        self.session.is_valid(self.clock.now())
    }

    pub fn touch(&mut self) {
        self.session.touch(self.clock.now());
    }

    pub fn clear_session(&mut self) {
        if self.session.is_active() {
            info!("Session cleared");
        }
        self.session.clear();
    }

    pub fn record_audit(
        &mut self,
        action: &str,
        target: &str,
        success: bool,
        metadata: serde_json::Value,
    ) -> Result<()> {
        self.audit
            .append(self.clock.now(), action, target, success, metadata)
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }

    fn credential(&self) -> Result<&MasterCredential> {
        self.credential.as_ref().ok_or_else(|| {
            WalletError::NotFound("master credential, run setup first".to_string())
        })
    }

    fn sealed_secret(&mut self, id: &str) -> Result<EncryptedSecret> {
        self.store
            .get_json(Namespace::Wallet, id)?
            .ok_or_else(|| WalletError::NotFound(format!("secret for {id}")))
    }

    /// The master key from the session, or from a freshly prompted and
    /// verified password. Opens or refreshes the session on success.
    fn master_key(&mut self) -> Result<MasterKey> {
        let now = self.clock.now();
        if let Some(master_key) = self.session.key(now) {
            let master_key = master_key.clone();
            self.session.touch(now);
            return Ok(master_key);
        }

        let credential = self.credential()?.clone();
        let password = self.prompt.prompt_password(UNLOCK_PROMPT)?;
        let Some(master_key) = credential.unlock(&password)? else {
            self.record_audit_or_warn("unlock", "master", false, json!({}));
            return Err(WalletError::IncorrectPasswordOrCorruptData);
        };

        self.session.activate(master_key.clone(), self.clock.now());
        Ok(master_key)
    }

    fn finish<T>(&mut self, action: &str, target: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                self.session.touch(self.clock.now());
                self.record_audit_or_warn(action, target, true, json!({}));
            }
            Err(WalletError::NotFound(_) | WalletError::Interrupted) => {}
            Err(e) => {
                self.record_audit_or_warn(action, target, false, json!({ "error": e.to_string() }))
            }
        }
        result
    }

    fn record_audit_or_warn(
        &mut self,
        action: &str,
        target: &str,
        success: bool,
        metadata: serde_json::Value,
    ) {
        if let Err(e) = self.record_audit(action, target, success, metadata) {
            warn!("Could not write audit entry for {action}: {e}");
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.session.clear();
    }
}
