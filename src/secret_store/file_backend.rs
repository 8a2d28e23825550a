use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use hkdf::Hkdf;
use rand::Rng;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::BackendCapability;
use super::BackendError;
use super::BackendKind;
use super::SecretBackend;
use crate::config_models::data_directory::DataDirectory;
use crate::error::WalletError;
use crate::session::cipher::SecretCipher;
use crate::session::cipher::NONCE_LEN;

const INSTALL_KEY_LEN: usize = 32;
const FILE_ENCRYPTION_INFO: &[u8] = b"wallet-core-file-backend-v1";

/// All entries in one JSON object, rewritten in full on every change.
///
/// Keys are stored as given. Every value is sealed with AES-256-GCM under a
/// key derived from a random per-install key kept next to the file
/// (`secrets.key` for `secrets.json`), so no master password is needed to
/// read network or address metadata.
///
/// The file is re-read on every call so that changes made by another process
/// are picked up. Concurrent writers are not coordinated; the last full
/// rewrite wins.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    key_path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        let key_path = path.with_extension("key");
        Self { path, key_path }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, BackendError> {
        match DataDirectory::read_if_exists(&self.path).map_err(into_backend_error)? {
            Some(bytes) if !bytes.is_empty() => Ok(serde_json::from_slice(&bytes)?),
            _ => Ok(BTreeMap::new()),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), BackendError> {
        let json = serde_json::to_vec_pretty(entries)?;
        DataDirectory::write_owner_only(&self.path, &json).map_err(into_backend_error)
    }

    /// The cipher of this install, `None` before the first write.
    fn cipher(&self) -> Result<Option<SecretCipher>, BackendError> {
        let Some(install_key) =
            DataDirectory::read_if_exists(&self.key_path).map_err(into_backend_error)?
        else {
            return Ok(None);
        };
        let install_key = Zeroizing::new(install_key);
        if install_key.len() != INSTALL_KEY_LEN {
            return Err(BackendError::Sealed(format!(
                "key file {} has {} bytes",
                self.key_path.display(),
                install_key.len()
            )));
        }
        derive_cipher(&install_key).map(Some)
    }

    /// Only an empty file may get a fresh key; existing entries would become
    /// unreadable.
    fn cipher_for_write(
        &self,
        entries: &BTreeMap<String, String>,
    ) -> Result<SecretCipher, BackendError> {
        if let Some(cipher) = self.cipher()? {
            return Ok(cipher);
        }
        if !entries.is_empty() {
            return Err(self.missing_key());
        }

        let mut install_key = Zeroizing::new([0u8; INSTALL_KEY_LEN]);
        rand::rng().fill(&mut *install_key);
        DataDirectory::write_owner_only(&self.key_path, &*install_key)
            .map_err(into_backend_error)?;
        derive_cipher(&*install_key)
    }

    fn missing_key(&self) -> BackendError {
        BackendError::Sealed(format!("key file {} is missing", self.key_path.display()))
    }
}

fn derive_cipher(install_key: &[u8]) -> Result<SecretCipher, BackendError> {
    let hkdf = Hkdf::<Sha256>::new(None, install_key);
    let mut key = Zeroizing::new([0u8; 32]);
    hkdf.expand(FILE_ENCRYPTION_INFO, &mut *key)
        .map_err(|e| BackendError::Platform(e.to_string()))?;
    SecretCipher::new(&key).map_err(into_backend_error)
}

/// `hex(nonce || ciphertext)`
fn seal(cipher: &SecretCipher, value: &str) -> Result<String, BackendError> {
    let nonce = SecretCipher::generate_nonce();
    let ciphertext = cipher
        .encrypt(value.as_bytes(), &nonce)
        .map_err(into_backend_error)?;
    let mut sealed = nonce.to_vec();
    sealed.extend_from_slice(&ciphertext);
    Ok(hex::encode(sealed))
}

fn open(cipher: &SecretCipher, key: &str, sealed: &str) -> Result<String, BackendError> {
    let undecryptable = || BackendError::Sealed(format!("entry {key} does not decrypt"));
    let bytes = hex::decode(sealed).map_err(|_| undecryptable())?;
    if bytes.len() < NONCE_LEN {
        return Err(undecryptable());
    }
    let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
    let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| undecryptable())?;
    let plaintext = cipher
        .decrypt(ciphertext, &nonce)
        .map_err(|_| undecryptable())?;
    String::from_utf8(plaintext.to_vec()).map_err(|_| undecryptable())
}

fn into_backend_error(e: WalletError) -> BackendError {
    match e {
        WalletError::Io(e) => BackendError::Io(e),
        other => BackendError::Platform(other.to_string()),
    }
}

impl SecretBackend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    fn probe(&self) -> BackendCapability {
        match self.load().and_then(|_| self.cipher()) {
            Ok(_) => BackendCapability::Available,
            Err(e) => BackendCapability::Unavailable(e.to_string()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut entries = self.load()?;
        let cipher = self.cipher_for_write(&entries)?;
        entries.insert(key.to_string(), seal(&cipher, value)?);
        self.save(&entries)
    }

    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let Some(sealed) = self.load()?.remove(key) else {
            return Ok(None);
        };
        let cipher = self.cipher()?.ok_or_else(|| self.missing_key())?;
        open(&cipher, key, &sealed).map(Some)
    }

    fn delete(&mut self, key: &str) -> Result<(), BackendError> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.load()?.into_keys().collect())
    }
}

impl fmt::Display for FileBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
