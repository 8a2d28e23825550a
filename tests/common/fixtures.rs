//! Test doubles shared by the integration tests and the `session` unit tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use wallet_core::config_models::data_directory::DataDirectory;
use wallet_core::secret_store::BackendCapability;
use wallet_core::secret_store::BackendError;
use wallet_core::secret_store::BackendKind;
use wallet_core::secret_store::SecretBackend;
use wallet_core::secret_store::SecretStore;
use wallet_core::session::Argon2Params;
use wallet_core::session::AuditIdentity;
use wallet_core::session::Clock;
use wallet_core::session::PasswordPrompt;
use wallet_core::session::SessionManager;
use wallet_core::Result;
use wallet_core::WalletError;
use zeroize::Zeroizing;

pub const PASSWORD: &str = "CorrectHorse1!";

pub const ALL_ZERO_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon \
    abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon \
    abandon abandon abandon abandon abandon abandon art";

/// Address of [`ALL_ZERO_PHRASE`] on a network with prefix `PR`.
pub const ALL_ZERO_ADDRESS: &str = "PR6yxArWSL9q8W6oofZTrM1HWj69DKiaFUDiA32JqU";

/// Answers password prompts from a queue and counts how often it was asked.
/// An empty queue behaves like the user pressing Ctrl-C.
#[derive(Clone, Default)]
pub struct ScriptedPrompt {
    answers: Arc<Mutex<VecDeque<String>>>,
    asked: Arc<Mutex<usize>>,
}

impl ScriptedPrompt {
    pub fn push(&self, answer: &str) {
        self.answers.lock().unwrap().push_back(answer.to_string());
    }

    pub fn asked(&self) -> usize {
        *self.asked.lock().unwrap()
    }
}

impl PasswordPrompt for ScriptedPrompt {
    fn prompt_password(&mut self, _message: &str) -> Result<Zeroizing<String>> {
        *self.asked.lock().unwrap() += 1;
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .map(Zeroizing::new)
            .ok_or(WalletError::Interrupted)
    }
}

/// A clock that only moves when told to.
#[derive(Clone)]
pub struct MockClock(Arc<Mutex<DateTime<Utc>>>);

impl MockClock {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Utc::now())))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// A native secret service that has lost its session bus: every call fails
/// with [`BackendError::Unavailable`].
pub struct UnavailableBackend;

impl UnavailableBackend {
    fn error() -> BackendError {
        BackendError::Unavailable("org.freedesktop.DBus.Error.ServiceUnknown".to_string())
    }
}

impl SecretBackend for UnavailableBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Keychain
    }

    fn probe(&self) -> BackendCapability {
        BackendCapability::Unavailable(Self::error().to_string())
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), BackendError> {
        Err(Self::error())
    }

    fn get(&self, _key: &str) -> Result<Option<String>, BackendError> {
        Err(Self::error())
    }

    fn delete(&mut self, _key: &str) -> Result<(), BackendError> {
        Err(Self::error())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        Err(Self::error())
    }
}

pub fn data_directory(root: &Path) -> DataDirectory {
    DataDirectory::get(Some(root.to_path_buf())).unwrap()
}

/// A session manager over `store` with cheap Argon2 parameters.
pub fn session_manager(
    root: &Path,
    store: SecretStore,
    prompt: &ScriptedPrompt,
    clock: &MockClock,
) -> SessionManager {
    SessionManager::new(
        store,
        data_directory(root),
        Argon2Params::insecure_fast(),
        Box::new(prompt.clone()),
        Box::new(clock.clone()),
        AuditIdentity {
            host: "test-host".to_string(),
            user: "tester".to_string(),
        },
    )
    .unwrap()
}
