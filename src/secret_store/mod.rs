//! Namespaced key/value persistence for wallet secrets and settings.
//!
//! Values are opaque strings stored under `<namespace>:<key>`. One backend
//! serves calls at a time:
//!
//! ```text
//! SecretStore
//!     ├── KeychainBackend   native secret service, preferred
//!     ├── FileBackend       0600 JSON file of AES-GCM sealed values, used
//!     │                     when the native service is missing or fails
//!     │                     at call time
//!     └── MemoryBackend     process local, for tests and dry runs
//! ```
//!
//! Switching from the native service to the file happens at most once per
//! process and is retried transparently, so callers never see
//! [`BackendError::Unavailable`].

mod capability;
mod file_backend;
mod keychain;
mod memory;

use std::fmt;

pub use capability::BackendCapability;
pub use capability::HostEnvironment;
pub use capability::HostOs;
pub use file_backend::FileBackend;
pub use keychain::KeychainBackend;
pub use memory::MemoryBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config_models::data_directory::DataDirectory;
use crate::error::Result;
use crate::error::WalletError;

/// Key namespaces. The string form is the prefix before `:`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Namespace {
    /// encrypted private keys
    Wallet,
    Network,
    Address,
    /// single valued settings such as the active network
    Config,
}

impl Namespace {
    pub fn key(&self, key: &str) -> String {
        format!("{self}:{key}")
    }
}

/// Which backend is serving calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum BackendKind {
    Keychain,
    File,
    Memory,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// the backend cannot be used on this host right now
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// the backend is usable but rejected this call
    #[error("platform error: {0}")]
    Platform(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("corrupt secret file: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// a stored value failed authenticated decryption
    #[error("sealed secret file entry: {0}")]
    Sealed(String),
}

/// A flat string map. Keys arrive fully namespaced.
pub trait SecretBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Checks whether calls are expected to succeed, without side effects.
    fn probe(&self) -> BackendCapability;

    /// Inserts or replaces.
    fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError>;

    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Removing an absent key is not an error.
    fn delete(&mut self, key: &str) -> Result<(), BackendError>;

    /// All keys currently stored, in no particular order.
    fn keys(&self) -> Result<Vec<String>, BackendError>;
}

pub struct SecretStore {
    active: Box<dyn SecretBackend>,

    /// taken when the active backend reports it is unavailable
    fallback: Option<Box<dyn SecretBackend>>,
}

impl SecretStore {
    /// Selects a backend for this process.
    ///
    /// The native secret service is used when the host looks capable of
    /// running it and a probe succeeds; otherwise the file in `data_dir`.
    pub fn open(host: &HostEnvironment, service: &str, data_dir: &DataDirectory) -> Self {
        let file = FileBackend::new(data_dir.secrets_file_path());

        if let BackendCapability::Unavailable(reason) = host.native_capability() {
            warn!("Native secret service unusable ({reason}); storing secrets in {}", file);
            return Self::with_backend(Box::new(file));
        }

        let keychain = KeychainBackend::new(service);
        match keychain.probe() {
            BackendCapability::Available => {
                info!("Using native secret service '{service}'");
                Self::with_fallback(Box::new(keychain), Box::new(file))
            }
            BackendCapability::Unavailable(reason) => {
                warn!("Native secret service unusable ({reason}); storing secrets in {}", file);
                Self::with_backend(Box::new(file))
            }
        }
    }

    pub fn with_backend(backend: Box<dyn SecretBackend>) -> Self {
        Self {
            active: backend,
            fallback: None,
        }
    }

    /// `primary` serves calls until it reports itself unavailable.
    pub fn with_fallback(
        primary: Box<dyn SecretBackend>,
        fallback: Box<dyn SecretBackend>,
    ) -> Self {
        Self {
            active: primary,
            fallback: Some(fallback),
        }
    }

    pub fn in_memory() -> Self {
        Self::with_backend(Box::new(MemoryBackend::default()))
    }

    pub fn active_backend(&self) -> BackendKind {
        self.active.kind()
    }

    pub fn set(&mut self, namespace: Namespace, key: &str, value: &str) -> Result<()> {
        let full_key = namespace.key(key);
        self.with_retry(|backend| backend.set(&full_key, value))?;
        debug!("stored {full_key}");
        Ok(())
    }

    pub fn get(&mut self, namespace: Namespace, key: &str) -> Result<Option<String>> {
        let full_key = namespace.key(key);
        self.with_retry(|backend| backend.get(&full_key))
    }

    pub fn delete(&mut self, namespace: Namespace, key: &str) -> Result<()> {
        let full_key = namespace.key(key);
        self.with_retry(|backend| backend.delete(&full_key))?;
        debug!("deleted {full_key}");
        Ok(())
    }

    pub fn contains(&mut self, namespace: Namespace, key: &str) -> Result<bool> {
        Ok(self.get(namespace, key)?.is_some())
    }

    /// Keys in `namespace` with the namespace stripped, sorted.
    pub fn list_by_prefix(&mut self, namespace: Namespace) -> Result<Vec<String>> {
        let prefix = namespace.key("");
        let mut keys: Vec<String> = self
            .with_retry(|backend| backend.keys())?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect();
        keys.sort();
        Ok(keys)
    }

    pub fn get_json<T: DeserializeOwned>(
        &mut self,
        namespace: Namespace,
        key: &str,
    ) -> Result<Option<T>> {
        match self.get(namespace, key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&mut self, namespace: Namespace, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.set(namespace, key, &text)
    }

    /// Runs `op` on the active backend. If it reports itself unavailable and
    /// a fallback is pending, the fallback becomes active and `op` runs once
    /// more against it.
    fn with_retry<T>(
        &mut self,
        mut op: impl FnMut(&mut dyn SecretBackend) -> Result<T, BackendError>,
    ) -> Result<T> {
        match op(self.active.as_mut()) {
            Err(BackendError::Unavailable(reason)) => {
                let Some(fallback) = self.fallback.take() else {
                    return Err(WalletError::BackendUnavailable(reason));
                };
                warn!(
                    "{} backend unavailable ({reason}); switching to {} backend",
                    self.active.kind(),
                    fallback.kind()
                );
                self.active = fallback;
                Ok(op(self.active.as_mut())?)
            }
            result => Ok(result?),
        }
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("active", &self.active.kind())
            .field("fallback", &self.fallback.as_ref().map(|b| b.kind()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    /// Fails every call as if the session bus went away.
    struct Broken;

    impl SecretBackend for Broken {
        fn kind(&self) -> BackendKind {
            BackendKind::Keychain
        }
        fn probe(&self) -> BackendCapability {
            BackendCapability::Unavailable("no session bus".into())
        }
        fn set(&mut self, _: &str, _: &str) -> Result<(), BackendError> {
            Err(BackendError::Unavailable("no session bus".into()))
        }
        fn get(&self, _: &str) -> Result<Option<String>, BackendError> {
            Err(BackendError::Unavailable("no session bus".into()))
        }
        fn delete(&mut self, _: &str) -> Result<(), BackendError> {
            Err(BackendError::Unavailable("no session bus".into()))
        }
        fn keys(&self) -> Result<Vec<String>, BackendError> {
            Err(BackendError::Unavailable("no session bus".into()))
        }
    }

    #[test]
    fn namespaced_keys() {
        assert_eq!("wallet:PR6abc", Namespace::Wallet.key("PR6abc"));
        assert_eq!("config:activeNetwork", Namespace::Config.key("activeNetwork"));
        assert_eq!(Namespace::Address, "address".parse().unwrap());
    }

    #[test]
    fn namespaces_do_not_leak_into_each_other() {
        let mut store = SecretStore::in_memory();
        store.set(Namespace::Network, "main", "n").unwrap();
        store.set(Namespace::Address, "PR6a", "a").unwrap();
        store.set(Namespace::Address, "PR6b", "b").unwrap();

        assert_eq!(vec!["PR6a", "PR6b"], store.list_by_prefix(Namespace::Address).unwrap());
        assert_eq!(vec!["main"], store.list_by_prefix(Namespace::Network).unwrap());
        assert!(store.list_by_prefix(Namespace::Wallet).unwrap().is_empty());
        assert_eq!(None, store.get(Namespace::Wallet, "main").unwrap());
    }

    #[test]
    fn set_replaces_and_delete_is_idempotent() {
        let mut store = SecretStore::in_memory();
        store.set(Namespace::Config, "activeNetwork", "main").unwrap();
        store.set(Namespace::Config, "activeNetwork", "testnet").unwrap();
        assert_eq!(
            Some("testnet".to_string()),
            store.get(Namespace::Config, "activeNetwork").unwrap()
        );

        store.delete(Namespace::Config, "activeNetwork").unwrap();
        store.delete(Namespace::Config, "activeNetwork").unwrap();
        assert!(!store.contains(Namespace::Config, "activeNetwork").unwrap());
    }

    #[traced_test]
    #[test]
    fn unavailable_backend_falls_back_once_and_retries() {
        let mut store =
            SecretStore::with_fallback(Box::new(Broken), Box::new(MemoryBackend::default()));
        assert_eq!(BackendKind::Keychain, store.active_backend());

        store.set(Namespace::Wallet, "id", "secret").unwrap();

        assert_eq!(BackendKind::Memory, store.active_backend());
        assert!(logs_contain("switching to memory backend"));
        assert_eq!(
            Some("secret".to_string()),
            store.get(Namespace::Wallet, "id").unwrap()
        );
    }

    #[test]
    fn unavailable_without_fallback_is_reported() {
        let mut store = SecretStore::with_backend(Box::new(Broken));
        assert!(matches!(
            store.get(Namespace::Wallet, "id"),
            Err(WalletError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn json_values() {
        let mut store = SecretStore::in_memory();
        store
            .set_json(Namespace::Network, "main", &vec![1u8, 2, 3])
            .unwrap();
        let read: Option<Vec<u8>> = store.get_json(Namespace::Network, "main").unwrap();
        assert_eq!(Some(vec![1, 2, 3]), read);
    }
}
