use keyring::Entry;

use super::BackendCapability;
use super::BackendError;
use super::BackendKind;
use super::SecretBackend;

/// Holds the list of keys written through this backend, since the native
/// secret services cannot be enumerated.
const INDEX_ENTRY: &str = "__index__";
const PROBE_ENTRY: &str = "__probe__";

/// The platform secret service (Keychain, Credential Manager, Secret
/// Service) through `keyring`. Each key is one credential of `service`.
#[derive(Debug, Clone)]
pub struct KeychainBackend {
    service: String,
}

impl KeychainBackend {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, BackendError> {
        Entry::new(&self.service, key).map_err(map_keyring_error)
    }

    fn read_index(&self) -> Result<Vec<String>, BackendError> {
        match self.entry(INDEX_ENTRY)?.get_password() {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(keyring::Error::NoEntry) => Ok(vec![]),
            Err(e) => Err(map_keyring_error(e)),
        }
    }

    fn write_index(&self, keys: &[String]) -> Result<(), BackendError> {
        let json = serde_json::to_string(keys)?;
        self.entry(INDEX_ENTRY)?
            .set_password(&json)
            .map_err(map_keyring_error)
    }
}

/// Missing bus or locked storage mean the service is unusable on this host;
/// anything else is a failure of the individual call.
fn map_keyring_error(e: keyring::Error) -> BackendError {
    match e {
        keyring::Error::PlatformFailure(e) | keyring::Error::NoStorageAccess(e) => {
            BackendError::Unavailable(e.to_string())
        }
        other => BackendError::Platform(other.to_string()),
    }
}

impl SecretBackend for KeychainBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Keychain
    }

    /// Reads a credential that never exists. `NoEntry` proves the service
    /// answered.
    fn probe(&self) -> BackendCapability {
        let result = self
            .entry(PROBE_ENTRY)
            .and_then(|entry| match entry.get_password() {
                Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(map_keyring_error(e)),
            });
        match result {
            Ok(()) => BackendCapability::Available,
            Err(e) => BackendCapability::Unavailable(e.to_string()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        self.entry(key)?
            .set_password(value)
            .map_err(map_keyring_error)?;

        let mut index = self.read_index()?;
        if !index.iter().any(|k| k == key) {
            index.push(key.to_string());
            self.write_index(&index)?;
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(map_keyring_error(e)),
        }
    }

    fn delete(&mut self, key: &str) -> Result<(), BackendError> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => return Err(map_keyring_error(e)),
        }

        let mut index = self.read_index()?;
        let before = index.len();
        index.retain(|k| k != key);
        if index.len() != before {
            self.write_index(&index)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        self.read_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bus_maps_to_unavailable() {
        let e = keyring::Error::PlatformFailure("org.freedesktop.DBus.Error.ServiceUnknown".into());
        assert!(matches!(map_keyring_error(e), BackendError::Unavailable(_)));

        let e = keyring::Error::NoStorageAccess("locked".into());
        assert!(matches!(map_keyring_error(e), BackendError::Unavailable(_)));
    }

    #[test]
    fn other_failures_map_to_platform() {
        let e = keyring::Error::TooLong("password".into(), 10);
        assert!(matches!(map_keyring_error(e), BackendError::Platform(_)));
    }
}
