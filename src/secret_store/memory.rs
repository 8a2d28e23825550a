use std::collections::HashMap;

use super::BackendCapability;
use super::BackendError;
use super::BackendKind;
use super::SecretBackend;

/// Lives as long as the process. Nothing touches the disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl SecretBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn probe(&self) -> BackendCapability {
        BackendCapability::Available
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.entries.get(key).cloned())
    }

    fn delete(&mut self, key: &str) -> Result<(), BackendError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.entries.keys().cloned().collect())
    }
}
