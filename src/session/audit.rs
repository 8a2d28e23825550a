use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sysinfo::System;
use tracing::warn;

use crate::config_models::data_directory::DataDirectory;
use crate::error::Result;

/// One sensitive operation. Never mutated after it is written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub target: String,
    pub success: bool,
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Who runs this process, stamped on every entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditIdentity {
    pub host: String,
    pub user: String,
}

impl AuditIdentity {
    pub fn current() -> Self {
        let host = System::host_name()
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|user| !user.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        Self { host, user }
    }
}

/// JSON array of [`AuditEntry`], oldest first, rewritten in full on every
/// append.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    identity: AuditIdentity,
}

impl AuditLog {
    pub fn new(path: PathBuf, identity: AuditIdentity) -> Self {
        Self { path, identity }
    }

    /// An unreadable log is logged and treated as empty so that auditing
    /// never blocks the operation being audited.
    pub fn entries(&self) -> Vec<AuditEntry> {
        match self.load() {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                warn!("Audit log {} is corrupt", self.path.display());
                vec![]
            }
            Err(e) => {
                warn!("Could not read audit log {}: {e}", self.path.display());
                vec![]
            }
        }
    }

    /// Appends one entry. A log that does not parse is first moved aside to
    /// `<name>.corrupt-<timestamp>` so that its history is kept; a log that
    /// cannot be read at all is left untouched and the write fails.
    pub fn append(
        &self,
        timestamp: DateTime<Utc>,
        action: &str,
        target: &str,
        success: bool,
        metadata: serde_json::Value,
    ) -> Result<()> {
        let mut entries = match self.load()? {
            Some(entries) => entries,
            None => {
                let preserved = self.preserve_corrupt(timestamp)?;
                warn!(
                    "Audit log {} is corrupt; moved it to {} and started a new one",
                    self.path.display(),
                    preserved.display()
                );
                vec![]
            }
        };
        entries.push(AuditEntry {
            timestamp,
            action: action.to_string(),
            target: target.to_string(),
            success,
            host: self.identity.host.clone(),
            user: self.identity.user.clone(),
            metadata,
        });
        let json = serde_json::to_vec_pretty(&entries)?;
        DataDirectory::write_owner_only(&self.path, &json)
    }

    /// `None` when the file exists but is not a list of entries.
    fn load(&self) -> Result<Option<Vec<AuditEntry>>> {
        match DataDirectory::read_if_exists(&self.path)? {
            None => Ok(Some(vec![])),
            Some(bytes) => Ok(serde_json::from_slice(&bytes).ok()),
        }
    }

    fn preserve_corrupt(&self, timestamp: DateTime<Utc>) -> Result<PathBuf> {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".corrupt-{}", timestamp.format("%Y%m%dT%H%M%S%.fZ")));
        let preserved = self.path.with_file_name(name);
        std::fs::rename(&self.path, &preserved)?;
        Ok(preserved)
    }
}
