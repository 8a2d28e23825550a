use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::Result;
use crate::error::WalletError;

pub const MASTER_CREDENTIAL_FILE_NAME: &str = "master.json";
pub const AUDIT_LOG_FILE_NAME: &str = "audit.json";
pub const SECRETS_FILE_NAME: &str = "secrets.json";

#[derive(Debug, Clone)]
pub struct DataDirectory {
    data_dir: PathBuf,
}

impl DataDirectory {
    ///////////////////////////////////////////////////////////////////////////
    ///
    /// The data directory that holds the master credential, the audit log and
    /// the fallback secret file.
    ///
    /// The default varies by operating system, e.g.
    ///
    /// - Linux:   /home/alice/.local/share/wallet-core
    /// - Windows: C:\Users\Alice\AppData\Roaming\wallet-core\wallet-core\data
    /// - macOS:   /Users/Alice/Library/Application Support/org.wallet-core.wallet-core
    pub fn get(root_dir: Option<PathBuf>) -> Result<Self> {
        let project_dirs = root_dir
            .map(ProjectDirs::from_path)
            .unwrap_or_else(|| ProjectDirs::from("org", "wallet-core", "wallet-core"))
            .ok_or_else(|| WalletError::NotFound("could not determine data directory".into()))?;

        Ok(DataDirectory {
            data_dir: project_dirs.data_dir().to_path_buf(),
        })
    }

    /// Create directory if it does not exist
    pub fn create_dir_if_not_exists(dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| {
            WalletError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create data directory {}: {e}", dir.display()),
            ))
        })
    }

    /// Replaces `path` with `contents` in one step.
    ///
    /// The bytes go to a sibling temporary file first which is then renamed
    /// over the target, so readers see either the old or the new contents.
    /// On Unix the file is readable and writable by its owner only.
    pub fn write_owner_only(path: &Path, contents: &[u8]) -> Result<()> {
        let parent_dir = path.parent().ok_or_else(|| {
            WalletError::NotFound(format!("parent directory of {}", path.display()))
        })?;
        Self::create_dir_if_not_exists(parent_dir)?;

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = parent_dir.join(tmp_name);

        let mut file = Self::open_owner_only(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    #[cfg(unix)]
    fn open_owner_only(path: &Path) -> Result<fs::File> {
        // 0600 so that other users on the same machine cannot read secrets.
        use std::os::unix::prelude::OpenOptionsExt;
        Ok(fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .mode(0o600)
            .open(path)?)
    }

    #[cfg(not(unix))]
    fn open_owner_only(path: &Path) -> Result<fs::File> {
        Ok(fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)?)
    }

    /// Reads `path`, `None` if it does not exist.
    pub fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    ///////////////////////////////////////////////////////////////////////////
    ///
    /// The root data directory path
    pub fn root_dir_path(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// The master credential file path
    pub fn master_credential_file_path(&self) -> PathBuf {
        self.data_dir.join(Path::new(MASTER_CREDENTIAL_FILE_NAME))
    }

    /// The audit log file path
    pub fn audit_log_file_path(&self) -> PathBuf {
        self.data_dir.join(Path::new(AUDIT_LOG_FILE_NAME))
    }

    /// The file used by the secret store when no native secret service is
    /// available.
    pub fn secrets_file_path(&self) -> PathBuf {
        self.data_dir.join(Path::new(SECRETS_FILE_NAME))
    }
}

impl std::fmt::Display for DataDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.data_dir.display())
    }
}
