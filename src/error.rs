//! provides error types related to key derivation, secret storage and
//! sessions.

use tracing::warn;

use crate::secret_store::BackendError;

/// enumerates possible wallet errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WalletError {
    /// malformed name, password, mnemonic or key input
    #[error("validation failed: {0}")]
    Validation(String),

    /// missing network, address, secret or master credential
    #[error("not found: {0}")]
    NotFound(String),

    /// authenticated decryption failed.
    ///
    /// a wrong password and a damaged ciphertext cannot be told apart, so both
    /// are reported as this one variant.
    #[error("incorrect password or corrupt data")]
    IncorrectPasswordOrCorruptData,

    /// a recovered address does not belong to the requested network
    #[error("address prefix mismatch: expected '{expected}', found '{actual}'")]
    PrefixMismatch { expected: String, actual: String },

    #[error("encoding error: {0}")]
    Encoding(String),

    /// the native secret service cannot be used.  The secret store recovers
    /// from this internally; it never reaches callers of the store.
    #[error("secret store backend unavailable: {0}")]
    BackendUnavailable(String),

    /// the user aborted an interactive prompt
    #[error("input cancelled by user")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// unexpected internal fault in a cryptographic primitive
    #[error("cryptographic failure: {0}")]
    Crypto(String),
}

impl WalletError {
    /// Process exit code for the command boundary.
    ///
    /// Structured results (bad input, missing records, wrong password) exit
    /// with 2; I/O and internal faults exit with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_)
            | Self::Serialization(_)
            | Self::Crypto(_)
            | Self::BackendUnavailable(_) => 1,
            _ => 2,
        }
    }
}

impl From<BackendError> for WalletError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unavailable(reason) => Self::BackendUnavailable(reason),
            BackendError::Platform(reason) => Self::Io(std::io::Error::other(reason)),
            BackendError::Io(e) => Self::Io(e),
            BackendError::Corrupt(e) => Self::Serialization(e),
            BackendError::Sealed(reason) => {
                warn!("Secret file entry rejected: {reason}");
                Self::IncorrectPasswordOrCorruptData
            }
        }
    }
}

pub type Result<T, E = WalletError> = std::result::Result<T, E>;
