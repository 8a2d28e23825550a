//! Master password sessions and encryption of stored secrets
//!
//! ## Architecture
//!
//! ```text
//! Master Password (UTF-8)
//!     ↓ Argon2id (salt and cost from master.json)
//! Master Key (256 bits, cached while the session is valid)
//!     ├─ HKDF-SHA256 "verification"          → masterHash in master.json
//!     └─ HKDF-SHA256 (per-secret random salt) → secret key
//!            ↓ AES-256-GCM (random 96 bit IV)
//!        EncryptedSecret under wallet:<id>
//! ```
//!
//! A session is `NoSession → ActiveSession → NoSession`. It opens on the
//! first successful password check, slides forward on every authenticated
//! operation and closes on [`SessionManager::clear_session`], after the
//! configured idle timeout, or when the manager is dropped. A timeout of
//! zero never opens one.

pub use audit::AuditEntry;
pub use audit::AuditIdentity;
pub use audit::AuditLog;
pub use clock::Clock;
pub use clock::SystemClock;
pub use format::EncryptedSecret;
pub use format::MasterCredential;
pub use key_manager::Argon2Params;
pub use key_manager::MasterKey;
pub use manager::SessionManager;
pub use manager::MAX_TIMEOUT_MINUTES;
pub use password::EnvPrompt;
pub use password::PasswordPrompt;
pub use password::PasswordStrength;
pub use password::TerminalPrompt;
pub use password::MIN_PASSWORD_LEN;
pub use password::PASSWORD_ENV_VAR;
pub use state::Session;

mod audit;
pub(crate) mod cipher;
mod clock;
mod format;
mod key_manager;
mod manager;
mod password;
mod state;
