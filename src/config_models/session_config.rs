use crate::secret_store::HostEnvironment;
use crate::session::Argon2Params;

pub const DEFAULT_KEYCHAIN_SERVICE: &str = "wallet-core";

/// Settings fixed for the lifetime of one [`SessionManager`](crate::session::SessionManager).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Argon2id cost used by `setup`. Existing credentials keep the cost
    /// they were created with.
    pub kdf: Argon2Params,

    /// service name under which keychain entries are created
    pub keychain_service: String,

    pub host: HostEnvironment,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            kdf: Argon2Params::default(),
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
            host: HostEnvironment::from_env(),
        }
    }
}
