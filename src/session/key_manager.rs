//! Argon2id key derivation for the master password
//!
//! The master password is stretched once into a master key. Everything else
//! is derived from the master key with HKDF-SHA256, which is cheap, so an
//! unlocked session never reruns Argon2.

use argon2::Argon2;
use argon2::ParamsBuilder;
use argon2::Version;
use hkdf::Hkdf;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::Result;
use crate::error::WalletError;

pub const SALT_LEN: usize = 32;
pub const KEY_LEN: usize = 32;

const VERIFICATION_INFO: &[u8] = b"wallet-core-master-verification-v1";
const SECRET_ENCRYPTION_INFO: &[u8] = b"wallet-core-secret-encryption-v1";

/// Argon2id cost parameters. Stored next to the master salt so that
/// verification always uses the parameters chosen at setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argon2Params {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    /// 256 MB, 4 iterations, 4 lanes. Takes about a second.
    fn default() -> Self {
        Self {
            memory_cost_kib: 262144,
            time_cost: 4,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Minimal cost. Only for tests.
    pub fn insecure_fast() -> Self {
        Self {
            memory_cost_kib: 256,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Master key derived from the master password (zeroed on drop)
#[derive(Clone)]
pub struct MasterKey {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl MasterKey {
    pub fn from_password(password: &str, salt: &[u8; SALT_LEN], params: &Argon2Params) -> Result<Self> {
        let params = ParamsBuilder::new()
            .m_cost(params.memory_cost_kib)
            .t_cost(params.time_cost)
            .p_cost(params.parallelism)
            .build()
            .map_err(|e| WalletError::Crypto(format!("Invalid Argon2 parameters: {}", e)))?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(password.as_bytes(), salt, &mut *key)
            .map_err(|e| WalletError::Crypto(format!("Argon2id key derivation failed: {}", e)))?;

        Ok(Self { key })
    }

    /// Generate random salt
    pub fn generate_salt() -> [u8; SALT_LEN] {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill(&mut salt);
        salt
    }

    /// The value persisted as `masterHash`. Reveals nothing about the keys
    /// used for encryption.
    pub fn verification_hash(&self) -> [u8; KEY_LEN] {
        let hkdf = Hkdf::<Sha256>::new(None, &*self.key);
        let mut hash = [0u8; KEY_LEN];
        hkdf.expand(VERIFICATION_INFO, &mut hash)
            .expect("HKDF expand failed (bug)");
        hash
    }

    /// Encryption key for one secret, bound to that secret's random salt.
    pub fn derive_secret_key(&self, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), &*self.key);
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        hkdf.expand(SECRET_ENCRYPTION_INFO, &mut *key)
            .expect("HKDF expand failed (bug)");
        key
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}
