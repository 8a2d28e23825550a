//! On-disk shapes of the encrypted secret and the master credential.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use zeroize::Zeroizing;

use super::cipher::SecretCipher;
use super::cipher::NONCE_LEN;
use super::key_manager::Argon2Params;
use super::key_manager::MasterKey;
use super::key_manager::KEY_LEN;
use super::key_manager::SALT_LEN;
use crate::error::Result;
use crate::error::WalletError;

pub const MASTER_CREDENTIAL_VERSION: u8 = 1;

/// One stored private key, written under `wallet:<id>`.
///
/// Every store draws a new salt and IV, so storing the same plaintext twice
/// gives unrelated records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    /// hex, AES-256-GCM output with the tag appended
    pub ciphertext: String,
    /// hex, HKDF salt of the per-secret key
    pub salt: String,
    /// hex, 96 bit GCM nonce
    pub iv: String,
    pub timestamp: DateTime<Utc>,
}

impl EncryptedSecret {
    pub fn seal(master_key: &MasterKey, plaintext: &str, timestamp: DateTime<Utc>) -> Result<Self> {
        let salt = MasterKey::generate_salt();
        let iv = SecretCipher::generate_nonce();

        let key = master_key.derive_secret_key(&salt);
        let ciphertext = SecretCipher::new(&key)?.encrypt(plaintext.as_bytes(), &iv)?;

        Ok(Self {
            ciphertext: hex::encode(ciphertext),
            salt: hex::encode(salt),
            iv: hex::encode(iv),
            timestamp,
        })
    }

    /// Any malformed field is treated like a failed authentication tag.
    pub fn open(&self, master_key: &MasterKey) -> Result<Zeroizing<String>> {
        let salt: [u8; SALT_LEN] = decode_fixed(&self.salt)?;
        let iv: [u8; NONCE_LEN] = decode_fixed(&self.iv)?;
        let ciphertext =
            hex::decode(&self.ciphertext).map_err(|_| WalletError::IncorrectPasswordOrCorruptData)?;

        let key = master_key.derive_secret_key(&salt);
        let plaintext = SecretCipher::new(&key)?.decrypt(&ciphertext, &iv)?;

        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| WalletError::IncorrectPasswordOrCorruptData)?;
        Ok(Zeroizing::new(text.to_string()))
    }
}

/// What setup persists. The master password itself is never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterCredential {
    /// minutes, 0 means every secret access prompts
    pub session_timeout: u32,
    pub setup_date: DateTime<Utc>,
    pub version: u8,
    /// hex
    pub master_salt: String,
    /// hex
    pub master_hash: String,
    #[serde(default)]
    pub kdf: Argon2Params,
}

impl MasterCredential {
    /// Derives the master key with a fresh salt. Returns the key as well so
    /// the caller can open a session without a second Argon2 run.
    pub fn create(
        password: &str,
        session_timeout: u32,
        kdf: Argon2Params,
        setup_date: DateTime<Utc>,
    ) -> Result<(Self, MasterKey)> {
        let salt = MasterKey::generate_salt();
        let master_key = MasterKey::from_password(password, &salt, &kdf)?;

        let credential = Self {
            session_timeout,
            setup_date,
            version: MASTER_CREDENTIAL_VERSION,
            master_salt: hex::encode(salt),
            master_hash: hex::encode(master_key.verification_hash()),
            kdf,
        };
        Ok((credential, master_key))
    }

    /// The master key for `candidate`, or `None` if it is the wrong password.
    pub fn unlock(&self, candidate: &str) -> Result<Option<MasterKey>> {
        let salt: [u8; SALT_LEN] = decode_fixed(&self.master_salt)?;
        let expected: [u8; KEY_LEN] = decode_fixed(&self.master_hash)?;

        let master_key = MasterKey::from_password(candidate, &salt, &self.kdf)?;
        Ok((master_key.verification_hash() == expected).then_some(master_key))
    }

    pub fn from_json(json: &[u8]) -> Result<Self> {
        let credential: Self = serde_json::from_slice(json)?;
        if credential.version != MASTER_CREDENTIAL_VERSION {
            return Err(WalletError::Validation(
                "unsupported master credential version".to_string(),
            ));
        }
        Ok(credential)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

fn decode_fixed<const N: usize>(text: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(text).map_err(|_| WalletError::IncorrectPasswordOrCorruptData)?;
    bytes
        .try_into()
        .map_err(|_| WalletError::IncorrectPasswordOrCorruptData)
}
