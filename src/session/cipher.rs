//! AES-256-GCM authenticated encryption for stored secrets

use aes_gcm::aead::Aead;
use aes_gcm::aead::KeyInit;
use aes_gcm::Aes256Gcm;
use aes_gcm::Nonce;
use rand::Rng;
use zeroize::Zeroizing;

use crate::error::Result;
use crate::error::WalletError;

pub const NONCE_LEN: usize = 12;

pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Create cipher from 256-bit key
    pub fn new(key: &[u8; 32]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| WalletError::Crypto(format!("Invalid AES key: {}", e)))?;
        Ok(Self { cipher })
    }

    /// Generate random 96-bit nonce
    pub fn generate_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce);
        nonce
    }

    /// Returns ciphertext with authentication tag appended
    pub fn encrypt(&self, plaintext: &[u8], nonce: &[u8; NONCE_LEN]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce);

        self.cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| WalletError::Crypto(format!("Encryption failed: {}", e)))
    }

    /// A wrong key and a modified ciphertext fail the same way.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8; NONCE_LEN]) -> Result<Zeroizing<Vec<u8>>> {
        let nonce = Nonce::from_slice(nonce);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| WalletError::IncorrectPasswordOrCorruptData)
    }
}
