//! BIP-39 backup phrases for private scalars.

use std::fmt;
use std::str::FromStr;

use bip39::Language;
use bip39::Mnemonic;
use itertools::Itertools;
use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;
use zeroize::Zeroizing;

use super::address::Address;
use super::key_pair::KeyPair;
use super::key_pair::PRIVATE_SCALAR_LEN;
use crate::error::Result;
use crate::error::WalletError;

/// Number of words encoding 256 bits of entropy plus an 8 bit checksum.
pub const MNEMONIC_WORD_COUNT: usize = 24;

/// Exactly 24 lowercase words from the English BIP-39 wordlist.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MnemonicPhrase(Vec<String>);

impl MnemonicPhrase {
    /// Deterministically encodes a 32 byte private scalar.
    pub fn from_entropy(entropy: &[u8]) -> Result<Self> {
        if entropy.len() != PRIVATE_SCALAR_LEN {
            return Err(WalletError::Encoding(format!(
                "mnemonic entropy must be {PRIVATE_SCALAR_LEN} bytes, got {}",
                entropy.len()
            )));
        }
        let mnemonic = Mnemonic::from_entropy(entropy, Language::English)
            .map_err(|e| WalletError::Encoding(e.to_string()))?;
        let words = mnemonic
            .phrase()
            .split(' ')
            .map(|s| s.to_string())
            .collect_vec();
        Ok(Self(words))
    }

    /// Decodes the phrase back into its 32 bytes of entropy.
    ///
    /// Fails with `Validation("word count")` when the phrase does not have
    /// exactly 24 words and with `Validation("checksum")` when the embedded
    /// checksum does not verify.
    pub fn to_entropy(&self) -> Result<Zeroizing<[u8; PRIVATE_SCALAR_LEN]>> {
        if self.0.len() != MNEMONIC_WORD_COUNT {
            return Err(WalletError::Validation("word count".to_string()));
        }
        let phrase = Zeroizing::new(self.0.iter().join(" "));
        let mnemonic = Mnemonic::from_phrase(&phrase, Language::English).map_err(|e| {
            match e.downcast_ref::<bip39::ErrorKind>() {
                Some(bip39::ErrorKind::InvalidChecksum) => {
                    WalletError::Validation("checksum".to_string())
                }
                Some(bip39::ErrorKind::InvalidWord) => {
                    WalletError::Validation("unknown word".to_string())
                }
                Some(bip39::ErrorKind::InvalidWordLength(_)) => {
                    WalletError::Validation("word count".to_string())
                }
                _ => WalletError::Validation(format!("mnemonic: {e}")),
            }
        })?;

        let mut entropy = Zeroizing::new([0u8; PRIVATE_SCALAR_LEN]);
        entropy.copy_from_slice(mnemonic.entropy());
        Ok(entropy)
    }

    pub fn words(&self) -> &[String] {
        &self.0
    }

    /// Recovers the address this phrase controls on the chain `chain_prefix`.
    ///
    /// The prefix resolved from the recovered address must equal the
    /// requested one; otherwise the phrase is rejected with `PrefixMismatch`.
    pub fn recover_address(&self, chain_prefix: &str) -> Result<(KeyPair, Address)> {
        let entropy = self.to_entropy()?;
        let key_pair = KeyPair::from_entropy(&entropy);
        let address = Address::derive(&key_pair.public_point(), chain_prefix);

        if address.prefix() != chain_prefix {
            return Err(WalletError::PrefixMismatch {
                expected: chain_prefix.to_string(),
                actual: address.prefix().to_string(),
            });
        }
        Ok((key_pair, address))
    }
}

impl FromStr for MnemonicPhrase {
    type Err = WalletError;

    /// Splits on any whitespace and lowercases. Word validity is checked by
    /// [`MnemonicPhrase::to_entropy`].
    fn from_str(text: &str) -> Result<Self> {
        Ok(Self(
            text.split_whitespace()
                .map(|word| word.to_lowercase())
                .collect_vec(),
        ))
    }
}

impl fmt::Display for MnemonicPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.iter().join(" "))
    }
}

impl fmt::Debug for MnemonicPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MnemonicPhrase({} words)", self.0.len())
    }
}
