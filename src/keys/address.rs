//! Human readable addresses.
//!
//! An address is `<chain prefix><base58 payload>` where the payload is
//!
//! ```text
//! 0x83 ‖ RIPEMD160(SHA256(SHA256(public point hex))) ‖ embedded checksum ‖ outer checksum
//! ```
//!
//! The embedded checksum covers `0x83 ‖ digest` and the outer checksum covers
//! everything before it, both as the first four bytes of a double SHA-256.
//! Both checksums are kept because addresses already issued on the network
//! carry them.
//!
//! With version byte `0x83` every payload encodes to a base58 string starting
//! with `6`, which keeps the boundary between prefix and payload visible.

use std::fmt;
use std::str::FromStr;

use ripemd::Ripemd160;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use super::key_pair::PublicPoint;
use crate::config_models::network::KnownNetwork;
use crate::error::Result;
use crate::error::WalletError;

pub const ADDRESS_VERSION_BYTE: u8 = 0x83;
pub const CHECKSUM_LEN: usize = 4;

/// A chain prefix followed by the base58 payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Derives the address of `public_point` on the chain identified by
    /// `chain_prefix`. Pure: equal inputs always give the same text.
    pub fn derive(public_point: &PublicPoint, chain_prefix: &str) -> Self {
        let inner = sha256d(public_point.to_hex().as_bytes());
        let digest = Ripemd160::digest(inner);

        let mut payload = Vec::with_capacity(1 + digest.len() + 2 * CHECKSUM_LEN);
        payload.push(ADDRESS_VERSION_BYTE);
        payload.extend_from_slice(&digest);
        let embedded = checksum(&payload);
        payload.extend_from_slice(&embedded);
        let outer = checksum(&payload);
        payload.extend_from_slice(&outer);

        Self(format!("{chain_prefix}{}", bs58::encode(payload).into_string()))
    }

    /// True iff `text` is a well formed address whose trailing checksum
    /// verifies. Never fails: malformed input of any kind is just `false`.
    pub fn is_valid(text: &str) -> bool {
        let Some((_prefix, encoded)) = resolve_prefix(text) else {
            return false;
        };
        let Ok(payload) = bs58::decode(encoded).into_vec() else {
            return false;
        };
        if payload.len() <= CHECKSUM_LEN {
            return false;
        }
        let (body, trailing) = payload.split_at(payload.len() - CHECKSUM_LEN);
        checksum(body).as_slice() == trailing
    }

    /// The chain prefix, as resolved by [`resolve_prefix`].
    pub fn prefix(&self) -> &str {
        resolve_prefix(&self.0).map_or("", |(prefix, _)| prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = WalletError;

    /// Parses and validates.
    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        if Self::is_valid(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(WalletError::Validation(format!("invalid address '{text}'")))
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits an address into `(chain prefix, base58 payload)`.
///
/// Two stages, in order:
///
/// 1. recognized prefixes of the built-in networks, longest first. A match
///    only counts when the character after it is not an uppercase letter, so
///    `PR` does not claim an address whose prefix is `PRX`.
/// 2. otherwise the longest leading run of ASCII uppercase letters.
///
/// Returns `None` when no non-empty payload remains.
pub fn resolve_prefix(address: &str) -> Option<(&str, &str)> {
    let mut recognized = KnownNetwork::recognized_prefixes();
    recognized.sort_by_key(|prefix| std::cmp::Reverse(prefix.len()));

    let known = recognized.into_iter().find(|prefix| {
        address
            .strip_prefix(*prefix)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_uppercase()))
    });

    let split_at = match known {
        Some(prefix) => prefix.len(),
        None => address
            .find(|c: char| !c.is_ascii_uppercase())
            .unwrap_or(address.len()),
    };

    let (prefix, payload) = address.split_at(split_at);
    (!payload.is_empty()).then_some((prefix, payload))
}

fn sha256d(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = sha256d(data);
    [hash[0], hash[1], hash[2], hash[3]]
}
