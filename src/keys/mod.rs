//! Key pairs, addresses and mnemonic backups.
//!
//! Everything in here is pure: no I/O, no global state.

mod address;
mod key_pair;
mod mnemonic;

pub use address::resolve_prefix;
pub use address::Address;
pub use address::ADDRESS_VERSION_BYTE;
pub use key_pair::KeyPair;
pub use key_pair::PrivateScalar;
pub use key_pair::PublicPoint;
pub use key_pair::PRIVATE_SCALAR_LEN;
pub use mnemonic::MnemonicPhrase;
pub use mnemonic::MNEMONIC_WORD_COUNT;
use zeroize::Zeroizing;

use crate::error::Result;

pub fn derive_address(public_point: &PublicPoint, chain_prefix: &str) -> Address {
    Address::derive(public_point, chain_prefix)
}

pub fn validate_address(address: &str) -> bool {
    Address::is_valid(address)
}

pub fn mnemonic_from_entropy(private_scalar: &[u8]) -> Result<MnemonicPhrase> {
    MnemonicPhrase::from_entropy(private_scalar)
}

pub fn entropy_from_mnemonic(phrase: &str) -> Result<Zeroizing<[u8; PRIVATE_SCALAR_LEN]>> {
    phrase.parse::<MnemonicPhrase>()?.to_entropy()
}

pub fn recover_address(phrase: &str, chain_prefix: &str) -> Result<Address> {
    let (_, address) = phrase
        .parse::<MnemonicPhrase>()?
        .recover_address(chain_prefix)?;
    Ok(address)
}
