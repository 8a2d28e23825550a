use std::fmt;
use std::str::FromStr;

use rand::Rng;
use secp256k1::PublicKey;
use secp256k1::Secp256k1;
use secp256k1::SecretKey;
use sha2::Digest;
use sha2::Sha256;
use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;
use zeroize::Zeroizing;

use crate::error::Result;
use crate::error::WalletError;

pub const PRIVATE_SCALAR_LEN: usize = 32;

/// A secp256k1 private scalar. Always in `[1, n-1]`.
///
/// The bytes are wiped when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateScalar([u8; PRIVATE_SCALAR_LEN]);

impl PrivateScalar {
    /// Accepts the bytes only if they are a valid scalar for the curve.
    pub fn from_bytes(bytes: &[u8; PRIVATE_SCALAR_LEN]) -> Result<Self> {
        SecretKey::from_slice(bytes)
            .map_err(|_| WalletError::Validation("private scalar out of range".to_string()))?;
        Ok(Self(*bytes))
    }

    pub fn as_bytes(&self) -> &[u8; PRIVATE_SCALAR_LEN] {
        &self.0
    }

    /// Lowercase hex text, as stored inside encrypted secrets.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0))
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = Zeroizing::new(
            hex::decode(text.trim())
                .map_err(|e| WalletError::Validation(format!("private key hex: {e}")))?,
        );
        let bytes: [u8; PRIVATE_SCALAR_LEN] = bytes.as_slice().try_into().map_err(|_| {
            WalletError::Validation(format!(
                "private key must be {PRIVATE_SCALAR_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Self::from_bytes(&bytes)
    }

    fn secret_key(&self) -> SecretKey {
        SecretKey::from_slice(&self.0).expect("scalar range is checked at construction")
    }
}

impl fmt::Debug for PrivateScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateScalar(..)")
    }
}

/// An uncompressed secp256k1 public point.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicPoint(PublicKey);

impl PublicPoint {
    /// `04 ‖ x ‖ y`, 65 bytes
    pub fn to_bytes(&self) -> [u8; 65] {
        self.0.serialize_uncompressed()
    }

    /// Lowercase hex of the uncompressed encoding. This text, not the raw
    /// bytes, is what address derivation hashes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

impl FromStr for PublicPoint {
    type Err = WalletError;

    fn from_str(text: &str) -> Result<Self> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| WalletError::Validation(format!("public key hex: {e}")))?;
        let key = PublicKey::from_slice(&bytes)
            .map_err(|e| WalletError::Validation(format!("public key: {e}")))?;
        Ok(Self(key))
    }
}

impl fmt::Display for PublicPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicPoint({})", self.to_hex())
    }
}

/// A private scalar together with its public point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    private_scalar: PrivateScalar,
    public_point: PublicPoint,
}

impl KeyPair {
    /// Samples a fresh key pair from the operating system's CSPRNG.
    ///
    /// Candidates outside the scalar range are rejected and redrawn, which
    /// happens with probability below 2^-127 per draw.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        loop {
            let mut candidate = Zeroizing::new([0u8; PRIVATE_SCALAR_LEN]);
            rng.fill(&mut *candidate);
            if let Ok(scalar) = PrivateScalar::from_bytes(&candidate) {
                return Self::from_scalar(scalar);
            }
        }
    }

    pub fn from_private_scalar(bytes: &[u8; PRIVATE_SCALAR_LEN]) -> Result<Self> {
        Ok(Self::from_scalar(PrivateScalar::from_bytes(bytes)?))
    }

    /// Maps 256 bits of mnemonic entropy to a key pair.
    ///
    /// Entropy that already is a valid scalar is used unchanged, so a key
    /// exported as a mnemonic recovers to itself. Entropy outside the scalar
    /// range (zero, or at least the group order) is hashed with SHA-256 until
    /// it lands in range.
    pub fn from_entropy(entropy: &[u8; PRIVATE_SCALAR_LEN]) -> Self {
        let mut candidate = Zeroizing::new(*entropy);
        loop {
            if let Ok(scalar) = PrivateScalar::from_bytes(&candidate) {
                return Self::from_scalar(scalar);
            }
            let digest: [u8; PRIVATE_SCALAR_LEN] = Sha256::digest(*candidate).into();
            *candidate = digest;
        }
    }

    pub(crate) fn from_scalar(private_scalar: PrivateScalar) -> Self {
        let secp = Secp256k1::signing_only();
        let public_point =
            PublicPoint(PublicKey::from_secret_key(&secp, &private_scalar.secret_key()));
        Self {
            private_scalar,
            public_point,
        }
    }

    pub fn private_scalar(&self) -> &PrivateScalar {
        &self.private_scalar
    }

    pub fn public_point(&self) -> PublicPoint {
        self.public_point
    }
}

#[cfg(test)]
mod tests {
    use test_strategy::proptest;

    use super::*;

    const GENERATOR_HEX: &str = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";

    fn scalar_one() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        bytes
    }

    #[test]
    fn scalar_one_maps_to_generator() {
        let key_pair = KeyPair::from_private_scalar(&scalar_one()).unwrap();
        assert_eq!(GENERATOR_HEX, key_pair.public_point().to_hex());
    }

    #[test]
    fn zero_scalar_is_rejected() {
        let err = KeyPair::from_private_scalar(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
    }

    #[test]
    fn scalar_above_group_order_is_rejected() {
        assert!(KeyPair::from_private_scalar(&[0xff; 32]).is_err());
    }

    #[test]
    fn zero_entropy_is_mapped_into_range() {
        let key_pair = KeyPair::from_entropy(&[0u8; 32]);
        assert_eq!(
            "66687aadf862bd776c8fc18b8e9f8e20089714856ee233b3902a591d0d5f2925",
            key_pair.private_scalar().to_hex().as_str()
        );
    }

    #[test]
    fn generated_key_pairs_differ() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.private_scalar(), b.private_scalar());
        assert_ne!(a.public_point(), b.public_point());
    }

    #[test]
    fn public_point_hex_is_uncompressed() {
        let hex_text = KeyPair::generate().public_point().to_hex();
        assert_eq!(130, hex_text.len());
        assert!(hex_text.starts_with("04"));
    }

    #[test]
    fn public_point_parses_its_own_hex() {
        let point = KeyPair::generate().public_point();
        assert_eq!(point, point.to_hex().parse::<PublicPoint>().unwrap());
    }

    #[test]
    fn private_scalar_hex_round_trips() {
        let key_pair = KeyPair::generate();
        let hex_text = key_pair.private_scalar().to_hex();
        let parsed = PrivateScalar::from_hex(&hex_text).unwrap();
        assert_eq!(key_pair.private_scalar(), &parsed);
    }

    #[test]
    fn short_private_key_hex_is_rejected() {
        assert!(matches!(
            PrivateScalar::from_hex("abcd"),
            Err(WalletError::Validation(_))
        ));
    }

    #[test]
    fn debug_output_hides_private_scalar() {
        let key_pair = KeyPair::from_private_scalar(&scalar_one()).unwrap();
        let debug = format!("{:?}", key_pair);
        assert!(debug.contains("PrivateScalar(..)"));
        assert!(!debug.contains(&"0".repeat(63)));
    }

    #[proptest(cases = 64)]
    fn valid_entropy_is_used_unchanged(bytes: [u8; 32]) {
        if let Ok(key_pair) = KeyPair::from_private_scalar(&bytes) {
            assert_eq!(key_pair, KeyPair::from_entropy(&bytes));
        }
    }
}
