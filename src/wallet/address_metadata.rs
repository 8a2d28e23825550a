use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::WalletError;
use crate::keys::Address;

pub const MAX_LABEL_LEN: usize = 64;

/// How the private key of an address entered the wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AddressOrigin {
    Generated,
    Mnemonic,
    PrivateKey,
}

/// Plain metadata stored under `address:<address>`. The private key itself
/// lives encrypted under `wallet:<address>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressMetadata {
    pub name: String,
    pub address: Address,
    pub network: String,
    pub prefix: String,
    pub public_key: String,
    pub origin: AddressOrigin,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub imported_at: Option<DateTime<Utc>>,
}

impl AddressMetadata {
    /// Generated addresses carry `createdAt`, imported ones `importedAt`.
    pub fn stamp(&mut self, at: DateTime<Utc>) {
        match self.origin {
            AddressOrigin::Generated => self.created_at = Some(at),
            AddressOrigin::Mnemonic | AddressOrigin::PrivateKey => self.imported_at = Some(at),
        }
    }
}

pub fn validate_label(label: &str) -> Result<()> {
    let len = label.chars().count();
    if (1..=MAX_LABEL_LEN).contains(&len) && !label.chars().any(char::is_control) {
        Ok(())
    } else {
        Err(WalletError::Validation(format!(
            "label must be 1-{MAX_LABEL_LEN} printable characters"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    fn metadata(origin: AddressOrigin) -> AddressMetadata {
        let key_pair = KeyPair::generate();
        AddressMetadata {
            name: "savings".into(),
            address: Address::derive(&key_pair.public_point(), "PR"),
            network: "main".into(),
            prefix: "PR".into(),
            public_key: key_pair.public_point().to_hex(),
            origin,
            created_at: None,
            imported_at: None,
        }
    }

    #[test]
    fn generated_addresses_are_created() {
        let mut generated = metadata(AddressOrigin::Generated);
        generated.stamp(Utc::now());

        let json = serde_json::to_value(&generated).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("importedAt").is_none());
        assert_eq!("generated", json["origin"]);
    }

    #[test]
    fn imported_addresses_are_imported() {
        let mut imported = metadata(AddressOrigin::PrivateKey);
        imported.stamp(Utc::now());

        let json = serde_json::to_value(&imported).unwrap();
        assert!(json.get("createdAt").is_none());
        assert!(json.get("importedAt").is_some());
        assert_eq!("private-key", json["origin"]);

        let parsed: AddressMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(imported, parsed);
    }

    #[test]
    fn labels() {
        assert!(validate_label("savings").is_ok());
        assert!(validate_label("für Oma").is_ok());
        assert!(validate_label("").is_err());
        assert!(validate_label(&"x".repeat(65)).is_err());
        assert!(validate_label("tab\there").is_err());
    }
}
