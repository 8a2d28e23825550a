//! The operations offered to commands: networks, addresses and their keys.
//!
//! Network records, address metadata and the active selections are plain
//! values in the secret store. Private keys go through
//! [`SessionManager::store_secret`] and are only ever stored encrypted.

mod address_metadata;

pub use address_metadata::validate_label;
pub use address_metadata::AddressMetadata;
pub use address_metadata::AddressOrigin;
use serde_json::json;
use tracing::info;

use crate::config_models::network::validate_network_name;
use crate::config_models::network::NetworkRecord;
use crate::error::Result;
use crate::error::WalletError;
use crate::keys::Address;
use crate::keys::KeyPair;
use crate::keys::MnemonicPhrase;
use crate::keys::PrivateScalar;
use crate::secret_store::Namespace;
use crate::session::SessionManager;

pub const ACTIVE_NETWORK_KEY: &str = "activeNetwork";
pub const ACTIVE_ADDRESS_KEY: &str = "activeAddress";

pub struct Wallet {
    session: SessionManager,
}

impl Wallet {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&mut self) -> &mut SessionManager {
        &mut self.session
    }

    ///////////////////////////////////////////////////////////////////////////
    // networks

    pub fn add_network(&mut self, name: &str, url: &str, prefix: &str) -> Result<NetworkRecord> {
        if self.session.store().contains(Namespace::Network, name)? {
            return Err(WalletError::Validation(format!(
                "network '{name}' already exists"
            )));
        }
        let record = NetworkRecord::new(name, url, prefix, self.session.now())?;
        self.session
            .store()
            .set_json(Namespace::Network, name, &record)?;
        info!("Added network {name} ({url}, prefix {prefix})");
        Ok(record)
    }

    pub fn network(&mut self, name: &str) -> Result<NetworkRecord> {
        validate_network_name(name)?;
        self.session
            .store()
            .get_json(Namespace::Network, name)?
            .ok_or_else(|| WalletError::NotFound(format!("network '{name}'")))
    }

    pub fn networks(&mut self) -> Result<Vec<NetworkRecord>> {
        let names = self.session.store().list_by_prefix(Namespace::Network)?;
        names.iter().map(|name| self.network(name)).collect()
    }

    /// Removing the active network also clears the selection.
    pub fn remove_network(&mut self, name: &str) -> Result<()> {
        self.network(name)?;
        self.session.store().delete(Namespace::Network, name)?;
        if self.active_network_name()?.as_deref() == Some(name) {
            self.session
                .store()
                .delete(Namespace::Config, ACTIVE_NETWORK_KEY)?;
        }
        info!("Removed network {name}");
        Ok(())
    }

    /// Records the outcome of a connectivity check of `name`.
    pub fn record_network_test(&mut self, name: &str, success: bool) -> Result<NetworkRecord> {
        let mut record = self.network(name)?;
        record.record_test(success, self.session.now());
        self.session
            .store()
            .set_json(Namespace::Network, name, &record)?;
        Ok(record)
    }

    pub fn set_active_network(&mut self, name: &str) -> Result<()> {
        self.network(name)?;
        self.session
            .store()
            .set(Namespace::Config, ACTIVE_NETWORK_KEY, name)
    }

    pub fn active_network(&mut self) -> Result<Option<NetworkRecord>> {
        match self.active_network_name()? {
            Some(name) => Ok(Some(self.network(&name)?)),
            None => Ok(None),
        }
    }

    fn active_network_name(&mut self) -> Result<Option<String>> {
        self.session.store().get(Namespace::Config, ACTIVE_NETWORK_KEY)
    }

    /// The named network, or the active one when `name` is `None`.
    fn target_network(&mut self, name: Option<&str>) -> Result<NetworkRecord> {
        match name {
            Some(name) => self.network(name),
            None => self.active_network()?.ok_or_else(|| {
                WalletError::NotFound("active network, add one and select it first".to_string())
            }),
        }
    }

    ///////////////////////////////////////////////////////////////////////////
    // addresses

    /// Creates a fresh key pair on `network` (default: the active network).
    pub fn generate_address(
        &mut self,
        label: Option<&str>,
        network: Option<&str>,
    ) -> Result<AddressMetadata> {
        let network = self.target_network(network)?;
        let key_pair = KeyPair::generate();
        let address = Address::derive(&key_pair.public_point(), &network.prefix);
        self.add_key(key_pair, address, label, &network, AddressOrigin::Generated)
    }

    /// Recovers the key of a 24 word backup phrase. The recovered address
    /// must carry the prefix of `network`.
    pub fn import_mnemonic(
        &mut self,
        phrase: &str,
        label: Option<&str>,
        network: Option<&str>,
    ) -> Result<AddressMetadata> {
        let network = self.target_network(network)?;
        let phrase: MnemonicPhrase = phrase.parse()?;
        let (key_pair, address) = phrase.recover_address(&network.prefix)?;
        self.add_key(key_pair, address, label, &network, AddressOrigin::Mnemonic)
    }

    /// Imports a raw private key given as 64 hex characters.
    pub fn import_private_key(
        &mut self,
        private_key_hex: &str,
        label: Option<&str>,
        network: Option<&str>,
    ) -> Result<AddressMetadata> {
        let network = self.target_network(network)?;
        let scalar = PrivateScalar::from_hex(private_key_hex)?;
        let key_pair = KeyPair::from_private_scalar(scalar.as_bytes())?;
        let address = Address::derive(&key_pair.public_point(), &network.prefix);
        self.add_key(key_pair, address, label, &network, AddressOrigin::PrivateKey)
    }

    /// Decrypts the key of `address` and encodes it as a backup phrase.
    pub fn export_mnemonic(&mut self, address: &str) -> Result<MnemonicPhrase> {
        self.address(address)?;
        let private_key_hex = self.session.retrieve_secret(address)?;
        let scalar = PrivateScalar::from_hex(&private_key_hex)?;
        let phrase = MnemonicPhrase::from_entropy(scalar.as_bytes())?;
        self.session
            .record_audit("export_mnemonic", address, true, json!({}))?;
        Ok(phrase)
    }

    /// Deletes the encrypted key and the metadata of `address`.
    pub fn remove_address(&mut self, address: &str) -> Result<()> {
        self.address(address)?;
        self.session.delete_secret(address)?;
        self.session.store().delete(Namespace::Address, address)?;
        if self.active_address_text()?.as_deref() == Some(address) {
            self.session
                .store()
                .delete(Namespace::Config, ACTIVE_ADDRESS_KEY)?;
        }
        info!("Removed address {address}");
        Ok(())
    }

    pub fn address(&mut self, address: &str) -> Result<AddressMetadata> {
        self.session
            .store()
            .get_json(Namespace::Address, address)?
            .ok_or_else(|| WalletError::NotFound(format!("address {address}")))
    }

    pub fn addresses(&mut self) -> Result<Vec<AddressMetadata>> {
        let addresses = self.session.store().list_by_prefix(Namespace::Address)?;
        addresses.iter().map(|address| self.address(address)).collect()
    }

    pub fn set_active_address(&mut self, address: &str) -> Result<()> {
        self.address(address)?;
        self.session
            .store()
            .set(Namespace::Config, ACTIVE_ADDRESS_KEY, address)
    }

    pub fn active_address(&mut self) -> Result<Option<AddressMetadata>> {
        match self.active_address_text()? {
            Some(address) => Ok(Some(self.address(&address)?)),
            None => Ok(None),
        }
    }

    fn active_address_text(&mut self) -> Result<Option<String>> {
        self.session.store().get(Namespace::Config, ACTIVE_ADDRESS_KEY)
    }

    pub fn validate_address(&self, address: &str) -> bool {
        Address::is_valid(address)
    }

    fn add_key(
        &mut self,
        key_pair: KeyPair,
        address: Address,
        label: Option<&str>,
        network: &NetworkRecord,
        origin: AddressOrigin,
    ) -> Result<AddressMetadata> {
        if self
            .session
            .store()
            .contains(Namespace::Address, address.as_str())?
        {
            return Err(WalletError::Validation(format!(
                "address {address} is already in the wallet"
            )));
        }
        let name = match label {
            Some(label) => label.to_string(),
            None => format!(
                "address-{}",
                self.session.store().list_by_prefix(Namespace::Address)?.len() + 1
            ),
        };
        validate_label(&name)?;

        self.session
            .store_secret(address.as_str(), &key_pair.private_scalar().to_hex())?;

        let mut metadata = AddressMetadata {
            name,
            address: address.clone(),
            network: network.name.clone(),
            prefix: network.prefix.clone(),
            public_key: key_pair.public_point().to_hex(),
            origin,
            created_at: None,
            imported_at: None,
        };
        metadata.stamp(self.session.now());
        self.session
            .store()
            .set_json(Namespace::Address, address.as_str(), &metadata)?;

        if self.active_address_text()?.is_none() {
            self.set_active_address(address.as_str())?;
        }
        info!("Added {origin} address {address} on {}", network.name);
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use zeroize::Zeroizing;

    use super::*;
    use crate::config_models::data_directory::DataDirectory;
    use crate::secret_store::SecretStore;
    use crate::session::Argon2Params;
    use crate::session::AuditIdentity;
    use crate::session::PasswordPrompt;
    use crate::session::SystemClock;

    const PASSWORD: &str = "hunter2222";
    const ALL_ZERO_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon \
        abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon \
        abandon abandon abandon abandon abandon abandon art";

    /// Always answers with the same password.
    #[derive(Clone, Default)]
    struct FixedPrompt(Arc<Mutex<usize>>);

    impl PasswordPrompt for FixedPrompt {
        fn prompt_password(&mut self, _message: &str) -> Result<Zeroizing<String>> {
            *self.0.lock().unwrap() += 1;
            Ok(Zeroizing::new(PASSWORD.to_string()))
        }
    }

    fn wallet(tmp: &tempfile::TempDir) -> Wallet {
        let data_dir = DataDirectory::get(Some(tmp.path().to_path_buf())).unwrap();
        let mut session = SessionManager::new(
            SecretStore::in_memory(),
            data_dir,
            Argon2Params::insecure_fast(),
            Box::new(FixedPrompt::default()),
            Box::new(SystemClock),
            AuditIdentity {
                host: "h".into(),
                user: "u".into(),
            },
        )
        .unwrap();
        session.setup(PASSWORD, PASSWORD, 5).unwrap();

        let mut wallet = Wallet::new(session);
        wallet
            .add_network("main", "https://node.example.org", "PR")
            .unwrap();
        wallet.set_active_network("main").unwrap();
        wallet
    }

    #[test]
    fn network_lifecycle() {
        let tmp = tempfile::tempdir().unwrap();
        let mut wallet = wallet(&tmp);

        wallet.add_network("local", "http://127.0.0.1:9799", "RPR").unwrap();
        assert!(matches!(
            wallet.add_network("local", "http://127.0.0.1:9799", "RPR"),
            Err(WalletError::Validation(_))
        ));
        assert_eq!(
            vec!["local", "main"],
            wallet
                .networks()
                .unwrap()
                .iter()
                .map(|n| n.name.as_str())
                .collect::<Vec<_>>()
        );

        let tested = wallet.record_network_test("local", false).unwrap();
        assert_eq!(1, tested.stats.failures);
        assert!(tested.last_tested.is_some());

        wallet.set_active_network("local").unwrap();
        wallet.remove_network("local").unwrap();
        assert!(wallet.active_network().unwrap().is_none());
        assert!(matches!(
            wallet.network("local"),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn invalid_network_input_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut wallet = wallet(&tmp);

        assert!(wallet.add_network("bad name", "http://x", "PR").is_err());
        assert!(wallet.add_network("ok", "x", "PR").is_err());
        assert!(wallet.add_network("ok", "http://x", "pr").is_err());
        assert!(matches!(
            wallet.set_active_network("missing"),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn generated_address_is_stored_encrypted() {
        let tmp = tempfile::tempdir().unwrap();
        let mut wallet = wallet(&tmp);

        let metadata = wallet.generate_address(Some("savings"), None).unwrap();
        assert!(metadata.address.as_str().starts_with("PR6"));
        assert!(wallet.validate_address(metadata.address.as_str()));
        assert!(metadata.created_at.is_some());
        assert_eq!(AddressOrigin::Generated, metadata.origin);

        let address = metadata.address.as_str();
        assert!(wallet.session().has_secret(address).unwrap());
        assert_eq!(metadata, wallet.active_address().unwrap().unwrap());
    }

    #[test]
    fn golden_mnemonic_imports_golden_address() {
        let tmp = tempfile::tempdir().unwrap();
        let mut wallet = wallet(&tmp);

        let metadata = wallet.import_mnemonic(ALL_ZERO_PHRASE, None, None).unwrap();
        assert_eq!(
            "PR6yxArWSL9q8W6oofZTrM1HWj69DKiaFUDiA32JqU",
            metadata.address.as_str()
        );
        assert_eq!("address-1", metadata.name);
        assert!(metadata.imported_at.is_some());

        assert!(matches!(
            wallet.import_mnemonic(ALL_ZERO_PHRASE, None, None),
            Err(WalletError::Validation(_))
        ));
    }

    #[test]
    fn exported_mnemonic_reimports_to_same_address() {
        let tmp = tempfile::tempdir().unwrap();
        let mut wallet = wallet(&tmp);
        wallet.add_network("test", "http://127.0.0.1", "TPR").unwrap();

        let generated = wallet.generate_address(None, None).unwrap();
        let phrase = wallet.export_mnemonic(generated.address.as_str()).unwrap();

        let on_test = wallet
            .import_mnemonic(&phrase.to_string(), None, Some("test"))
            .unwrap();
        assert_eq!("TPR", on_test.address.prefix());
        assert_eq!(
            generated.address.as_str()[2..],
            on_test.address.as_str()[3..]
        );
    }

    #[test]
    fn private_key_import() {
        let tmp = tempfile::tempdir().unwrap();
        let mut wallet = wallet(&tmp);

        let one = format!("{}1", "0".repeat(63));
        let metadata = wallet.import_private_key(&one, Some("one"), None).unwrap();
        assert_eq!(
            "PR6xuFjVhUwfsw4ShL6KTMNhezLj77JQa8HL2HdTcT",
            metadata.address.as_str()
        );
        assert_eq!(AddressOrigin::PrivateKey, metadata.origin);

        assert!(matches!(
            wallet.import_private_key(&"0".repeat(64), None, None),
            Err(WalletError::Validation(_))
        ));
    }

    #[test]
    fn remove_address_clears_key_and_selection() {
        let tmp = tempfile::tempdir().unwrap();
        let mut wallet = wallet(&tmp);

        let first = wallet.generate_address(None, None).unwrap();
        let second = wallet.generate_address(None, None).unwrap();
        assert_eq!(2, wallet.addresses().unwrap().len());
        assert_eq!(first, wallet.active_address().unwrap().unwrap());

        wallet.set_active_address(second.address.as_str()).unwrap();
        wallet.remove_address(second.address.as_str()).unwrap();

        assert!(wallet.active_address().unwrap().is_none());
        assert!(!wallet.session().has_secret(second.address.as_str()).unwrap());
        assert!(matches!(
            wallet.address(second.address.as_str()),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn missing_active_network_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mut wallet = wallet(&tmp);
        wallet.remove_network("main").unwrap();

        assert!(matches!(
            wallet.generate_address(None, None),
            Err(WalletError::NotFound(_))
        ));
    }
}
