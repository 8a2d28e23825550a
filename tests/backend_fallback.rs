mod common;

use common::fixtures::data_directory;
use common::fixtures::session_manager;
use common::fixtures::MockClock;
use common::fixtures::ScriptedPrompt;
use common::fixtures::UnavailableBackend;
use common::fixtures::PASSWORD;
use common::logging;
use wallet_core::secret_store::BackendKind;
use wallet_core::secret_store::FileBackend;
use wallet_core::secret_store::HostEnvironment;
use wallet_core::secret_store::MemoryBackend;
use wallet_core::secret_store::Namespace;
use wallet_core::secret_store::SecretStore;

/// Runs the same operations against `store` and reports every observable
/// result.
fn exercise(store: &mut SecretStore) -> Vec<String> {
    let mut observed = vec![];
    store.set(Namespace::Network, "main", "{\"prefix\":\"PR\"}").unwrap();
    store.set(Namespace::Config, "activeNetwork", "main").unwrap();
    store.set(Namespace::Wallet, "PR6a", "sealed-a").unwrap();
    store.set(Namespace::Wallet, "PR6b", "sealed-b").unwrap();
    store.set(Namespace::Wallet, "PR6a", "sealed-a2").unwrap();

    observed.push(format!("{:?}", store.get(Namespace::Wallet, "PR6a").unwrap()));
    observed.push(format!("{:?}", store.get(Namespace::Wallet, "PR6z").unwrap()));
    observed.push(format!("{:?}", store.list_by_prefix(Namespace::Wallet).unwrap()));

    store.delete(Namespace::Wallet, "PR6b").unwrap();
    store.delete(Namespace::Wallet, "PR6b").unwrap();
    observed.push(format!("{:?}", store.get(Namespace::Wallet, "PR6b").unwrap()));
    observed.push(format!("{:?}", store.list_by_prefix(Namespace::Wallet).unwrap()));
    observed.push(format!(
        "{:?}",
        store.get(Namespace::Config, "activeNetwork").unwrap()
    ));
    observed
}

/// test: with the native service unavailable the file fallback behaves
/// exactly like a working native service
#[test]
fn fallback_matches_native_results() {
    logging::tracing_logger();
    let tmp = tempfile::tempdir().unwrap();

    let mut native = SecretStore::with_backend(Box::new(MemoryBackend::default()));
    let mut degraded = SecretStore::with_fallback(
        Box::new(UnavailableBackend),
        Box::new(FileBackend::new(tmp.path().join("secrets.json"))),
    );

    assert_eq!(exercise(&mut native), exercise(&mut degraded));
    assert_eq!(BackendKind::File, degraded.active_backend());
}

/// test: the fallback file holds every key in one JSON object of sealed
/// values with owner only permissions
#[test]
fn fallback_file_layout() {
    logging::tracing_logger();
    let tmp = tempfile::tempdir().unwrap();
    let mut store = SecretStore::with_fallback(
        Box::new(UnavailableBackend),
        Box::new(FileBackend::new(tmp.path().join("secrets.json"))),
    );
    exercise(&mut store);

    let path = tmp.path().join("secrets.json");
    let map: std::collections::BTreeMap<String, String> =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(
        vec!["config:activeNetwork", "network:main", "wallet:PR6a"],
        map.keys().map(String::as_str).collect::<Vec<_>>()
    );
    for sealed in map.values() {
        assert!(hex::decode(sealed).is_ok());
        assert!(!sealed.contains("prefix"));
        assert_ne!("main", sealed);
    }
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains("sealed-a2"));
    assert!(!text.contains("\"PR\""));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(0o600, mode & 0o777);
    }
}

/// test: a headless host goes straight to the file backend
#[test]
fn headless_host_opens_file_backend() {
    logging::tracing_logger();
    let tmp = tempfile::tempdir().unwrap();
    let store = SecretStore::open(
        &HostEnvironment::headless(),
        "wallet-core-test",
        &data_directory(tmp.path()),
    );
    assert_eq!(BackendKind::File, store.active_backend());
}

/// test: secrets stored while the native service fails mid-session remain
/// readable through the session manager
#[test]
fn session_survives_backend_failure() {
    logging::tracing_logger();
    let tmp = tempfile::tempdir().unwrap();
    let prompt = ScriptedPrompt::default();
    let clock = MockClock::new();
    let store = SecretStore::with_fallback(
        Box::new(UnavailableBackend),
        Box::new(FileBackend::new(tmp.path().join("secrets.json"))),
    );
    let mut manager = session_manager(tmp.path(), store, &prompt, &clock);
    manager.setup(PASSWORD, PASSWORD, 5).unwrap();

    manager.store_secret("PR6abc", "deadbeef").unwrap();
    assert_eq!("deadbeef", manager.retrieve_secret("PR6abc").unwrap().as_str());
    assert_eq!(BackendKind::File, manager.store().active_backend());
}
