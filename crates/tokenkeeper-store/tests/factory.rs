//! Store selection from serialized storage configuration.

use tempfile::TempDir;

use tokenkeeper_core::{AuthenticationState, CredentialStore};
use tokenkeeper_store::{StorageConfig, StorageFactory};

fn parse(json: serde_json::Value) -> StorageConfig {
    serde_json::from_value(json).unwrap()
}

#[test]
fn test_local_storage_config_persists_by_name() {
    let dir = TempDir::new().unwrap();
    let config = parse(serde_json::json!({
        "type": "localStorage",
        "options": {"name": "api-session", "directory": dir.path()}
    }));
    let factory = StorageFactory::new();
    let state = AuthenticationState::new("t1")
        .unwrap()
        .with_refresh_token("r1", None);

    factory
        .create(&config)
        .unwrap()
        .write(Some(&state))
        .unwrap();

    assert!(dir.path().join("api-session.json").exists());
    let reopened = factory.create(&config).unwrap();
    assert_eq!(reopened.kind(), "file");
    assert_eq!(reopened.read().unwrap(), Some(state));
}

#[test]
fn test_static_config_without_name_uses_default() {
    let factory = StorageFactory::new();
    let a = factory.create(&parse(serde_json::json!({"type": "static"}))).unwrap();
    let b = factory
        .create(&StorageConfig::shared(tokenkeeper_store::DEFAULT_NAME))
        .unwrap();

    let state = AuthenticationState::new("shared-default").unwrap();
    a.write(Some(&state)).unwrap();

    assert_eq!(b.read().unwrap(), Some(state));
    b.write(None).unwrap();
}

#[test]
fn test_memory_configs_are_private() {
    let factory = StorageFactory::new();
    let config = parse(serde_json::json!({"type": "memory"}));
    let a = factory.create(&config).unwrap();
    let b = factory.create(&config).unwrap();

    a.write(Some(&AuthenticationState::new("t1").unwrap()))
        .unwrap();

    assert!(b.read().unwrap().is_none());
}

#[test]
fn test_unknown_options_are_kept() {
    let config = parse(serde_json::json!({
        "type": "cookie",
        "options": {"name": "s", "domain": "example.com"}
    }));

    assert_eq!(config.options.extra["domain"], "example.com");
    assert!(StorageFactory::new().create(&config).is_err());
}
