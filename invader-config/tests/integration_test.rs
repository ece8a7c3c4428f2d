//! Integration tests for invader-config

use invader_config::*;
use std::env;
use std::io::Write;

#[test]
fn test_env_overrides_file() {
    let dir = env::temp_dir().join(format!("invader-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("invader.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
[pagseguro]
base_url = "https://sandbox.api.pagseguro.com"
timeout_secs = 30
"#
    )
    .unwrap();

    let manager = ConfigManager::with_prefix("INVADERTEST");
    manager.load_file_auto(path.to_str().unwrap()).unwrap();

    unsafe {
        env::set_var("INVADERTEST_PAGSEGURO__TIMEOUT_SECS", "5");
    }
    manager.load_env().unwrap();
    unsafe {
        env::remove_var("INVADERTEST_PAGSEGURO__TIMEOUT_SECS");
    }

    assert_eq!(manager.get::<u64>("pagseguro.timeout_secs").unwrap(), 5);
    assert_eq!(
        manager.get::<String>("pagseguro.base_url").unwrap(),
        "https://sandbox.api.pagseguro.com"
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_env_loader_with_prefix() {
    let loader = EnvLoader::new(Some("INVADERLOADER".to_string()));

    unsafe {
        env::set_var("INVADERLOADER_BB__CLIENT_ID", "client");
    }

    assert_eq!(loader.load_var("BB__CLIENT_ID").unwrap(), "client");
    assert_eq!(
        loader.load().unwrap().get("bb.client_id").map(String::as_str),
        Some("client")
    );

    unsafe {
        env::remove_var("INVADERLOADER_BB__CLIENT_ID");
    }
}

#[test]
fn test_missing_key() {
    let manager = ConfigManager::new();
    assert!(matches!(
        manager.get::<String>("bb.pix_key"),
        Err(ConfigError::KeyNotFound(key)) if key == "bb.pix_key"
    ));
}

#[test]
fn test_deserialization_error_names_key() {
    let manager = ConfigManager::new();
    manager.set("server.port", "not-a-port").unwrap();

    let err = manager.get::<u16>("server.port").unwrap_err();
    assert!(err.to_string().contains("server.port"));
}
