//! Configuration file loading tests

use grantd_server::Config;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grantd.toml");
    fs::write(
        &path,
        r#"
[server]
host = "0.0.0.0"
port = 9100

[auth]
jwt_secret = "file-secret"
token_ttl_seconds = 600

[[clients.registered]]
client_id = "cli"

[[clients.registered]]
client_id = "web"
client_secret = "web-secret"

[[users]]
email = "seed@example.com"
name = "Seed"
password = "seed-password"
active = false

[logging]
format = "json"
"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.auth.jwt_secret, "file-secret");
    assert_eq!(config.auth.token_ttl_seconds, 600);
    assert_eq!(config.auth.jwt_algorithm, "HS256");
    assert_eq!(config.clients.registered.len(), 2);
    assert_eq!(config.clients.registered[0].client_secret, "");
    assert_eq!(config.users.len(), 1);
    assert!(!config.users[0].active);
    assert_eq!(config.logging.format, "json");
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.auth.token_ttl_seconds, 3600);
    assert_eq!(config.clients.registered[0].client_id, "todo-web");
    assert!(config.users.is_empty());
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grantd.toml");
    fs::write(
        &path,
        r#"
[auth]
token_ttl_seconds = -5
"#,
    )
    .unwrap();

    assert!(Config::load_from(&path).is_err());
}
