use std::io::Write;
use std::time::Duration;

use serial_test::serial;
use spa_core::config::{env_var_name, AppConfig, ConfigError, ConfigValue, SpaConfig};

#[test]
fn test_empty_config_yields_defaults() {
    let config = AppConfig::from_config(&SpaConfig::empty()).unwrap();
    assert_eq!(config.server_port(), 8080);
    assert!(!config.debug());
    assert_eq!(config.wait(), Duration::from_secs(15));
    assert_eq!(config.oidc_issuer(), "");
    assert_eq!(config.oidc_audience(), "");
    assert_eq!(config.jwks_cache_ttl(), Duration::ZERO);
    assert_eq!(config.local_static_path(), "");
    assert_eq!(config.kube_ca_file(), "");
    assert_eq!(config.kube_api_server(), "");
}

#[test]
fn test_flatten_yaml() {
    let yaml = r#"
debug: true
server:
  port: 9090
  wait: "500ms"
oidc:
  issuer: "https://sso.example.com/realms/main"
  audience: "frontend"
  jwks_cache_ttl: 300
static:
  local_path: "frontend/dist"
"#;
    let raw = SpaConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(raw.get::<i64>("server.port").unwrap(), 9090);
    assert!(raw.contains_key("oidc.issuer"));

    let config = AppConfig::from_config(&raw).unwrap();
    assert_eq!(config.server_port(), 9090);
    assert!(config.debug());
    assert_eq!(config.wait(), Duration::from_millis(500));
    assert_eq!(config.oidc_issuer(), "https://sso.example.com/realms/main");
    assert_eq!(config.oidc_audience(), "frontend");
    assert_eq!(config.jwks_cache_ttl(), Duration::from_secs(300));
    assert_eq!(config.local_static_path(), "frontend/dist");
}

#[test]
fn test_set_overrides_file_value() {
    let mut raw = SpaConfig::from_yaml_str("server:\n  port: 9090\n").unwrap();
    raw.set("server.port", ConfigValue::String("7070".into()));
    let config = AppConfig::from_config(&raw).unwrap();
    assert_eq!(config.server_port(), 7070);
}

#[test]
fn test_type_mismatch_is_an_error() {
    let raw = SpaConfig::from_yaml_str("server:\n  port: \"eighty\"\n").unwrap();
    let err = AppConfig::from_config(&raw).unwrap_err();
    assert!(
        matches!(err, ConfigError::TypeMismatch { ref key, .. } if key == "server.port"),
        "got: {err}"
    );
}

#[test]
fn test_port_zero_rejected() {
    let raw = SpaConfig::from_yaml_str("server:\n  port: 0\n").unwrap();
    assert!(matches!(
        AppConfig::from_config(&raw),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
fn test_port_out_of_range_rejected() {
    let raw = SpaConfig::from_yaml_str("server:\n  port: 70000\n").unwrap();
    assert!(matches!(
        AppConfig::from_config(&raw),
        Err(ConfigError::TypeMismatch { .. })
    ));
}

#[test]
fn test_bad_duration_rejected() {
    let raw = SpaConfig::from_yaml_str("server:\n  wait: \"soon\"\n").unwrap();
    assert!(AppConfig::from_config(&raw).is_err());
}

#[test]
fn test_out_of_range_duration_rejected() {
    for yaml in [
        "server:\n  wait: \"99999999999999999999h\"\n",
        "server:\n  wait: .inf\n",
        "oidc:\n  jwks_cache_ttl: -1.5\n",
    ] {
        let raw = SpaConfig::from_yaml_str(yaml).unwrap();
        assert!(
            matches!(AppConfig::from_config(&raw), Err(ConfigError::TypeMismatch { .. })),
            "accepted {yaml:?}"
        );
    }
}

#[test]
fn test_invalid_yaml() {
    let err = SpaConfig::from_yaml_str("server: [unclosed").unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_env_var_name() {
    assert_eq!(env_var_name("server.port"), "SERVER_PORT");
    assert_eq!(env_var_name("oidc.jwks_cache_ttl"), "OIDC_JWKS_CACHE_TTL");
    assert_eq!(env_var_name("debug"), "DEBUG");
}

#[test]
#[serial]
fn test_load_explicit_file_with_env_overlay() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "oidc:\n  issuer: \"https://from-file\"\n  audience: \"file-aud\"").unwrap();

    std::env::set_var("OIDC_AUDIENCE", "env-aud");
    let raw = SpaConfig::load(Some(file.path())).unwrap();
    std::env::remove_var("OIDC_AUDIENCE");

    assert_eq!(raw.source(), Some(file.path()));
    let config = AppConfig::from_config(&raw).unwrap();
    assert_eq!(config.oidc_issuer(), "https://from-file");
    assert_eq!(config.oidc_audience(), "env-aud");
}

#[test]
#[serial]
fn test_load_missing_explicit_file_fails() {
    let err = SpaConfig::load(Some(std::path::Path::new("/nonexistent/app.yaml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}
