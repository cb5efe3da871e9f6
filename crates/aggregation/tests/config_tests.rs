use aggregation::{ConfigError, SystemConfigLoader};

#[test]
fn empty_file_yields_defaults() {
    let config = SystemConfigLoader::from_str("").expect("config");
    assert_eq!(config.get_string("upstream.base_url"), "https://localhost:8080");
    assert_eq!(config.get_number("upstream.timeout_ms"), 30_000);
    assert_eq!(config.get_string("cache.redis_url"), "");
    assert_eq!(config.get_string("ingest.timezone"), "Europe/Berlin");
    assert_eq!(config.get_string("server.cors_origins"), "*");
}

#[test]
fn values_override_defaults() {
    let config = SystemConfigLoader::from_str(
        "upstream = { base_url = \"http://lapi:8080\", timeout_ms = 5000 }\ncache = { redis_url = \"redis://127.0.0.1:6379/0\" }\n",
    )
    .expect("config");
    assert_eq!(config.get_string("upstream.base_url"), "http://lapi:8080");
    assert_eq!(config.get_number("upstream.timeout_ms"), 5000);
    assert_eq!(config.get_string("cache.redis_url"), "redis://127.0.0.1:6379/0");
    // untouched keys still fall back
    assert_eq!(config.get_string("cache.key_prefix"), "banwatch");
}

#[test]
fn unknown_key_is_rejected() {
    let err = SystemConfigLoader::from_str("mystery = \"value\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownKey(_)));
}

#[test]
fn type_mismatch_is_rejected() {
    let err =
        SystemConfigLoader::from_str("upstream = { timeout_ms = \"fast\" }\n").unwrap_err();
    assert!(matches!(err, ConfigError::TypeMismatch(_, _)));
}

#[test]
fn unsupported_value_kind_is_rejected() {
    let err = SystemConfigLoader::from_str("cache = { redis_url = true }\n").unwrap_err();
    assert!(matches!(err, ConfigError::TypeMismatch(_, _)));
}
