use std::path::Path;
use std::sync::Arc;

use aggregation::{
    DecisionStore, InMemoryDecisionStore, RedisDecisionStore, RedisStoreConfig, StoreTtlConfig,
    SystemConfig, SystemConfigLoader,
};
use ingest::{DecisionSource, HttpDecisionSource, HttpSourceConfig};
use redis::Client as RedisClient;
use tracing::info;

use crate::error::AppError;

pub struct AppState {
    pub store: Arc<dyn DecisionStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self { store }
    }
}

pub fn load_config(path: &Path) -> Result<SystemConfig, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(SystemConfigLoader::from_str(&raw)?)
}

pub fn create_default_config(path: &Path) -> Result<String, AppError> {
    let content = default_config_template();
    std::fs::write(path, content.as_bytes())?;
    Ok(content)
}

pub fn default_config_template() -> String {
    let mut lines = Vec::new();
    lines.push("upstream = { base_url = \"https://localhost:8080\", timeout_ms = 30000 }");
    lines.push("cache = { redis_url = \"\", key_prefix = \"banwatch\" }");
    lines.push("ingest = { timezone = \"Europe/Berlin\", scenarios = \"ban\" }");
    lines.push("server = { cors_origins = \"*\" }");
    format!("{}\n", lines.join("\n"))
}

pub fn build_store(config: &SystemConfig) -> Result<Arc<dyn DecisionStore>, AppError> {
    let redis_url = config.get_string("cache.redis_url");
    if redis_url.trim().is_empty() {
        info!("cache.redis_url not set, using in-memory store");
        return Ok(InMemoryDecisionStore::shared(StoreTtlConfig::default()));
    }
    let client =
        RedisClient::open(redis_url).map_err(|err| AppError::internal(err.to_string()))?;
    let store_config = RedisStoreConfig {
        key_prefix: config.get_string("cache.key_prefix"),
        ttl: StoreTtlConfig::default(),
    };
    Ok(Arc::new(RedisDecisionStore::new(client, store_config)))
}

pub fn build_source(config: &SystemConfig) -> Arc<dyn DecisionSource> {
    let scenarios: Vec<String> = config
        .get_string("ingest.scenarios")
        .split(',')
        .map(|scenario| scenario.trim().to_string())
        .filter(|scenario| !scenario.is_empty())
        .collect();
    let defaults = HttpSourceConfig::default();
    Arc::new(HttpDecisionSource::new(HttpSourceConfig {
        base_url: config.get_string("upstream.base_url"),
        timeout_ms: config.get_number("upstream.timeout_ms").max(1) as u64,
        user_agent: defaults.user_agent,
        scenarios,
    }))
}
