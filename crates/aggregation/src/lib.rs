pub mod config;
pub mod decision;
pub mod redis_store;
pub mod static_config;
pub mod store;

pub use config::{ConfigError, SystemConfig, SystemConfigLoader};
pub use decision::Decision;
pub use redis_store::{RedisDecisionStore, RedisStoreConfig};
pub use static_config::{StaticConfigItem, STATIC_CONFIG_TABLE};
pub use store::{
    CountryCount, CountryRollup, DecisionStore, InMemoryDecisionStore, StoreError, StoreTtlConfig,
    HISTORY_PAGE_CAP,
};
