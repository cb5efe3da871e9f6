#[derive(Clone, Debug)]
pub struct StaticConfigItem {
    pub key: &'static str,
    pub description: &'static str,
    pub value_type: &'static str,
    pub default_value: &'static str,
}

pub static STATIC_CONFIG_TABLE: &[StaticConfigItem] = &[
    StaticConfigItem {
        key: "upstream.base_url",
        description: "Base URL of the upstream decision source",
        value_type: "string",
        default_value: "https://localhost:8080",
    },
    StaticConfigItem {
        key: "upstream.timeout_ms",
        description: "Upstream request timeout in milliseconds",
        value_type: "number",
        default_value: "30000",
    },
    StaticConfigItem {
        key: "cache.redis_url",
        description: "Redis connection string (empty selects the in-memory store)",
        value_type: "string",
        default_value: "",
    },
    StaticConfigItem {
        key: "cache.key_prefix",
        description: "Prefix for all store keys",
        value_type: "string",
        default_value: "banwatch",
    },
    StaticConfigItem {
        key: "ingest.timezone",
        description: "IANA timezone for ingest timestamps",
        value_type: "string",
        default_value: "Europe/Berlin",
    },
    StaticConfigItem {
        key: "ingest.scenarios",
        description: "Comma-separated scenarios sent with the login exchange",
        value_type: "string",
        default_value: "ban",
    },
    StaticConfigItem {
        key: "server.cors_origins",
        description: "Comma-separated allowed CORS origins, or *",
        value_type: "string",
        default_value: "*",
    },
];
