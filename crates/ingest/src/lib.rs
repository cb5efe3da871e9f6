mod credentials;
mod poller;
mod source;

pub use credentials::{CredentialManager, RENEWAL_MARGIN_MINUTES};
pub use poller::{CycleOutcome, Poller, PollerConfig};
pub use source::{HttpDecisionSource, HttpSourceConfig};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Result of the login exchange. `expire` is passed through raw; parsing
/// and fallback live in the credential manager.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginGrant {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub expire: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSource {
    #[serde(default)]
    pub latitude: Value,
    #[serde(default)]
    pub longitude: Value,
    #[serde(default)]
    pub cn: String,
}

/// One decision as reported by upstream, newest first in a poll batch.
#[derive(Clone, Debug, Deserialize)]
pub struct RawDecision {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub source: RawSource,
}

impl RawDecision {
    /// Upstream ids arrive as JSON strings or numbers; both normalize to
    /// the same opaque text key.
    pub fn id_text(&self) -> Option<String> {
        match &self.id {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Upstream source of ban decisions: a credential exchange plus a
/// most-recent-first poll of currently active decisions.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    async fn login(&self) -> Result<LoginGrant, IngestError>;
    async fn poll(&self, token: &str) -> Result<Vec<RawDecision>, IngestError>;
}

/// Resolves a configured IANA timezone name, falling back to UTC.
pub fn resolve_timezone(name: &str) -> chrono_tz::Tz {
    name.parse().unwrap_or_else(|_| {
        warn!("unknown timezone {name:?}, falling back to UTC");
        chrono_tz::Tz::UTC
    })
}
