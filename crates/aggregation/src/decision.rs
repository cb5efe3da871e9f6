use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ingested ban event. Immutable once stored; a record is only ever
/// superseded by newer entries or evicted by a structure TTL.
///
/// `latitude` and `longitude` are kept as raw JSON values because upstream
/// may omit them or send garbage; they are stored exactly as received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Source-assigned identifier. Used as the dedup key and the storage
    /// key, never serialized into the entry payload itself.
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub latitude: Value,
    #[serde(default)]
    pub longitude: Value,
    /// ISO 3166-1 alpha-2 country code, possibly empty.
    #[serde(default)]
    pub cn: String,
    /// RFC 3339 timestamp assigned at receipt time, seconds precision.
    #[serde(default)]
    pub timestamp: String,
}

impl Decision {
    pub fn from_payload(id: impl Into<String>, payload: &str) -> serde_json::Result<Self> {
        let mut decision: Decision = serde_json::from_str(payload)?;
        decision.id = id.into();
        Ok(decision)
    }

    pub fn payload_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// History entries carry the id alongside the payload in one member.
    pub fn history_member(&self, payload: &str) -> String {
        format!("{}:{}", self.id, payload)
    }

    /// Parses an `id:payload` history member. Returns `None` for members
    /// with no separator or an unparsable payload; callers skip those.
    pub fn from_history_member(member: &str) -> Option<Self> {
        let (id, payload) = member.split_once(':')?;
        Self::from_payload(id, payload).ok()
    }
}
