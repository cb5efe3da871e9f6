use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::{DecisionSource, IngestError};

/// Renewal lead time before token expiry, tolerating polling-loop latency
/// and clock skew.
pub const RENEWAL_MARGIN_MINUTES: i64 = 5;

/// Assumed validity when upstream reports no usable expiry; degrades to
/// frequent renewal rather than stalling.
const FALLBACK_VALIDITY_MINUTES: i64 = 10;

/// Holds the upstream bearer token and decides when to renew it. Renewal
/// reuses the login exchange; on a failed renewal the previously held
/// token stays in place untouched.
pub struct CredentialManager {
    source: Arc<dyn DecisionSource>,
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    tz: Tz,
}

impl CredentialManager {
    pub fn new(source: Arc<dyn DecisionSource>, tz: Tz) -> Self {
        Self {
            source,
            token: None,
            expires_at: None,
            tz,
        }
    }

    /// Performs the login exchange and installs the new token. The stored
    /// token is only replaced after the exchange succeeds.
    pub async fn acquire(&mut self) -> Result<(), IngestError> {
        let grant = self.source.login().await?;
        let expires_at = grant
            .expire
            .as_deref()
            .and_then(|raw| parse_expiry(raw, self.tz))
            .unwrap_or_else(|| Utc::now() + Duration::minutes(FALLBACK_VALIDITY_MINUTES));
        self.token = Some(grant.token);
        self.expires_at = Some(expires_at);
        info!(expires_at = %expires_at, "obtained upstream bearer token");
        Ok(())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// True once `now` is within the renewal margin of expiry. A manager
    /// with no token yet always reports near-expiry.
    pub fn is_near_expiry(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at - Duration::minutes(RENEWAL_MARGIN_MINUTES),
            None => true,
        }
    }
}

fn parse_expiry(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Some upstreams report a naive local timestamp; interpret it in the
    // configured timezone.
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok()?;
    naive
        .and_local_timezone(tz)
        .single()
        .map(|parsed| parsed.with_timezone(&Utc))
}
