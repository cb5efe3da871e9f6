use std::sync::Arc;
use std::time::Duration;

use aggregation::{Decision, DecisionStore};
use chrono::{SecondsFormat, Utc};
use chrono_tz::Tz;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::credentials::CredentialManager;
use crate::{DecisionSource, IngestError, RawDecision};

#[derive(Clone, Debug)]
pub struct PollerConfig {
    /// Wait after an empty or duplicate poll.
    pub idle_delay_ms: u64,
    /// Wait after a transport or auth failure.
    pub backoff_delay_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            idle_delay_ms: 1_250,
            backoff_delay_ms: 5_000,
        }
    }
}

/// Outcome of a single poll cycle, deciding how long to wait before the
/// next one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new decision was consumed; poll again immediately to drain bursts.
    Ingested(String),
    /// Upstream's newest decision is the one already seen.
    Duplicate,
    /// Empty or unusable batch; nothing new.
    Idle,
    /// Transport or auth failure; back off before retrying.
    Backoff,
}

/// Drives ingestion until the process terminates: renews credentials ahead
/// of expiry, polls upstream, dedups against the last-seen id, and fans
/// new decisions out to the store. All per-cycle failures are absorbed;
/// the loop itself never ends.
pub struct Poller {
    source: Arc<dyn DecisionSource>,
    store: Arc<dyn DecisionStore>,
    credentials: CredentialManager,
    config: PollerConfig,
    tz: Tz,
    last_seen_id: Option<String>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn DecisionSource>,
        store: Arc<dyn DecisionStore>,
        tz: Tz,
        config: PollerConfig,
    ) -> Self {
        let credentials = CredentialManager::new(source.clone(), tz);
        Self {
            source,
            store,
            credentials,
            config,
            tz,
            last_seen_id: None,
        }
    }

    pub async fn run(mut self) {
        info!("starting decision poller");
        loop {
            match self.poll_once().await {
                CycleOutcome::Ingested(_) => {}
                CycleOutcome::Duplicate | CycleOutcome::Idle => {
                    sleep(Duration::from_millis(self.config.idle_delay_ms)).await;
                }
                CycleOutcome::Backoff => {
                    sleep(Duration::from_millis(self.config.backoff_delay_ms)).await;
                }
            }
        }
    }

    /// One cycle of the ingestion loop. Public so a single cycle can be
    /// driven without entering the endless loop.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        if self.credentials.token().is_none() || self.credentials.is_near_expiry(Utc::now()) {
            if let Err(err) = self.credentials.acquire().await {
                warn!(error = %err, "credential exchange failed");
                if self.credentials.token().is_none() {
                    return CycleOutcome::Backoff;
                }
                // Keep polling with the previously held token.
            }
        }
        let token = match self.credentials.token() {
            Some(token) => token.to_string(),
            None => return CycleOutcome::Backoff,
        };

        let batch = match self.source.poll(&token).await {
            Ok(batch) => batch,
            Err(IngestError::Malformed(err)) => {
                warn!(error = %err, "discarding malformed poll payload");
                return CycleOutcome::Idle;
            }
            Err(err) => {
                warn!(error = %err, "poll failed, backing off");
                return CycleOutcome::Backoff;
            }
        };

        let Some(newest) = batch.first() else {
            return CycleOutcome::Idle;
        };
        let Some(id) = newest.id_text() else {
            warn!("newest decision carries no usable id");
            return CycleOutcome::Idle;
        };
        if self.last_seen_id.as_deref() == Some(id.as_str()) {
            return CycleOutcome::Duplicate;
        }

        self.last_seen_id = Some(id.clone());
        let decision = self.normalize(&id, newest);
        match self.store.ingest(&decision) {
            Ok(()) => info!(id = %decision.id, country = %decision.cn, "ingested new decision"),
            Err(err) => {
                // The decision is consumed either way; upstream replay
                // remains the source of truth for anything lost here.
                error!(id = %decision.id, error = %err, "failed to store decision");
            }
        }
        CycleOutcome::Ingested(id)
    }

    fn normalize(&self, id: &str, raw: &RawDecision) -> Decision {
        let timestamp = Utc::now()
            .with_timezone(&self.tz)
            .to_rfc3339_opts(SecondsFormat::Secs, false);
        Decision {
            id: id.to_string(),
            latitude: raw.source.latitude.clone(),
            longitude: raw.source.longitude.clone(),
            cn: raw.source.cn.clone(),
            timestamp,
        }
    }
}
