use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::decision::Decision;

/// Hard cap on a single history page, regardless of the requested limit.
pub const HISTORY_PAGE_CAP: usize = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed entry: {0}")]
    MalformedEntry(String),
}

/// Whole-structure TTLs in seconds. Every write to a structure re-arms the
/// expiry of that entire structure; `0` disables expiry.
#[derive(Clone, Debug)]
pub struct StoreTtlConfig {
    pub recent_ttl_seconds: u64,
    pub country_ttl_seconds: u64,
    pub history_ttl_seconds: u64,
}

impl Default for StoreTtlConfig {
    fn default() -> Self {
        Self {
            recent_ttl_seconds: 20,
            country_ttl_seconds: 86_400,
            history_ttl_seconds: 604_800,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CountryCount {
    pub code: String,
    pub count: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CountryRollup {
    pub total_attacks: u64,
    pub unique_countries: u64,
    /// Lifetime average per hour-of-day: `total_attacks / 24`. A coarse
    /// proxy, not a windowed rate.
    pub attacks_per_hour: u64,
    /// Sorted descending by count; tie order is unspecified.
    pub countries: Vec<CountryCount>,
}

impl CountryRollup {
    pub fn from_counts(
        total_attacks: u64,
        unique_countries: u64,
        mut countries: Vec<CountryCount>,
    ) -> Self {
        countries.sort_by(|a, b| b.count.cmp(&a.count));
        Self {
            total_attacks,
            unique_countries,
            attacks_per_hour: total_attacks / 24,
            countries,
        }
    }
}

/// The five persisted aggregates and their read operations.
///
/// `ingest` fans a decision out to every structure; the sub-updates after
/// the primary recent-window write are isolated, so one failing does not
/// abort the others. Reads surface `StoreError::Unavailable` rather than
/// fabricating empty data, and individually corrupt entries are skipped.
pub trait DecisionStore: Send + Sync {
    fn ingest(&self, decision: &Decision) -> Result<(), StoreError>;
    /// Up to `count` entries of the recent window, in no particular order.
    fn latest(&self, count: usize) -> Result<Vec<Decision>, StoreError>;
    /// History page, newest insertion first. `limit` is clamped to
    /// [`HISTORY_PAGE_CAP`]; an offset past the end yields an empty page.
    fn history(&self, limit: usize, offset: usize) -> Result<Vec<Decision>, StoreError>;
    fn history_count(&self) -> Result<u64, StoreError>;
    fn country_rollup(&self) -> Result<CountryRollup, StoreError>;
    /// Deletes all five structures, persistent counters included.
    fn clear_all(&self) -> Result<(), StoreError>;
    fn ping(&self) -> bool;
}

#[derive(Default)]
struct StoreState {
    recent: HashMap<String, String>,
    recent_deadline: Option<Instant>,
    country_counts: HashMap<String, u64>,
    country_deadline: Option<Instant>,
    unique_countries: HashSet<String>,
    total_attacks: u64,
    history: Vec<(f64, String)>,
    history_deadline: Option<Instant>,
}

impl StoreState {
    fn purge_expired(&mut self, now: Instant) {
        if self.recent_deadline.is_some_and(|deadline| now >= deadline) {
            self.recent.clear();
            self.recent_deadline = None;
        }
        if self.country_deadline.is_some_and(|deadline| now >= deadline) {
            self.country_counts.clear();
            self.country_deadline = None;
        }
        if self.history_deadline.is_some_and(|deadline| now >= deadline) {
            self.history.clear();
            self.history_deadline = None;
        }
    }
}

/// In-memory backend replicating the whole-structure TTL semantics of the
/// Redis backend with `Instant` deadlines. Entries are held as serialized
/// payloads so both backends share the same parse-and-skip read path.
pub struct InMemoryDecisionStore {
    ttl: StoreTtlConfig,
    state: Mutex<StoreState>,
}

impl InMemoryDecisionStore {
    pub fn new(ttl: StoreTtlConfig) -> Self {
        Self {
            ttl,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn shared(ttl: StoreTtlConfig) -> Arc<Self> {
        Arc::new(Self::new(ttl))
    }
}

impl DecisionStore for InMemoryDecisionStore {
    fn ingest(&self, decision: &Decision) -> Result<(), StoreError> {
        let payload = decision
            .payload_json()
            .map_err(|err| StoreError::MalformedEntry(err.to_string()))?;
        let now = Instant::now();
        let mut state = self.state.lock();
        state.purge_expired(now);

        state.recent.insert(decision.id.clone(), payload.clone());
        state.recent_deadline = deadline(now, self.ttl.recent_ttl_seconds);

        state.total_attacks += 1;

        if !decision.cn.is_empty() {
            *state.country_counts.entry(decision.cn.clone()).or_insert(0) += 1;
            state.country_deadline = deadline(now, self.ttl.country_ttl_seconds);
            state.unique_countries.insert(decision.cn.clone());
        }

        let score = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        state
            .history
            .push((score, decision.history_member(&payload)));
        state.history_deadline = deadline(now, self.ttl.history_ttl_seconds);
        Ok(())
    }

    fn latest(&self, count: usize) -> Result<Vec<Decision>, StoreError> {
        let mut state = self.state.lock();
        state.purge_expired(Instant::now());
        let mut decisions = Vec::new();
        for (id, payload) in state.recent.iter() {
            if decisions.len() >= count {
                break;
            }
            match Decision::from_payload(id.clone(), payload) {
                Ok(decision) => decisions.push(decision),
                Err(err) => warn!(id = %id, error = %err, "skipping corrupt recent entry"),
            }
        }
        Ok(decisions)
    }

    fn history(&self, limit: usize, offset: usize) -> Result<Vec<Decision>, StoreError> {
        let limit = limit.min(HISTORY_PAGE_CAP);
        let mut state = self.state.lock();
        state.purge_expired(Instant::now());
        let mut decisions = Vec::new();
        for (_, member) in state.history.iter().rev().skip(offset).take(limit) {
            match Decision::from_history_member(member) {
                Some(decision) => decisions.push(decision),
                None => warn!("skipping corrupt history entry"),
            }
        }
        Ok(decisions)
    }

    fn history_count(&self) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        state.purge_expired(Instant::now());
        Ok(state.history.len() as u64)
    }

    fn country_rollup(&self) -> Result<CountryRollup, StoreError> {
        let mut state = self.state.lock();
        state.purge_expired(Instant::now());
        let countries = state
            .country_counts
            .iter()
            .map(|(code, count)| CountryCount {
                code: code.clone(),
                count: *count,
            })
            .collect();
        Ok(CountryRollup::from_counts(
            state.total_attacks,
            state.unique_countries.len() as u64,
            countries,
        ))
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        *self.state.lock() = StoreState::default();
        Ok(())
    }

    fn ping(&self) -> bool {
        true
    }
}

fn deadline(now: Instant, ttl_seconds: u64) -> Option<Instant> {
    if ttl_seconds == 0 {
        None
    } else {
        Some(now + Duration::from_secs(ttl_seconds))
    }
}
