use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use redis::Commands;
use tracing::warn;

use crate::decision::Decision;
use crate::store::{
    CountryCount, CountryRollup, DecisionStore, StoreError, StoreTtlConfig, HISTORY_PAGE_CAP,
};

#[derive(Clone, Debug)]
pub struct RedisStoreConfig {
    pub key_prefix: String,
    pub ttl: StoreTtlConfig,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "banwatch".to_string(),
            ttl: StoreTtlConfig::default(),
        }
    }
}

/// Redis backend for the five aggregates.
///
/// Layout: recent window as a hash of id to payload, country counters as a
/// hash of code to integer, unique countries as a set, the total as a plain
/// counter key, and history as a sorted set scored by unix seconds with
/// `id:payload` members. The three expiring structures get a fresh EXPIRE
/// on every write, so one write re-arms the whole structure.
#[derive(Clone)]
pub struct RedisDecisionStore {
    client: redis::Client,
    config: RedisStoreConfig,
}

impl RedisDecisionStore {
    pub fn new(client: redis::Client, config: RedisStoreConfig) -> Self {
        Self { client, config }
    }

    fn recent_key(&self) -> String {
        format!("{}:decisions:recent", self.config.key_prefix)
    }

    fn country_key(&self) -> String {
        format!("{}:country:counts", self.config.key_prefix)
    }

    fn unique_key(&self) -> String {
        format!("{}:countries:unique", self.config.key_prefix)
    }

    fn total_key(&self) -> String {
        format!("{}:attacks:total", self.config.key_prefix)
    }

    fn history_key(&self) -> String {
        format!("{}:decisions:history", self.config.key_prefix)
    }

    fn connection(&self) -> Result<redis::Connection, StoreError> {
        self.client
            .get_connection()
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }

    fn increment_total(&self, conn: &mut redis::Connection) -> redis::RedisResult<()> {
        let _: u64 = redis::cmd("INCR").arg(self.total_key()).query(conn)?;
        Ok(())
    }

    fn increment_country(
        &self,
        conn: &mut redis::Connection,
        country: &str,
    ) -> redis::RedisResult<()> {
        let _: i64 = redis::cmd("HINCRBY")
            .arg(self.country_key())
            .arg(country)
            .arg(1)
            .query(conn)?;
        refresh_ttl(conn, &self.country_key(), self.config.ttl.country_ttl_seconds)
    }

    fn add_unique_country(
        &self,
        conn: &mut redis::Connection,
        country: &str,
    ) -> redis::RedisResult<()> {
        let _: i32 = redis::cmd("SADD")
            .arg(self.unique_key())
            .arg(country)
            .query(conn)?;
        Ok(())
    }

    fn append_history(
        &self,
        conn: &mut redis::Connection,
        decision: &Decision,
        payload: &str,
    ) -> redis::RedisResult<()> {
        let score = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        let _: i32 = redis::cmd("ZADD")
            .arg(self.history_key())
            .arg(score)
            .arg(decision.history_member(payload))
            .query(conn)?;
        refresh_ttl(conn, &self.history_key(), self.config.ttl.history_ttl_seconds)
    }
}

impl DecisionStore for RedisDecisionStore {
    fn ingest(&self, decision: &Decision) -> Result<(), StoreError> {
        let payload = decision
            .payload_json()
            .map_err(|err| StoreError::MalformedEntry(err.to_string()))?;
        let mut conn = self.connection()?;

        // Primary write: the recent-window entry. Only this failure aborts
        // the ingest; the remaining fan-out steps are isolated below.
        let _: i32 = redis::cmd("HSET")
            .arg(self.recent_key())
            .arg(&decision.id)
            .arg(&payload)
            .query(&mut conn)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        if let Err(err) = refresh_ttl(&mut conn, &self.recent_key(), self.config.ttl.recent_ttl_seconds)
        {
            warn!(id = %decision.id, error = %err, "failed to refresh recent-window ttl");
        }

        if let Err(err) = self.increment_total(&mut conn) {
            warn!(id = %decision.id, error = %err, "failed to increment total counter");
        }

        if !decision.cn.is_empty() {
            if let Err(err) = self.increment_country(&mut conn, &decision.cn) {
                warn!(country = %decision.cn, error = %err, "failed to increment country counter");
            }
            if let Err(err) = self.add_unique_country(&mut conn, &decision.cn) {
                warn!(country = %decision.cn, error = %err, "failed to record unique country");
            }
        }

        if let Err(err) = self.append_history(&mut conn, decision, &payload) {
            warn!(id = %decision.id, error = %err, "failed to append history entry");
        }

        Ok(())
    }

    fn latest(&self, count: usize) -> Result<Vec<Decision>, StoreError> {
        let mut conn = self.connection()?;
        let entries: HashMap<String, String> = conn
            .hgetall(self.recent_key())
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let mut decisions = Vec::new();
        for (id, payload) in entries {
            if decisions.len() >= count {
                break;
            }
            match Decision::from_payload(id.clone(), &payload) {
                Ok(decision) => decisions.push(decision),
                Err(err) => warn!(id = %id, error = %err, "skipping corrupt recent entry"),
            }
        }
        Ok(decisions)
    }

    fn history(&self, limit: usize, offset: usize) -> Result<Vec<Decision>, StoreError> {
        let limit = limit.min(HISTORY_PAGE_CAP);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.connection()?;
        let stop = offset + limit - 1;
        let members: Vec<String> = redis::cmd("ZREVRANGE")
            .arg(self.history_key())
            .arg(offset as isize)
            .arg(stop as isize)
            .query(&mut conn)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let mut decisions = Vec::new();
        for member in members {
            match Decision::from_history_member(&member) {
                Some(decision) => decisions.push(decision),
                None => warn!("skipping corrupt history entry"),
            }
        }
        Ok(decisions)
    }

    fn history_count(&self) -> Result<u64, StoreError> {
        let mut conn = self.connection()?;
        conn.zcard(self.history_key())
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }

    fn country_rollup(&self) -> Result<CountryRollup, StoreError> {
        let mut conn = self.connection()?;
        let raw_counts: HashMap<String, String> = conn
            .hgetall(self.country_key())
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let mut countries = Vec::new();
        for (code, raw) in raw_counts {
            match raw.parse::<u64>() {
                Ok(count) => countries.push(CountryCount { code, count }),
                Err(_) => warn!(country = %code, value = %raw, "skipping corrupt country count"),
            }
        }

        let total_raw: Option<String> = conn
            .get(self.total_key())
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        let total_attacks = match total_raw {
            Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                warn!(value = %raw, "corrupt total-attacks counter, reporting zero");
                0
            }),
            None => 0,
        };

        let unique_countries: u64 = conn
            .scard(self.unique_key())
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        Ok(CountryRollup::from_counts(
            total_attacks,
            unique_countries,
            countries,
        ))
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let _: i32 = redis::cmd("DEL")
            .arg(self.recent_key())
            .arg(self.country_key())
            .arg(self.unique_key())
            .arg(self.total_key())
            .arg(self.history_key())
            .query(&mut conn)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(())
    }

    fn ping(&self) -> bool {
        let mut conn = match self.client.get_connection() {
            Ok(conn) => conn,
            Err(_) => return false,
        };
        redis::cmd("PING").query::<String>(&mut conn).is_ok()
    }
}

fn refresh_ttl(conn: &mut redis::Connection, key: &str, seconds: u64) -> redis::RedisResult<()> {
    if seconds > 0 {
        let _: i32 = redis::cmd("EXPIRE").arg(key).arg(seconds).query(conn)?;
    }
    Ok(())
}
