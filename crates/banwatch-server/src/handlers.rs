use std::sync::Arc;

use aggregation::{Decision, HISTORY_PAGE_CAP};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::AppError;
use crate::state::AppState;

/// Size of the recent-window page served by the latest endpoint.
const LATEST_COUNT: usize = 20;
const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Wire shape shared by the latest and history endpoints: one single-key
/// object per decision, keyed by its id.
fn decision_entries(decisions: Vec<Decision>) -> Vec<Value> {
    decisions
        .into_iter()
        .filter_map(|decision| {
            let payload = serde_json::to_value(&decision).ok()?;
            let mut entry = Map::new();
            entry.insert(decision.id, payload);
            Some(Value::Object(entry))
        })
        .collect()
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the banwatch API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn latest_decisions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let decisions = state.store.latest(LATEST_COUNT)?;
    Ok(Json(json!({
        "status": "success",
        "decision": decision_entries(decisions),
    })))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn decision_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit == 0 || limit > HISTORY_PAGE_CAP {
        return Err(AppError::bad_request(format!(
            "limit must be between 1 and {HISTORY_PAGE_CAP}"
        )));
    }
    let offset = query.offset.unwrap_or(0);

    let decisions = state.store.history(limit, offset)?;
    let total = state.store.history_count()?;
    let returned = decisions.len();
    Ok(Json(json!({
        "status": "success",
        "decisions": decision_entries(decisions),
        "pagination": {
            "limit": limit,
            "offset": offset,
            "total": total,
            "returned": returned,
        },
    })))
}

pub async fn country_rollup(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let rollup = state.store.country_rollup()?;
    let countries: Vec<Value> = rollup
        .countries
        .into_iter()
        .map(|country| {
            let mut entry = Map::new();
            entry.insert(country.code, json!(country.count));
            Value::Object(entry)
        })
        .collect();
    Ok(Json(json!({
        "status": "success",
        "metadata": {
            "total_attacks": rollup.total_attacks,
            "unique_countries": rollup.unique_countries,
            "attacks_per_hour": rollup.attacks_per_hour,
        },
        "countries": countries,
    })))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "banwatch" }))
}

pub async fn health_store(State(state): State<Arc<AppState>>) -> Json<Value> {
    if state.store.ping() {
        Json(json!({ "status": "healthy", "store": "connected" }))
    } else {
        Json(json!({ "status": "unhealthy", "store": "unreachable" }))
    }
}
