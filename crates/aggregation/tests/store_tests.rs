use std::thread::sleep;
use std::time::Duration;

use aggregation::{CountryCount, Decision, DecisionStore, InMemoryDecisionStore, StoreTtlConfig};
use serde_json::json;

fn decision(id: &str, cn: &str) -> Decision {
    Decision {
        id: id.to_string(),
        latitude: json!(48.85),
        longitude: json!(2.35),
        cn: cn.to_string(),
        timestamp: "2026-08-04T12:00:00+02:00".to_string(),
    }
}

fn store() -> InMemoryDecisionStore {
    InMemoryDecisionStore::new(StoreTtlConfig::default())
}

fn short_ttl_store() -> InMemoryDecisionStore {
    InMemoryDecisionStore::new(StoreTtlConfig {
        recent_ttl_seconds: 1,
        country_ttl_seconds: 1,
        history_ttl_seconds: 1,
    })
}

#[test]
fn ingest_fans_out_to_every_structure() {
    let store = store();
    for (id, cn) in [("A", "US"), ("B", "US"), ("C", "DE")] {
        store.ingest(&decision(id, cn)).expect("ingest");
    }

    let rollup = store.country_rollup().expect("rollup");
    assert_eq!(rollup.total_attacks, 3);
    assert_eq!(rollup.unique_countries, 2);
    assert_eq!(
        rollup.countries,
        vec![
            CountryCount { code: "US".to_string(), count: 2 },
            CountryCount { code: "DE".to_string(), count: 1 },
        ]
    );
    assert_eq!(store.latest(20).expect("latest").len(), 3);
    assert_eq!(store.history_count().expect("count"), 3);
}

#[test]
fn direct_double_ingest_double_counts() {
    // Dedup is the poller's job; the store itself counts every call.
    let store = store();
    store.ingest(&decision("A", "US")).expect("ingest");
    store.ingest(&decision("A", "US")).expect("ingest");

    let rollup = store.country_rollup().expect("rollup");
    assert_eq!(rollup.total_attacks, 2);
    assert_eq!(rollup.countries[0].count, 2);
    assert_eq!(rollup.unique_countries, 1);
    // The recent window keys by id, so the second write overwrites.
    assert_eq!(store.latest(20).expect("latest").len(), 1);
    assert_eq!(store.history_count().expect("count"), 2);
}

#[test]
fn empty_country_code_skips_country_structures() {
    let store = store();
    store.ingest(&decision("A", "")).expect("ingest");

    let rollup = store.country_rollup().expect("rollup");
    assert_eq!(rollup.total_attacks, 1);
    assert_eq!(rollup.unique_countries, 0);
    assert!(rollup.countries.is_empty());
    assert_eq!(store.latest(20).expect("latest").len(), 1);
}

#[test]
fn latest_returns_at_most_count() {
    let store = store();
    for id in ["A", "B", "C", "D"] {
        store.ingest(&decision(id, "US")).expect("ingest");
    }
    assert_eq!(store.latest(2).expect("latest").len(), 2);
}

#[test]
fn history_is_newest_first() {
    let store = store();
    for id in ["A", "B", "C"] {
        store.ingest(&decision(id, "US")).expect("ingest");
    }
    let page = store.history(10, 0).expect("history");
    let ids: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["C", "B", "A"]);
}

#[test]
fn history_pagination_skips_offset() {
    let store = store();
    for id in ["A", "B", "C", "D", "E"] {
        store.ingest(&decision(id, "US")).expect("ingest");
    }
    let page = store.history(2, 1).expect("history");
    let ids: Vec<&str> = page.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["D", "C"]);
}

#[test]
fn history_limit_is_clamped() {
    let store = store();
    for id in ["A", "B", "C"] {
        store.ingest(&decision(id, "US")).expect("ingest");
    }
    let page = store.history(1_000_000, 0).expect("history");
    assert_eq!(page.len(), 3);
}

#[test]
fn history_offset_past_end_is_empty() {
    let store = store();
    store.ingest(&decision("A", "US")).expect("ingest");
    let page = store.history(5, 10_000).expect("history");
    assert!(page.is_empty());
}

#[test]
fn attacks_per_hour_is_total_over_twenty_four() {
    let store = store();
    for index in 0..25 {
        store
            .ingest(&decision(&format!("id-{index}"), "US"))
            .expect("ingest");
    }
    let rollup = store.country_rollup().expect("rollup");
    assert_eq!(rollup.attacks_per_hour, 1);
}

#[test]
fn rollup_ties_each_appear_exactly_once() {
    let store = store();
    store.ingest(&decision("A", "US")).expect("ingest");
    store.ingest(&decision("B", "DE")).expect("ingest");

    let rollup = store.country_rollup().expect("rollup");
    let mut codes: Vec<&str> = rollup.countries.iter().map(|c| c.code.as_str()).collect();
    codes.sort_unstable();
    assert_eq!(codes, vec!["DE", "US"]);
    assert!(rollup.countries.iter().all(|c| c.count == 1));
}

#[test]
fn rollup_on_empty_store_is_zeroed() {
    let store = store();
    let rollup = store.country_rollup().expect("rollup");
    assert_eq!(rollup.total_attacks, 0);
    assert_eq!(rollup.unique_countries, 0);
    assert_eq!(rollup.attacks_per_hour, 0);
    assert!(rollup.countries.is_empty());
}

#[test]
fn expiring_structures_are_empty_after_ttl() {
    let store = short_ttl_store();
    store.ingest(&decision("A", "US")).expect("ingest");
    sleep(Duration::from_millis(1100));

    assert!(store.latest(20).expect("latest").is_empty());
    assert_eq!(store.history_count().expect("count"), 0);
    assert!(store.history(10, 0).expect("history").is_empty());

    let rollup = store.country_rollup().expect("rollup");
    assert!(rollup.countries.is_empty());
    // The lifetime structures survive window expiry.
    assert_eq!(rollup.total_attacks, 1);
    assert_eq!(rollup.unique_countries, 1);
}

#[test]
fn write_refreshes_whole_structure_ttl() {
    let store = short_ttl_store();
    store.ingest(&decision("A", "US")).expect("ingest");
    sleep(Duration::from_millis(600));
    store.ingest(&decision("B", "DE")).expect("ingest");
    sleep(Duration::from_millis(600));

    // 1.2s after the first write, but the second write re-armed the window.
    assert_eq!(store.latest(20).expect("latest").len(), 2);
    assert_eq!(store.history_count().expect("count"), 2);
}

#[test]
fn clear_all_resets_persistent_counters() {
    let store = store();
    store.ingest(&decision("A", "US")).expect("ingest");
    store.clear_all().expect("clear");

    let rollup = store.country_rollup().expect("rollup");
    assert_eq!(rollup.total_attacks, 0);
    assert_eq!(rollup.unique_countries, 0);
    assert!(store.latest(20).expect("latest").is_empty());
    assert_eq!(store.history_count().expect("count"), 0);
}
