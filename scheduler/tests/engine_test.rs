mod mock_feed;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::watch;

use chain::signal::{Signal, SignalStrength};
use chain::underlying::Underlying;
use scheduler::config::SchedulerConfig;
use scheduler::engine::SchedulerEngine;
use scheduler::state::TaskStatus;
use snapshot::model::Snapshot;
use snapshot::SnapshotStore;

use mock_feed::{MockCredentials, MockFeed};
use mock_store::MockStore;

fn at(y: i32, m: u32, d: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

/// 2026-02-10 is a Tuesday.
fn weekday(hour: u32, min: u32) -> NaiveDateTime {
    at(2026, 2, 10, hour, min)
}

struct Harness {
    engine: Arc<SchedulerEngine<MockCredentials, MockFeed, MockStore>>,
    credentials: Arc<MockCredentials>,
    feed: Arc<MockFeed>,
    store: MockStore,
}

fn harness(credentials: MockCredentials) -> Harness {
    common::logger::init_logger("scheduler-tests");

    let credentials = Arc::new(credentials);
    let feed = Arc::new(MockFeed::new());
    let store = MockStore::new();

    let engine = SchedulerEngine::new(
        SchedulerConfig::default(),
        Arc::clone(&credentials),
        Arc::clone(&feed),
        Arc::new(store.clone()),
    );

    Harness {
        engine,
        credentials,
        feed,
        store,
    }
}

fn seed_snapshot(underlying: Underlying, ts: NaiveDateTime) -> Snapshot {
    Snapshot {
        ts,
        underlying,
        expiry_date: NaiveDate::from_ymd_opt(2026, 2, 12).unwrap(),
        total_call_oi: 31_000,
        total_put_oi: 46_500,
        call_oi_change: 0,
        put_oi_change: 0,
        pcr: 1.5,
        pcr_change: 0.0,
        spot_price: 25_000.0,
        price_change: 0.0,
        price_change_pct: 0.0,
        signal: Signal::LongUnwinding,
        signal_strength: SignalStrength::Moderate,
        max_pain_strike: 25_000.0,
        highest_call_oi_strike: 25_000.0,
        highest_put_oi_strike: 25_000.0,
        strikes: vec![],
    }
}

#[tokio::test]
async fn weekend_tick_skips_market_work_but_syncs_reference_data() {
    let h = harness(MockCredentials::logged_in());

    // 2026-02-14 is a Saturday.
    h.engine.tick(at(2026, 2, 14, 10, 0)).await;

    let status = h.engine.status().await;
    assert_eq!(status.snapshot.status, TaskStatus::NotStarted);
    assert_eq!(status.reference_sync.status, TaskStatus::Success);
    assert_eq!(h.feed.sync_calls(), 1);
    assert_eq!(h.store.count().await, 0);
}

#[tokio::test]
async fn tick_outside_market_hours_captures_nothing() {
    let h = harness(MockCredentials::logged_in());

    h.engine.tick(weekday(8, 0)).await;

    assert_eq!(h.engine.status().await.snapshot.status, TaskStatus::NotStarted);
    assert_eq!(h.store.count().await, 0);
}

#[tokio::test]
async fn missing_credential_is_recorded_and_not_retried_until_next_slot() {
    let h = harness(MockCredentials::logged_out());

    h.engine.tick(weekday(10, 0)).await;

    let status = h.engine.status().await;
    assert_eq!(status.snapshot.status, TaskStatus::NoCredential);
    assert_eq!(status.snapshot.last_run, Some(weekday(10, 0)));
    assert_eq!(h.store.count().await, 0);

    // The attempt consumed the cadence slot: the very next poll does not
    // hammer the credential source again.
    h.engine.tick(weekday(10, 1)).await;
    assert_eq!(h.credentials.calls(), 1);

    // ...but the next slot does.
    h.engine.tick(weekday(10, 15)).await;
    assert_eq!(h.credentials.calls(), 2);
}

#[tokio::test]
async fn credentialed_tick_inserts_one_snapshot_per_underlying() {
    let h = harness(MockCredentials::logged_in());

    h.engine.tick(weekday(10, 0)).await;

    assert_eq!(h.engine.status().await.snapshot.status, TaskStatus::Success);
    assert_eq!(h.store.count().await, 2);

    let nifty = h.store.latest(Underlying::Nifty).await.unwrap().unwrap();
    let banknifty = h.store.latest(Underlying::BankNifty).await.unwrap().unwrap();

    // 31 strikes × 1000 / 31 strikes × 1500.
    assert_eq!(nifty.total_call_oi, 31_000);
    assert_eq!(nifty.total_put_oi, 46_500);
    assert_eq!(nifty.pcr, 1.5);
    // First snapshot of a series has no deltas to read direction from.
    assert_eq!(nifty.signal, Signal::LongUnwinding);
    assert_eq!(nifty.signal_strength, SignalStrength::Moderate);
    assert_eq!(banknifty.underlying, Underlying::BankNifty);
}

#[tokio::test]
async fn second_capture_classifies_against_previous_snapshot() {
    let h = harness(MockCredentials::logged_in());

    // Seed a smaller, cheaper prior snapshot so the next capture reads
    // price-up / OI-up.
    let mut prior = seed_snapshot(Underlying::Nifty, weekday(9, 30));
    prior.total_call_oi = 20_000;
    prior.total_put_oi = 30_000;
    prior.spot_price = 24_900.0;
    h.store.insert_direct(prior).await;

    h.engine.tick(weekday(10, 0)).await;

    let latest = h.store.latest(Underlying::Nifty).await.unwrap().unwrap();
    assert_eq!(latest.ts, weekday(10, 0));
    assert_eq!(latest.call_oi_change, 11_000);
    assert_eq!(latest.put_oi_change, 16_500);
    assert!((latest.price_change - 112.0).abs() < 1e-9);
    assert_eq!(latest.signal, Signal::LongBuildup);
}

#[tokio::test]
async fn capture_cadence_waits_for_the_interval() {
    let h = harness(MockCredentials::logged_in());

    h.engine.tick(weekday(10, 0)).await;
    assert_eq!(h.store.count().await, 2);

    h.engine.tick(weekday(10, 5)).await;
    assert_eq!(h.store.count().await, 2);

    h.engine.tick(weekday(10, 15)).await;
    assert_eq!(h.store.count().await, 4);
}

#[tokio::test]
async fn rollup_fires_once_inside_the_window() {
    let h = harness(MockCredentials::logged_in());

    h.engine.tick(weekday(10, 0)).await;
    assert_eq!(h.store.rollup_calls(), 0);

    h.engine.tick(weekday(15, 31)).await;
    assert_eq!(h.store.rollup_calls(), 2); // one per underlying
    assert_eq!(h.store.summary_count().await, 2);
    assert_eq!(h.engine.status().await.rollup.status, TaskStatus::Success);

    // Later polls inside the same window do not re-trigger.
    h.engine.tick(weekday(15, 40)).await;
    assert_eq!(h.store.rollup_calls(), 2);
}

#[tokio::test]
async fn rollup_on_a_day_without_snapshots_creates_no_rows() {
    let h = harness(MockCredentials::logged_out());

    h.engine.tick(weekday(15, 31)).await;

    assert_eq!(h.store.summary_count().await, 0);
    // The no-op still counts as a completed run for the daily guard.
    assert_eq!(h.engine.status().await.rollup.status, TaskStatus::Success);
}

#[tokio::test]
async fn cleanup_window_purges_expired_snapshots() {
    let h = harness(MockCredentials::logged_in());

    h.store
        .insert_direct(seed_snapshot(Underlying::Nifty, at(2026, 1, 31, 10, 0)))
        .await;
    h.store
        .insert_direct(seed_snapshot(Underlying::Nifty, at(2026, 2, 9, 10, 0)))
        .await;

    // 18:05 is outside market hours but inside the cleanup window.
    h.engine.tick(weekday(18, 5)).await;

    assert_eq!(h.store.count().await, 1);
    let remaining = h.store.latest(Underlying::Nifty).await.unwrap().unwrap();
    assert_eq!(remaining.ts, at(2026, 2, 9, 10, 0));
    assert_eq!(h.engine.status().await.cleanup.status, TaskStatus::Success);
}

#[tokio::test]
async fn spot_failure_marks_the_task_but_spares_the_loop() {
    let h = harness(MockCredentials::logged_in());
    h.feed.fail_spot.store(true, Ordering::SeqCst);

    h.engine.tick(weekday(10, 0)).await;

    let status = h.engine.status().await;
    match &status.snapshot.status {
        TaskStatus::Error(msg) => {
            // Both underlyings failed independently and both are reported.
            assert!(msg.contains("NIFTY"));
            assert!(msg.contains("BANKNIFTY"));
        }
        other => panic!("expected error status, got {:?}", other),
    }
    assert_eq!(h.store.count().await, 0);

    // Recovery on the next slot once the provider is back.
    h.feed.fail_spot.store(false, Ordering::SeqCst);
    h.engine.tick(weekday(10, 15)).await;
    assert_eq!(h.engine.status().await.snapshot.status, TaskStatus::Success);
    assert_eq!(h.store.count().await, 2);
}

#[tokio::test]
async fn empty_quote_batch_is_a_soft_skip() {
    let h = harness(MockCredentials::logged_in());
    h.feed.empty_quotes.store(true, Ordering::SeqCst);

    h.engine.tick(weekday(10, 0)).await;

    // No rows, no error: an all-empty batch must not poison the series.
    assert_eq!(h.engine.status().await.snapshot.status, TaskStatus::Success);
    assert_eq!(h.store.count().await, 0);
}

#[tokio::test]
async fn force_run_inserts_and_records_status() {
    let h = harness(MockCredentials::logged_in());

    let status = Arc::clone(&h.engine)
        .force_run(Underlying::Nifty)
        .await
        .unwrap();

    assert_eq!(status, TaskStatus::Success);
    assert_eq!(h.store.count().await, 1);
    let snap = h.store.latest(Underlying::Nifty).await.unwrap().unwrap();
    assert_eq!(snap.underlying, Underlying::Nifty);
    assert_eq!(h.engine.status().await.snapshot.status, TaskStatus::Success);
}

#[tokio::test]
async fn force_run_without_credential_reports_it() {
    let h = harness(MockCredentials::logged_out());

    let status = Arc::clone(&h.engine)
        .force_run(Underlying::BankNifty)
        .await
        .unwrap();

    assert_eq!(status, TaskStatus::NoCredential);
    assert_eq!(h.store.count().await, 0);
}

#[tokio::test]
async fn run_loop_stops_cleanly_on_shutdown_signal() {
    let h = harness(MockCredentials::logged_out());
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(Arc::clone(&h.engine).run(rx));

    // Let the startup tick land, then ask for shutdown.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.engine.status().await.running);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop exits promptly")
        .unwrap();

    assert!(!h.engine.status().await.running);
}
