//! Integration tests for StateManager with state change events
//!
//! These tests verify that the StateManager correctly:
//! - Emits state change events on mutations
//! - Supports multiple subscribers
//! - Handles concurrent access from multiple threads
//! - Keeps an imported session intact while rates change

use camino::Utf8PathBuf;
use costsheet::models::{ColumnMap, LineItem, SessionState, SkipReason, SkippedRow};
use costsheet::{RateConfig, StateChange, StateManager};
use std::sync::Arc;
use tokio::time::{Duration, timeout};
use tokio_test::{assert_err, assert_ok};

fn session(items: usize) -> SessionState {
    let items: Vec<LineItem> = (0..items)
        .map(|i| LineItem {
            row_index: i as u32 + 4,
            name: format!("Item {}", i),
            unit_cost: 1360.0,
            total_line_cost: 13600.0,
            source_price: 10.0,
            quantity: 10,
            cartons: 2.0,
            units_per_carton: 5.0,
            volume_cbm: 0.1,
        })
        .collect();
    let grand_total = 13600.0 * items.len() as f64;

    SessionState {
        items,
        skipped: vec![SkippedRow {
            row_index: 99,
            reason: SkipReason::ZeroCartons,
        }],
        source_path: Utf8PathBuf::from("/quotes/spring.xlsx"),
        header_row: 3,
        column_map: ColumnMap::new(),
        total_column: None,
        grand_total,
        rates: RateConfig::default(),
    }
}

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<StateChange>) -> StateChange {
    timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed")
}

#[tokio::test]
async fn test_rate_update_emits_event() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    assert_ok!(state.update_rates(37.5, 48000.0));

    let event = next_event(&mut rx).await;
    assert_eq!(
        event,
        StateChange::RatesChanged {
            exchange_rate: 37.5,
            shipping_rate: 48000.0
        }
    );
}

#[tokio::test]
async fn test_session_loaded_event_carries_summary() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    state.load_session(session(3));

    let event = next_event(&mut rx).await;
    assert_eq!(
        event,
        StateChange::SessionLoaded {
            items: 3,
            skipped: 1,
            grand_total: 40800.0
        }
    );

    // Followed by the status line
    let event = next_event(&mut rx).await;
    assert!(
        matches!(&event, StateChange::StatusChanged { message } if message.contains("spring.xlsx")),
        "Expected StatusChanged, got: {:?}",
        event
    );
}

#[tokio::test]
async fn test_reimport_of_unchanged_sheet_is_announced() {
    let state = Arc::new(StateManager::new());
    state.load_session(session(3));
    state.record_export(Utf8PathBuf::from("/exports/CostSheet_1.xlsx"));
    let mut rx = state.subscribe();

    state.load_session(session(3));

    // The export path is cleared, then the unchanged session is reported anyway
    let mut loaded = None;
    while let Ok(Ok(event)) = timeout(Duration::from_millis(100), rx.recv()).await {
        if matches!(event, StateChange::SessionLoaded { .. }) {
            loaded = Some(event);
        }
    }
    assert_eq!(
        loaded,
        Some(StateChange::SessionLoaded {
            items: 3,
            skipped: 1,
            grand_total: 40800.0
        })
    );
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let state = Arc::new(StateManager::new());
    let mut rx1 = state.subscribe();
    let mut rx2 = state.subscribe();
    let mut rx3 = state.subscribe();

    state.load_session(session(1));

    for rx in [&mut rx1, &mut rx2, &mut rx3] {
        let event = next_event(rx).await;
        assert!(matches!(event, StateChange::SessionLoaded { items: 1, .. }));
    }
}

#[tokio::test]
async fn test_failure_event_after_status() {
    let state = Arc::new(StateManager::new());
    state.load_session(session(2));
    let mut rx = state.subscribe();

    state.record_failure("Export", "quote.xlsx is open in another program".to_string());

    let status = next_event(&mut rx).await;
    assert_eq!(
        status,
        StateChange::StatusChanged {
            message: "Export failed".to_string()
        }
    );

    let failure = next_event(&mut rx).await;
    assert_eq!(
        failure,
        StateChange::OperationFailed {
            operation: "Export".to_string(),
            message: "quote.xlsx is open in another program".to_string()
        }
    );

    // A failed export leaves the session alone
    assert_eq!(state.read(|s| s.item_count()), 2);
}

#[tokio::test]
async fn test_new_session_clears_last_export() {
    let state = Arc::new(StateManager::new());
    state.load_session(session(1));
    state.record_export(Utf8PathBuf::from("/downloads/CostSheet_1.xlsx"));

    state.load_session(session(2));

    let snapshot = state.snapshot();
    assert!(snapshot.last_export_path.is_none());
    assert_eq!(snapshot.item_count(), 2);
}

#[tokio::test]
async fn test_rates_do_not_reprice_existing_session() {
    let state = Arc::new(StateManager::new());
    state.load_session(session(2));

    state.update_rates(99.0, 1.0).unwrap();

    let snapshot = state.snapshot();
    assert_eq!(snapshot.grand_total(), 27200.0);
    assert_eq!(snapshot.session.unwrap().rates, RateConfig::default());
    assert_eq!(snapshot.rates.exchange_rate(), 99.0);
}

#[tokio::test]
async fn test_rejected_rates_emit_nothing() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    assert_err!(state.update_rates(0.0, 50000.0));
    assert_err!(state.update_rates(36.0, f64::NAN));

    assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    assert_eq!(state.read(|s| s.rates), RateConfig::default());
}

#[tokio::test]
async fn test_no_event_without_change() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    state.update(|_| {});

    assert!(
        timeout(Duration::from_millis(50), rx.recv()).await.is_err(),
        "No event expected for a no-op update"
    );
}

#[test]
fn test_concurrent_readers_and_writers() {
    let state = Arc::new(StateManager::new());

    let writers: Vec<_> = (1..=4)
        .map(|i| {
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                for n in 0..50 {
                    state.update_rates(i as f64 + n as f64 / 100.0, 50000.0).unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    let rate = state.read(|s| s.rates.exchange_rate());
                    assert!(rate > 0.0);
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    assert!(state.read(|s| s.rates.exchange_rate()) >= 1.0);
}
