//! End-to-end desk scenarios driven through the handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use orderdesk_core::config::MerchantApiConfig;
use orderdesk_core::desk::{create_desk, DeskDeps, DeskEvent, DeskHandle};
use orderdesk_core::journal::SqliteOrderJournal;
use orderdesk_core::merchant_api::OrderApiError;
use orderdesk_core::order::{OrderPhase, ReturnSource};
use orderdesk_core::testing::fixtures::{new_order, order_in, test_config};
use orderdesk_core::testing::{AlertCall, MockAlertSink, MockOrderApi};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

fn start(deps: DeskDeps) -> (DeskHandle, JoinHandle<()>) {
    start_with(&test_config(), deps)
}

fn start_with(
    config: &orderdesk_core::Config,
    deps: DeskDeps,
) -> (DeskHandle, JoinHandle<()>) {
    let (desk, runner) = create_desk(config, deps);
    (desk, tokio::spawn(runner.run()))
}

async fn next_sync_failure(events: &mut broadcast::Receiver<DeskEvent>) -> DeskEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event @ DeskEvent::SyncFailed { .. }) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event stream ended: {}", e),
            }
        }
    })
    .await
    .expect("no sync failure reported")
}

#[tokio::test]
async fn test_ring_then_stop_then_accept() {
    let sink = MockAlertSink::new();
    let (desk, _runner) = start(DeskDeps::new(Box::new(sink.clone())));

    desk.add_incoming(new_order("O1")).await.unwrap();
    let snap = desk.snapshot().await.unwrap();
    assert!(snap.ringing);
    assert_eq!(snap.pending[0].id, "O1");

    assert!(desk.stop_ring().await.unwrap());
    let snap = desk.snapshot().await.unwrap();
    assert!(!snap.ringing);
    assert_eq!(snap.pending.len(), 1, "silencing must not touch pending");

    let before = Utc::now();
    let accepted = desk.accept("O1").await.unwrap().unwrap();
    assert_eq!(accepted.status, OrderPhase::Packaging);
    assert!(accepted.accepted_at.unwrap() >= before);

    let snap = desk.snapshot().await.unwrap();
    assert!(snap.pending.is_empty());
    assert_eq!(snap.packaging[0].id, "O1");
    assert_eq!(snap.timers.len(), 1);
    assert!(snap.timers[0].countdown.as_ref().unwrap().remaining_ms > 0);

    assert_eq!(sink.calls(), vec![AlertCall::Start, AlertCall::Stop]);
}

#[tokio::test]
async fn test_full_lifecycle_and_return() {
    let (desk, _runner) = start(DeskDeps::new(Box::new(MockAlertSink::new())));

    desk.add_incoming(new_order("O1")).await.unwrap();
    desk.accept("O1").await.unwrap().unwrap();
    desk.mark_packed("O1").await.unwrap().unwrap();
    desk.mark_in_transit("O1").await.unwrap().unwrap();
    let done = desk.complete("O1").await.unwrap().unwrap();

    assert_eq!(done.status, OrderPhase::Completed);
    let stamps = [
        done.accepted_at.unwrap(),
        done.packed_at.unwrap(),
        done.transit_at.unwrap(),
        done.completed_at.unwrap(),
    ];
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));

    // Wrong source bucket is a no-op.
    assert!(desk
        .return_order("O1", ReturnSource::Transit)
        .await
        .unwrap()
        .is_none());

    let returned = desk
        .return_order("O1", ReturnSource::Completed)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(returned.status, OrderPhase::Returned);
    assert_eq!(returned.transit_at, done.transit_at);

    let snap = desk.snapshot().await.unwrap();
    assert_eq!(snap.returned.len(), 1);
    assert!(snap.completed.is_empty());
    assert!(snap.timers.is_empty());
}

#[tokio::test]
async fn test_double_invocation_is_harmless() {
    let (desk, _runner) = start(DeskDeps::new(Box::new(MockAlertSink::new())));

    desk.add_incoming(new_order("O1")).await.unwrap();
    assert!(desk.accept("O1").await.unwrap().is_some());
    assert!(desk.accept("O1").await.unwrap().is_none());
    assert!(desk.mark_packed("O1").await.unwrap().is_some());
    assert!(desk.mark_packed("O1").await.unwrap().is_none());
    assert!(desk.reject("O1").await.unwrap().is_none());

    let snap = desk.snapshot().await.unwrap();
    assert_eq!(snap.packed.len(), 1);
    assert_eq!(snap.find("O1").unwrap().status, OrderPhase::Packed);
}

#[tokio::test]
async fn test_transitions_are_synced_upstream() {
    let api = MockOrderApi::new();
    let deps = DeskDeps::new(Box::new(MockAlertSink::new())).with_api(Arc::new(api.clone()));
    let (desk, _runner) = start(deps);

    desk.add_incoming(new_order("O1")).await.unwrap();
    desk.add_incoming(new_order("O2")).await.unwrap();
    desk.accept("O1").await.unwrap();
    desk.reject("O2").await.unwrap();

    let updates = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let updates = api.recorded_updates().await;
            if updates.len() == 2 {
                return updates;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert!(updates
        .iter()
        .any(|u| u.order_id == "O1" && u.status == "packaging"));
    assert!(updates
        .iter()
        .any(|u| u.order_id == "O2" && u.status == "rejected"));
}

#[tokio::test]
async fn test_sync_failure_keeps_local_state() {
    let api = MockOrderApi::new();
    api.set_next_error(OrderApiError::Timeout).await;
    let deps = DeskDeps::new(Box::new(MockAlertSink::new())).with_api(Arc::new(api.clone()));
    let (desk, _runner) = start(deps);
    let mut events = desk.subscribe();

    desk.add_incoming(new_order("O1")).await.unwrap();
    desk.accept("O1").await.unwrap().unwrap();

    let DeskEvent::SyncFailed {
        order_id, status, ..
    } = next_sync_failure(&mut events).await
    else {
        unreachable!();
    };
    assert_eq!(order_id, "O1");
    assert_eq!(status, "packaging");

    let snap = desk.snapshot().await.unwrap();
    assert_eq!(snap.packaging[0].id, "O1");
}

#[tokio::test]
async fn test_journal_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.db");

    {
        let journal = Arc::new(SqliteOrderJournal::new(&path).unwrap());
        let deps = DeskDeps::new(Box::new(MockAlertSink::new())).with_journal(journal);
        let (desk, runner) = start(deps);

        desk.add_incoming(new_order("O1")).await.unwrap();
        desk.add_incoming(new_order("O2")).await.unwrap();
        desk.add_incoming(new_order("O3")).await.unwrap();
        desk.accept("O1").await.unwrap();
        desk.reject("O2").await.unwrap();

        drop(desk);
        runner.await.unwrap();
    }

    let journal = Arc::new(SqliteOrderJournal::new(&path).unwrap());
    let sink = MockAlertSink::new();
    let deps = DeskDeps::new(Box::new(sink.clone())).with_journal(journal);
    let (desk, _runner) = start(deps);

    let snap = desk.snapshot().await.unwrap();
    assert_eq!(snap.packaging.len(), 1);
    assert!(snap.packaging[0].accepted_at.is_some());
    assert_eq!(snap.pending.len(), 1);
    assert_eq!(snap.pending[0].id, "O3");
    assert!(snap.find("O2").is_none());

    // A restored pending order still needs a decision.
    assert!(snap.ringing);
    assert_eq!(snap.popup.current.as_ref().map(|o| o.id.as_str()), Some("O3"));
    assert_eq!(snap.unread, 0);
    assert_eq!(sink.calls(), vec![AlertCall::Start]);

    desk.accept("O3").await.unwrap().unwrap();
    assert!(!desk.snapshot().await.unwrap().ringing);
}

#[tokio::test]
async fn test_hydrate_on_start() {
    let api = MockOrderApi::new();
    api.set_orders(vec![
        order_in("H1", OrderPhase::Packed, Utc::now()),
        order_in("H2", OrderPhase::Completed, Utc::now()),
        order_in("H3", OrderPhase::Pending, Utc::now()),
    ])
    .await;

    let mut config = test_config();
    config.merchant_api = Some(MerchantApiConfig {
        base_url: "http://unused".to_string(),
        timeout_secs: 1,
        hydrate_on_start: true,
    });
    let sink = MockAlertSink::new();
    let deps = DeskDeps::new(Box::new(sink.clone())).with_api(Arc::new(api));
    let (desk, _runner) = start_with(&config, deps);

    let snap = desk.snapshot().await.unwrap();
    assert_eq!(snap.packed[0].id, "H1");
    assert_eq!(snap.completed[0].id, "H2");
    assert_eq!(snap.pending[0].id, "H3");
    assert!(snap.ringing);
    assert_eq!(snap.popup.current.as_ref().map(|o| o.id.as_str()), Some("H3"));
    assert_eq!(snap.unread, 0);
    assert_eq!(sink.calls(), vec![AlertCall::Start]);

    // Already-known ids are skipped.
    let added = desk
        .hydrate(vec![order_in("H1", OrderPhase::Packed, Utc::now())])
        .await
        .unwrap();
    assert_eq!(added, 0);
}

#[tokio::test]
async fn test_hydrate_command_queues_pending_orders() {
    let (desk, _runner) = start(DeskDeps::new(Box::new(MockAlertSink::new())));
    let mut events = desk.subscribe();

    let added = desk
        .hydrate(vec![
            order_in("P1", OrderPhase::Pending, Utc::now()),
            order_in("P2", OrderPhase::Pending, Utc::now()),
            order_in("K1", OrderPhase::Packaging, Utc::now()),
        ])
        .await
        .unwrap();
    assert_eq!(added, 3);

    let snap = desk.snapshot().await.unwrap();
    assert!(snap.ringing);
    assert_eq!(snap.popup.current.as_ref().map(|o| o.id.as_str()), Some("P1"));
    assert_eq!(snap.popup.queued, 1);
    assert_eq!(snap.unread, 0);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.event_type());
    }
    assert!(kinds.contains(&"ring_changed"));
    assert!(kinds.contains(&"popup_changed"));
}

#[tokio::test]
async fn test_sync_preserves_transition_order() {
    let api = MockOrderApi::new();
    // The first update is slow; the second must still land after it.
    api.set_update_delay("packaging", Duration::from_millis(100))
        .await;
    let deps = DeskDeps::new(Box::new(MockAlertSink::new())).with_api(Arc::new(api.clone()));
    let (desk, _runner) = start(deps);

    desk.add_incoming(new_order("O1")).await.unwrap();
    desk.accept("O1").await.unwrap().unwrap();
    desk.mark_packed("O1").await.unwrap().unwrap();

    let updates = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let updates = api.recorded_updates().await;
            if updates.len() == 2 {
                return updates;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let statuses: Vec<_> = updates.iter().map(|u| u.status.as_str()).collect();
    assert_eq!(statuses, vec!["packaging", "packed"]);
    assert!(updates.iter().all(|u| u.order_id == "O1"));
}
