mod common;

use std::time::Duration;

use common::{FlakyStore, field, seed_remote};
use remotelink_core::RemoteId;
use remotelink_relay::{
    Collection, MemoryDocumentStore, MockTransport, Poller, RelayError, TelemetryLiveness,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn sweep_probes_every_remote_independently() -> Result<(), RelayError> {
    let store = MemoryDocumentStore::new();
    seed_remote(&store, "r1", "", false, 2).await?;
    seed_remote(&store, "r2", "", true, 2).await?;
    seed_remote(&store, "r3", "learning", false, 1).await?;

    let transport = MockTransport::with_offline([RemoteId::from("r2")]);
    let poller = Poller::new(store.clone(), transport.clone(), TelemetryLiveness::default());

    let report = poller.sweep().await?;

    assert_eq!(report.probed, 3);
    assert_eq!(report.online, 2);
    assert_eq!(report.offline, 1);
    assert!(report.failures.is_empty());

    assert_eq!(field(&store, Collection::Remotes, "r1", "isOnline").await, Some(json!(true)));
    assert_eq!(field(&store, Collection::Remotes, "r2", "isOnline").await, Some(json!(false)));
    assert_eq!(field(&store, Collection::Remotes, "r3", "isOnline").await, Some(json!(true)));

    assert_eq!(
        field(&store, Collection::Devices, "r1-d1", "isAvailable").await,
        Some(json!(true))
    );
    assert_eq!(
        field(&store, Collection::Devices, "r2-d1", "isAvailable").await,
        Some(json!(false))
    );
    assert_eq!(
        field(&store, Collection::Devices, "r3-d0", "isAvailable").await,
        Some(json!(false))
    );

    let sent = transport.sent().await;
    assert_eq!(sent.len(), 3);
    for command in &sent {
        let payload: Value = serde_json::from_slice(&command.payload).unwrap();
        assert_eq!(payload, json!({ "alive": "?" }));
    }

    Ok(())
}

#[tokio::test]
async fn sweep_collects_failures_without_stopping() -> Result<(), RelayError> {
    let store = FlakyStore::failing_updates([
        (Collection::Remotes, "r1"),
        (Collection::Devices, "r3-d0"),
    ]);
    seed_remote(&store, "r1", "", false, 1).await?;
    seed_remote(&store, "r2", "", false, 1).await?;
    seed_remote(&store, "r3", "", false, 2).await?;

    let poller = Poller::new(store.clone(), MockTransport::new(), TelemetryLiveness::default());
    let report = poller.sweep().await?;

    assert_eq!(report.probed, 3);
    assert_eq!(report.online, 2);
    assert_eq!(report.failures.len(), 2);
    let failed: Vec<_> = report
        .failures
        .iter()
        .map(|f| f.remote_id.as_str())
        .collect();
    assert!(failed.contains(&"r1"));
    assert!(failed.contains(&"r3"));

    // r1's isOnline write failed, so its devices were never touched.
    assert_eq!(
        field(&store, Collection::Devices, "r1-d0", "isAvailable").await,
        Some(json!(false))
    );
    assert_eq!(
        field(&store, Collection::Devices, "r2-d0", "isAvailable").await,
        Some(json!(true))
    );
    assert_eq!(
        field(&store, Collection::Devices, "r3-d1", "isAvailable").await,
        Some(json!(true))
    );

    Ok(())
}

#[tokio::test]
async fn sweep_over_no_remotes_is_empty() -> Result<(), RelayError> {
    let transport = MockTransport::new();
    let poller = Poller::new(
        MemoryDocumentStore::new(),
        transport.clone(),
        TelemetryLiveness::default(),
    );

    let report = poller.sweep().await?;

    assert_eq!(report.probed, 0);
    assert!(report.failures.is_empty());
    assert!(transport.sent().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn run_sweeps_until_cancelled() -> Result<(), RelayError> {
    let store = MemoryDocumentStore::new();
    seed_remote(&store, "r1", "", false, 1).await?;

    let transport = MockTransport::new();
    let poller = Poller::new(store.clone(), transport.clone(), TelemetryLiveness::default());
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(poller.run(Duration::from_millis(10), cancel.clone()));

    // The first tick fires immediately.
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    handle.await.unwrap();

    assert!(!transport.sent().await.is_empty());
    assert_eq!(field(&store, Collection::Remotes, "r1", "isOnline").await, Some(json!(true)));

    Ok(())
}

#[tokio::test]
async fn run_with_zero_interval_exits_without_sweeping() -> Result<(), RelayError> {
    let store = MemoryDocumentStore::new();
    seed_remote(&store, "r1", "", false, 1).await?;

    let transport = MockTransport::new();
    let poller = Poller::new(store, transport.clone(), TelemetryLiveness::default());

    let handle = tokio::spawn(poller.run(Duration::ZERO, CancellationToken::new()));

    assert!(handle.await.is_ok());
    assert!(transport.sent().await.is_empty());

    Ok(())
}
