use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::replica::ReplicaSet;

fn fixture(connected: usize) -> (SyncTrigger, ReplicaSet, Arc<AtomicUsize>) {
    let replicas = ReplicaSet::new(&["nodes".to_owned(), "trust".to_owned()]);
    let connected = Arc::new(AtomicUsize::new(connected));
    let trigger = SyncTrigger::new(
        "12D3KooWStationTest".to_owned(),
        replicas.clone(),
        Arc::clone(&connected),
    );

    (trigger, replicas, connected)
}

#[tokio::test(start_paused = true)]
async fn test_connection_burst_writes_one_marker_per_store() {
    let (trigger, replicas, _connected) = fixture(1);
    let (connections, receiver) = mpsc::channel(32);
    let shutdown = CancellationToken::new();

    let task = tokio::spawn(trigger.run(receiver, shutdown.clone()));

    // ten connection events within one second
    for i in 0..10 {
        connections.send(format!("peer-{i}")).await.unwrap();
        sleep(Duration::from_millis(100)).await;
    }

    // let every settle delay elapse
    sleep(SETTLE_DELAY + Duration::from_secs(1)).await;

    for store in replicas.stores() {
        assert_eq!(store.write_count(), 1, "store {}", store.name());
        assert!(store.get(SYNC_MARKER_KEY).is_some());
    }

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_trigger_fires_again_after_the_cooldown() {
    let (trigger, replicas, _connected) = fixture(1);
    let (connections, receiver) = mpsc::channel(32);
    let shutdown = CancellationToken::new();

    let task = tokio::spawn(trigger.run(receiver, shutdown.clone()));

    connections.send("peer-a".to_owned()).await.unwrap();
    sleep(SETTLE_DELAY + Duration::from_secs(1)).await;
    assert_eq!(replicas.stores()[0].write_count(), 1);

    // within the cooldown: suppressed
    connections.send("peer-b".to_owned()).await.unwrap();
    sleep(SETTLE_DELAY + Duration::from_secs(1)).await;
    assert_eq!(replicas.stores()[0].write_count(), 1);

    // past the cooldown: fires
    sleep(TRIGGER_COOLDOWN).await;
    connections.send("peer-c".to_owned()).await.unwrap();
    sleep(SETTLE_DELAY + Duration::from_secs(1)).await;
    assert_eq!(replicas.stores()[0].write_count(), 2);

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_fallback_fires_only_while_peers_are_connected() {
    let (trigger, replicas, connected) = fixture(0);
    let (_connections, receiver) = mpsc::channel(32);
    let shutdown = CancellationToken::new();

    let task = tokio::spawn(trigger.run(receiver, shutdown.clone()));

    // nobody connected: the first fallback tick writes nothing
    sleep(FALLBACK_INTERVAL + Duration::from_secs(1)).await;
    assert_eq!(replicas.stores()[0].write_count(), 0);

    connected.store(2, Ordering::Relaxed);

    sleep(FALLBACK_INTERVAL).await;
    assert_eq!(replicas.stores()[0].write_count(), 1);
    assert_eq!(replicas.stores()[1].write_count(), 1);

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_settles() {
    let (trigger, replicas, _connected) = fixture(1);
    let (connections, receiver) = mpsc::channel(32);
    let shutdown = CancellationToken::new();

    let task = tokio::spawn(trigger.run(receiver, shutdown.clone()));

    connections.send("peer-a".to_owned()).await.unwrap();
    sleep(Duration::from_secs(1)).await;

    shutdown.cancel();
    task.await.unwrap();

    sleep(SETTLE_DELAY).await;
    assert_eq!(replicas.stores()[0].write_count(), 0);
}
