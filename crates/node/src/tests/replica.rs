use serde_json::json;

use super::*;

#[test]
fn test_all_excludes_sync_markers() {
    let store = DocStore::new("nodes");

    store
        .put("station-1", json!({"region": "nz"}))
        .unwrap();
    store
        .put(SYNC_MARKER_KEY, json!({"origin": "x", "ts_ms": 0}))
        .unwrap();

    let listed = store.all();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].0, "station-1");

    // the marker itself is still addressable by its reserved id
    assert!(store.get(SYNC_MARKER_KEY).is_some());
    assert_eq!(store.write_count(), 2);
}

#[test]
fn test_marker_prefix_convention() {
    assert!(is_sync_marker(SYNC_MARKER_KEY));
    assert!(is_sync_marker("~sync/anything"));
    assert!(!is_sync_marker("station-1"));
    assert!(!is_sync_marker("sync/station-1"));
}

#[test]
fn test_tracked_cid_derives_from_the_store_address() {
    let store = DocStore::new("nodes");

    assert_eq!(store.address(), "/stations/nodes");
    assert_eq!(store.tracked_cid(), Cid::hash(b"/stations/nodes"));

    // fixed at startup: independent instances agree
    assert_eq!(DocStore::new("nodes").tracked_cid(), store.tracked_cid());
    assert_ne!(DocStore::new("trust").tracked_cid(), store.tracked_cid());
}

#[test]
fn test_replica_set_tracks_one_cid_per_store() {
    let replicas = ReplicaSet::new(&["nodes".to_owned(), "trust".to_owned()]);

    let cids = replicas.tracked_cids();
    assert_eq!(cids.len(), 2);
    assert_ne!(cids[0], cids[1]);

    assert!(ReplicaSet::default().is_empty());
}

#[tokio::test]
async fn test_change_events_reach_subscribers() {
    let store = DocStore::new("nodes");
    let mut changes = store.subscribe();

    store.put("station-1", json!({})).unwrap();
    store.del("station-1").unwrap();

    assert_eq!(changes.recv().await.unwrap(), "station-1");
    assert_eq!(changes.recv().await.unwrap(), "station-1");
}
