#[cfg(test)]
#[path = "tests/replica.rs"]
mod tests;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use eyre::Result as EyreResult;
use parking_lot::RwLock;
use serde_json::Value;
use station_primitives::Cid;
use tokio::sync::broadcast;

/// Reserved id namespace for forced-replication heartbeat documents.
///
/// Every application-level enumeration filters keys under this prefix out;
/// the markers exist purely to make the replication transport re-announce
/// its current head.
pub const SYNC_MARKER_PREFIX: &str = "~sync/";

/// The reserved id a station's sync markers are written under. Each write
/// supersedes the previous one.
pub const SYNC_MARKER_KEY: &str = "~sync/marker";

#[must_use]
pub fn is_sync_marker(key: &str) -> bool {
    key.starts_with(SYNC_MARKER_PREFIX)
}

/// A replicated document store, keyed by name.
///
/// In-process stand-in for the external replication transport: same
/// contract (`put`/`get`/`all`/`del` plus change events), eventually
/// consistent by that transport's design, so nothing here may assume strict
/// consistency.
#[derive(Clone, Debug)]
pub struct DocStore {
    name: String,
    address: String,
    inner: Arc<RwLock<BTreeMap<String, Value>>>,
    writes: Arc<AtomicUsize>,
    changes: broadcast::Sender<String>,
}

impl DocStore {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let (changes, _receiver) = broadcast::channel(64);

        Self {
            name: name.to_owned(),
            address: format!("/stations/{name}"),
            inner: Arc::default(),
            writes: Arc::default(),
            changes,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The store's replication address; the identifier announced to the DHT
    /// is derived from it.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn tracked_cid(&self) -> Cid {
        Cid::hash(self.address.as_bytes())
    }

    pub fn put(&self, key: &str, doc: Value) -> EyreResult<()> {
        let _previous = self.inner.write().insert(key.to_owned(), doc);
        let _count = self.writes.fetch_add(1, Ordering::Relaxed);

        let _receivers = self.changes.send(key.to_owned());

        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    pub fn del(&self, key: &str) -> EyreResult<()> {
        let _previous = self.inner.write().remove(key);

        let _receivers = self.changes.send(key.to_owned());

        Ok(())
    }

    /// Application-level listing: sync markers are excluded by their
    /// reserved-id prefix.
    #[must_use]
    pub fn all(&self) -> Vec<(String, Value)> {
        self.inner
            .read()
            .iter()
            .filter(|(key, _doc)| !is_sync_marker(key))
            .map(|(key, doc)| (key.clone(), doc.clone()))
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }

    /// Total writes this process has issued, markers included.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

/// The station's replicated stores, in config order. The first store is the
/// representative for discover-loop lookups.
#[derive(Clone, Debug, Default)]
pub struct ReplicaSet {
    stores: Vec<DocStore>,
}

impl ReplicaSet {
    #[must_use]
    pub fn new(names: &[String]) -> Self {
        Self {
            stores: names.iter().map(|name| DocStore::new(name)).collect(),
        }
    }

    #[must_use]
    pub fn stores(&self) -> &[DocStore] {
        &self.stores
    }

    /// The identifiers this station announces to the DHT; fixed at startup.
    #[must_use]
    pub fn tracked_cids(&self) -> Vec<Cid> {
        self.stores.iter().map(DocStore::tracked_cid).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
