#[cfg(test)]
#[path = "tests/sync.rs"]
mod tests;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, sleep, Duration, Instant, MissedTickBehavior};
use tokio::{select, spawn};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::replica::{ReplicaSet, SYNC_MARKER_KEY};

pub const SETTLE_DELAY: Duration = Duration::from_secs(5);
pub const TRIGGER_COOLDOWN: Duration = Duration::from_secs(30);
pub const FALLBACK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A forced-replication heartbeat document. Writing one makes the store
/// re-publish its current head over the transport, which any newly meshed
/// peer will now observe.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncMarker {
    pub origin: String,
    pub ts_ms: u64,
}

/// Compensates for a replication transport that only pushes updates to
/// peers already listening at publish time: a peer that connects afterward
/// would otherwise only receive updates on the next organic write.
///
/// One trigger writes one marker per store. Triggers are debounced behind a
/// single process-wide cooldown, not a per-peer one.
#[derive(Clone, Debug)]
pub struct SyncTrigger {
    origin: String,
    replicas: ReplicaSet,
    connected: Arc<AtomicUsize>,
    last_trigger: Arc<Mutex<Option<Instant>>>,
}

impl SyncTrigger {
    #[must_use]
    pub fn new(origin: String, replicas: ReplicaSet, connected: Arc<AtomicUsize>) -> Self {
        Self {
            origin,
            replicas,
            connected,
            last_trigger: Arc::new(Mutex::new(None)),
        }
    }

    /// Drives the trigger from connection events plus the periodic fallback
    /// until shutdown.
    pub async fn run(self, mut connections: mpsc::Receiver<String>, shutdown: CancellationToken) {
        let started = Instant::now();
        let mut fallback = interval_at(started + FALLBACK_INTERVAL, FALLBACK_INTERVAL);
        fallback.set_missed_tick_behavior(MissedTickBehavior::Delay);

        #[expect(clippy::redundant_pub_crate, reason = "Needed for Tokio code")]
        loop {
            select! {
                () = shutdown.cancelled() => break,
                Some(peer_id) = connections.recv() => {
                    // each event settles independently; the cooldown check
                    // happens after the settle delay, not before
                    let trigger = self.clone();
                    let shutdown = shutdown.clone();

                    drop(spawn(async move {
                        sleep(SETTLE_DELAY).await;

                        if shutdown.is_cancelled() {
                            return;
                        }

                        trigger.trigger_debounced(&peer_id).await;
                    }));
                }
                _ = fallback.tick() => {
                    if self.connected.load(Ordering::Relaxed) > 0 {
                        debug!("Fallback sync trigger");

                        self.trigger().await;
                    }
                }
            }
        }
    }

    /// Fires unless another trigger fired within the cooldown window.
    pub async fn trigger_debounced(&self, peer_id: &str) {
        let mut last_trigger = self.last_trigger.lock().await;

        if let Some(last) = *last_trigger {
            if last.elapsed() < TRIGGER_COOLDOWN {
                debug!(%peer_id, "Skipping sync trigger, cooldown active");

                return;
            }
        }

        debug!(%peer_id, "Connection-event sync trigger");

        self.write_markers();

        *last_trigger = Some(Instant::now());
    }

    /// Fires unconditionally (the fallback path).
    pub async fn trigger(&self) {
        let mut last_trigger = self.last_trigger.lock().await;

        self.write_markers();

        *last_trigger = Some(Instant::now());
    }

    fn write_markers(&self) {
        let marker = SyncMarker {
            origin: self.origin.clone(),
            ts_ms: unix_time_ms(),
        };

        for store in self.replicas.stores() {
            if let Err(err) = store.put(SYNC_MARKER_KEY, json!(&marker)) {
                warn!(store = %store.name(), %err, "Failed to write sync marker");
            }
        }
    }
}

fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
