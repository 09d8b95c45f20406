use std::collections::HashSet;

use libp2p::{Multiaddr, PeerId};
use station_primitives::Cid;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, timeout, Duration, Instant, MissedTickBehavior};
use tokio::{select, spawn};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::addr::host_of;
use crate::client::NetworkClient;
use crate::types::{DialFailure, ProviderRecord};

pub const PROVIDE_WARMUP: Duration = Duration::from_secs(10);
pub const PROVIDE_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const PROVIDE_TIMEOUT: Duration = Duration::from_secs(30);

pub const DISCOVER_INTERVAL: Duration = Duration::from_secs(60);
pub const FIND_PROVIDERS_TIMEOUT: Duration = Duration::from_secs(15);

pub const DIRECT_DIAL_INTERVAL: Duration = Duration::from_secs(60);

/// The periodic half of the mesh: announces tracked identifiers, sweeps the
/// routing fabric for fellow providers, and keeps statically configured
/// targets dialed. Each loop checks the shutdown token before a cycle's
/// work; a timed-out cycle simply ends early.
#[derive(Debug)]
pub struct MeshManager {
    tasks: Vec<JoinHandle<()>>,
}

impl MeshManager {
    #[must_use]
    pub fn start(
        client: NetworkClient,
        tracked: Vec<Cid>,
        direct_dial: Vec<Multiaddr>,
        shutdown: CancellationToken,
    ) -> Self {
        let mut tasks = Vec::new();

        if !tracked.is_empty() {
            tasks.push(spawn(provide_loop(
                client.clone(),
                tracked.clone(),
                shutdown.clone(),
            )));

            // a provider of one tracked identifier provides all of them, so
            // one representative lookup per cycle suffices
            tasks.push(spawn(discover_loop(
                client.clone(),
                tracked[0],
                shutdown.clone(),
            )));
        }

        if !direct_dial.is_empty() {
            tasks.push(spawn(direct_dial_loop(client, direct_dial, shutdown)));
        }

        Self { tasks }
    }

    /// Waits for the loops to finish after their token was cancelled.
    pub async fn stopped(self) {
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(%err, "Mesh loop did not shut down cleanly");
            }
        }
    }
}

async fn provide_loop(client: NetworkClient, tracked: Vec<Cid>, shutdown: CancellationToken) {
    let mut tick = interval_at(Instant::now() + PROVIDE_WARMUP, PROVIDE_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    #[expect(clippy::redundant_pub_crate, reason = "Needed for Tokio code")]
    loop {
        select! {
            () = shutdown.cancelled() => break,
            _ = tick.tick() => {}
        }

        for cid in &tracked {
            if shutdown.is_cancelled() {
                return;
            }

            match timeout(PROVIDE_TIMEOUT, client.provide(*cid)).await {
                Ok(Ok(())) => debug!(%cid, "Announced provider record"),
                Ok(Err(err)) => warn!(%cid, %err, "Failed to announce provider record"),
                Err(_elapsed) => warn!(%cid, "Provider announcement timed out"),
            }
        }
    }
}

async fn discover_loop(client: NetworkClient, representative: Cid, shutdown: CancellationToken) {
    let mut tick = interval(DISCOVER_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    #[expect(clippy::redundant_pub_crate, reason = "Needed for Tokio code")]
    loop {
        select! {
            () = shutdown.cancelled() => break,
            _ = tick.tick() => {}
        }

        let records = match timeout(
            FIND_PROVIDERS_TIMEOUT,
            client.find_providers(representative),
        )
        .await
        {
            Ok(Ok(records)) => records,
            Ok(Err(err)) => {
                warn!(%err, "Provider lookup failed");
                continue;
            }
            Err(_elapsed) => {
                debug!(cid = %representative, "Provider lookup timed out");
                continue;
            }
        };

        let local_peer = client.local_peer_id();
        let connected: HashSet<_> = client.connected_peers().await.into_iter().collect();

        for record in plan_provider_dials(&local_peer, &connected, records) {
            for addr in &record.addrs {
                client.add_peer_addr(record.peer_id, addr.clone()).await;
            }

            match client.dial_peer(record.peer_id).await {
                Ok(()) => debug!(peer_id = %record.peer_id, "Dialed discovered provider"),
                Err(DialFailure::SelfDial) => {}
                // expected under NAT and churn; the next cycle retries
                Err(err) => warn!(peer_id = %record.peer_id, %err, "Failed to dial provider"),
            }
        }
    }
}

async fn direct_dial_loop(
    client: NetworkClient,
    targets: Vec<Multiaddr>,
    shutdown: CancellationToken,
) {
    let mut tick = interval(DIRECT_DIAL_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    #[expect(clippy::redundant_pub_crate, reason = "Needed for Tokio code")]
    loop {
        select! {
            () = shutdown.cancelled() => break,
            _ = tick.tick() => {}
        }

        let connected_hosts: HashSet<_> = client
            .connected_addrs()
            .await
            .iter()
            .filter_map(|(_peer_id, addr)| host_of(addr))
            .collect();

        for target in &targets {
            let Some(host) = host_of(target) else {
                continue;
            };

            if connected_hosts.contains(&host) {
                debug!(%target, "Already connected to dial target");
                continue;
            }

            match client.dial(target.clone()).await {
                Ok(()) => debug!(%target, "Dialed static target"),
                Err(DialFailure::SelfDial) => {}
                Err(err) => warn!(%target, %err, "Failed to dial static target"),
            }
        }
    }
}

/// The dial candidates among a cycle's provider records: never ourselves,
/// never a peer that is already connected.
fn plan_provider_dials(
    local_peer: &PeerId,
    connected: &HashSet<PeerId>,
    records: Vec<ProviderRecord>,
) -> Vec<ProviderRecord> {
    records
        .into_iter()
        .filter(|record| record.peer_id != *local_peer && !connected.contains(&record.peer_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(peer_id: PeerId) -> ProviderRecord {
        ProviderRecord {
            peer_id,
            addrs: vec!["/ip4/10.0.0.7/tcp/7353".parse().unwrap()],
        }
    }

    #[test]
    fn test_each_side_plans_exactly_one_dial() {
        // both stations provide the same identifier; each sees itself and
        // the other in the provider set
        let station_a = PeerId::random();
        let station_b = PeerId::random();

        let records = vec![record(station_a), record(station_b)];

        let planned = plan_provider_dials(&station_a, &HashSet::new(), records.clone());
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].peer_id, station_b);

        let planned = plan_provider_dials(&station_b, &HashSet::new(), records);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].peer_id, station_a);
    }

    #[test]
    fn test_connected_providers_are_never_redialed() {
        let local = PeerId::random();
        let connected_peer = PeerId::random();
        let fresh_peer = PeerId::random();

        let connected: HashSet<_> = [connected_peer].into_iter().collect();
        let records = vec![record(connected_peer), record(fresh_peer)];

        let planned = plan_provider_dials(&local, &connected, records);

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].peer_id, fresh_peer);
    }

    #[test]
    fn test_empty_provider_set_plans_nothing() {
        let local = PeerId::random();

        assert!(plan_provider_dials(&local, &HashSet::new(), Vec::new()).is_empty());
    }
}
