use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use eyre::Result as EyreResult;
use multiaddr::Multiaddr;
use station_archive::{IngestReport, RootFile, TreeEntry, TreeManager};
use station_network::addr::parse_peer_target;
use station_network::client::NetworkClient;
use station_network::config::NetworkConfig;
use station_network::mesh::MeshManager;
use station_network::types::NetworkEvent;
use station_primitives::Cid;
use station_store::{FileSystemDb, ObjectStore, StoreConfig};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::replica::ReplicaSet;
use crate::sync::SyncTrigger;

#[derive(Debug)]
pub struct NodeConfig {
    pub home: Utf8PathBuf,
    pub network: NetworkConfig,
    pub blobstore: StoreConfig,
    pub staging: Option<Utf8PathBuf>,
    pub replicas: Vec<String>,
}

/// The assembled station: archive tree, replicated stores and the mesh
/// handle, with root-file persistence after every successful mutation.
#[derive(Clone, Debug)]
pub struct Node {
    tree: TreeManager,
    home: Utf8PathBuf,
    replicas: ReplicaSet,
    client: NetworkClient,
}

impl Node {
    #[must_use]
    pub const fn tree(&self) -> &TreeManager {
        &self.tree
    }

    #[must_use]
    pub const fn client(&self) -> &NetworkClient {
        &self.client
    }

    #[must_use]
    pub const fn replicas(&self) -> &ReplicaSet {
        &self.replicas
    }

    pub async fn insert(&self, path: &str, content: &[u8]) -> EyreResult<Cid> {
        let root = self.tree.insert(path, content).await?;

        RootFile::save(&self.home, root)?;

        Ok(root)
    }

    pub async fn remove(&self, path: &str) -> EyreResult<Cid> {
        let root = self.tree.remove(path).await?;

        RootFile::save(&self.home, root)?;

        Ok(root)
    }

    pub async fn list(&self, path: &str) -> EyreResult<Vec<TreeEntry>> {
        Ok(self.tree.list(path).await?)
    }

    pub async fn ingest(&self, area: &Utf8Path) -> EyreResult<IngestReport> {
        let report = self.tree.ingest_from_staging(area).await?;

        RootFile::save(&self.home, report.root)?;

        Ok(report)
    }
}

/// Brings the station up and runs it until ctrl-c.
pub async fn start(config: NodeConfig) -> EyreResult<()> {
    let peer_id = config.network.identity.public().to_peer_id();

    info!("Peer ID: {}", peer_id);

    let store = ObjectStore::new(Arc::new(FileSystemDb::new(&config.blobstore.path)?));
    let tree = TreeManager::new(store);

    if let Some(root) = RootFile::load(&config.home) {
        info!(%root, "Restored archive root");

        tree.set_root(root).await;
    }

    let replicas = ReplicaSet::new(&config.replicas);

    let (client, events) = station_network::run(&config.network).await?;

    let shutdown = CancellationToken::new();

    let direct_dial = resolve_direct_dial(
        &config.network.mesh.direct_dial,
        config.network.swarm.port,
    );

    let mesh = MeshManager::start(
        client.clone(),
        replicas.tracked_cids(),
        direct_dial,
        shutdown.clone(),
    );

    let connected = Arc::new(AtomicUsize::new(0));
    let (connection_sender, connection_receiver) = mpsc::channel(32);

    let trigger = SyncTrigger::new(peer_id.to_string(), replicas.clone(), Arc::clone(&connected));
    let sync_task = spawn(trigger.run(connection_receiver, shutdown.clone()));

    let events_task = spawn(fan_out_events(events, connection_sender, connected));

    let node = Node {
        tree,
        home: config.home.clone(),
        replicas,
        client,
    };

    if let Some(staging) = &config.staging {
        if staging.is_dir() {
            match node.ingest(staging).await {
                Ok(report) => {
                    info!(files = report.files.len(), root = %report.root, "Ingested staging area");
                }
                Err(err) => warn!(%err, "Staging ingestion failed"),
            }
        }
    }

    tokio::signal::ctrl_c().await?;

    info!("Shutting down");

    shutdown.cancel();
    mesh.stopped().await;

    if let Err(err) = sync_task.await {
        warn!(%err, "Sync trigger did not shut down cleanly");
    }

    drop(node);
    events_task.abort();

    Ok(())
}

fn resolve_direct_dial(targets: &[String], default_port: u16) -> Vec<Multiaddr> {
    targets
        .iter()
        .filter_map(|target| match parse_peer_target(target, default_port) {
            Ok(addr) => Some(addr),
            Err(err) => {
                warn!(%target, %err, "Ignoring unparseable direct-dial target");
                None
            }
        })
        .collect()
}

/// Fans connection lifecycle events out to the sync trigger and the log.
async fn fan_out_events(
    mut events: mpsc::Receiver<NetworkEvent>,
    connections: mpsc::Sender<String>,
    connected: Arc<AtomicUsize>,
) {
    while let Some(event) = events.recv().await {
        match event {
            NetworkEvent::ListeningOn { address } => info!("Listening on {}", address),
            NetworkEvent::PeerDiscovered { peer_id } => debug!(%peer_id, "Peer discovered"),
            NetworkEvent::PeerConnected { peer_id } => {
                let _count = connected.fetch_add(1, Ordering::Relaxed);

                info!(%peer_id, "Peer connected");

                if let Err(err) = connections.send(peer_id.to_string()).await {
                    debug!(%err, "Sync trigger went away");
                }
            }
            NetworkEvent::PeerDisconnected { peer_id } => {
                let _count = connected.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                    Some(n.saturating_sub(1))
                });

                info!(%peer_id, "Peer disconnected");
            }
        }
    }
}
