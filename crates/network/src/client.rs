use eyre::{eyre, Result as EyreResult};
use libp2p::{Multiaddr, PeerId};
use station_primitives::Cid;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::commands::Command;
use crate::types::{DialFailure, ProviderRecord};

/// Command-channel handle onto the network event loop.
///
/// Cheap to clone; the event loop runs for as long as any clone is alive.
#[derive(Clone, Debug)]
pub struct NetworkClient {
    local_peer_id: PeerId,
    sender: mpsc::Sender<Command>,
}

impl NetworkClient {
    pub(crate) const fn new(local_peer_id: PeerId, sender: mpsc::Sender<Command>) -> Self {
        Self {
            local_peer_id,
            sender,
        }
    }

    #[must_use]
    pub const fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    async fn send(&self, command: Command) -> EyreResult<()> {
        self.sender
            .send(command)
            .await
            .map_err(|_err| eyre!("network event loop stopped"))
    }

    pub async fn listen_on(&self, addr: Multiaddr) -> EyreResult<()> {
        let (sender, receiver) = oneshot::channel();

        self.send(Command::ListenOn { addr, sender }).await?;

        receiver
            .await
            .map_err(|_err| eyre!("network event loop stopped"))?
    }

    pub async fn dial(&self, addr: Multiaddr) -> Result<(), DialFailure> {
        let (sender, receiver) = oneshot::channel();

        self.send(Command::Dial { addr, sender })
            .await
            .map_err(|err| DialFailure::Failed(err.to_string()))?;

        receiver
            .await
            .map_err(|_err| DialFailure::Failed("network event loop stopped".to_owned()))?
    }

    pub async fn dial_peer(&self, peer_id: PeerId) -> Result<(), DialFailure> {
        let (sender, receiver) = oneshot::channel();

        self.send(Command::DialPeer { peer_id, sender })
            .await
            .map_err(|err| DialFailure::Failed(err.to_string()))?;

        receiver
            .await
            .map_err(|_err| DialFailure::Failed("network event loop stopped".to_owned()))?
    }

    /// Announces a tracked identifier to the routing fabric. Resolves when
    /// the provide query completes; callers bound it with a timeout.
    pub async fn provide(&self, cid: Cid) -> EyreResult<()> {
        let (sender, receiver) = oneshot::channel();

        self.send(Command::Provide { cid, sender }).await?;

        receiver
            .await
            .map_err(|_err| eyre!("network event loop stopped"))?
    }

    /// Queries the routing fabric for providers of `cid`. Resolves with the
    /// first batch of provider records; callers bound it with a timeout.
    pub async fn find_providers(&self, cid: Cid) -> EyreResult<Vec<ProviderRecord>> {
        let (sender, receiver) = oneshot::channel();

        self.send(Command::FindProviders { cid, sender }).await?;

        receiver
            .await
            .map_err(|_err| eyre!("network event loop stopped"))
    }

    /// Merges an advertised address into the mesh address book.
    pub async fn add_peer_addr(&self, peer_id: PeerId, addr: Multiaddr) {
        if let Err(err) = self.send(Command::AddPeerAddr { peer_id, addr }).await {
            debug!(%err, "Dropping address book update");
        }
    }

    pub async fn peer_count(&self) -> usize {
        let (sender, receiver) = oneshot::channel();

        if self.send(Command::PeerCount { sender }).await.is_err() {
            return 0;
        }

        receiver.await.unwrap_or(0)
    }

    pub async fn connected_peers(&self) -> Vec<PeerId> {
        let (sender, receiver) = oneshot::channel();

        if self.send(Command::ConnectedPeers { sender }).await.is_err() {
            return Vec::new();
        }

        receiver.await.unwrap_or_default()
    }

    /// Remote addresses of currently established connections.
    pub async fn connected_addrs(&self) -> Vec<(PeerId, Multiaddr)> {
        let (sender, receiver) = oneshot::channel();

        if self.send(Command::ConnectedAddrs { sender }).await.is_err() {
            return Vec::new();
        }

        receiver.await.unwrap_or_default()
    }
}
