pub use libp2p::identity::PeerId;
use libp2p::Multiaddr;
use thiserror::Error;

/// Connection lifecycle and discovery signals, fanned out to the sync
/// trigger and diagnostics.
#[derive(Debug)]
pub enum NetworkEvent {
    ListeningOn {
        address: Multiaddr,
    },
    PeerDiscovered {
        peer_id: PeerId,
    },
    PeerConnected {
        peer_id: PeerId,
    },
    PeerDisconnected {
        peer_id: PeerId,
    },
}

/// A routing-fabric entry: this peer serves this content identifier.
#[derive(Clone, Debug)]
pub struct ProviderRecord {
    pub peer_id: PeerId,
    pub addrs: Vec<Multiaddr>,
}

/// Dial outcomes the mesh loops distinguish: dialing ourselves is expected
/// under a shared static config and is suppressed from warning logs.
#[derive(Debug, Error)]
pub enum DialFailure {
    #[error("cannot dial own peer id")]
    SelfDial,

    #[error("{0}")]
    Failed(String),
}
