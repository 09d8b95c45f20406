#[cfg(test)]
#[path = "tests/state.rs"]
mod tests;

use std::collections::{BTreeMap, BTreeSet};

use libp2p::{Multiaddr, PeerId};
use tracing::debug;

/// The mesh address book.
///
/// One entry per peer ever observed through any discovery source. Entries
/// are never removed; a peer that goes away merely transitions to
/// `Disconnected` and keeps its addresses for the next dial cycle.
#[derive(Debug, Default)]
pub(crate) struct MeshState {
    peers: BTreeMap<PeerId, PeerHandle>,
}

impl MeshState {
    pub(crate) fn add_peer_addr(&mut self, peer_id: PeerId, addr: &Multiaddr) {
        let _ = self
            .peers
            .entry(peer_id)
            .or_default()
            .addrs
            .insert(addr.clone());
    }

    pub(crate) fn addrs_of(&self, peer_id: &PeerId) -> Vec<Multiaddr> {
        self.peers
            .get(peer_id)
            .map(|info| info.addrs.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn state_of(&self, peer_id: &PeerId) -> Option<PeerState> {
        self.peers.get(peer_id).map(|info| info.state)
    }

    pub(crate) fn is_connected(&self, peer_id: &PeerId) -> bool {
        self.state_of(peer_id) == Some(PeerState::Connected)
    }

    pub(crate) fn transition(&mut self, peer_id: PeerId, state: PeerState) {
        let info = self.peers.entry(peer_id).or_default();

        if info.state == state {
            return;
        }

        debug!(%peer_id, from = ?info.state, to = ?state, "Peer state transition");

        info.state = state;
    }

    pub(crate) fn known_peers(&self) -> usize {
        self.peers.len()
    }
}

#[derive(Debug, Default)]
pub(crate) struct PeerHandle {
    addrs: BTreeSet<Multiaddr>,
    state: PeerState,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) enum PeerState {
    #[default]
    Discovered,
    Dialing,
    Connected,
    Disconnected,
}
