use libp2p::swarm::dial_opts::DialOpts;
use libp2p::swarm::{DialError, SwarmEvent};
use libp2p::PeerId;
use tracing::{debug, info, warn};

use crate::state::PeerState;
use crate::types::NetworkEvent;
use crate::{BehaviourEvent, EventLoop};

mod identify;
mod kad;
mod mdns;
mod ping;

pub(crate) trait EventHandler<E> {
    async fn handle(&mut self, event: E);
}

impl EventLoop {
    pub(crate) async fn handle_swarm_event(&mut self, event: SwarmEvent<BehaviourEvent>) {
        match event {
            SwarmEvent::Behaviour(BehaviourEvent::Identify(event)) => self.handle(event).await,
            SwarmEvent::Behaviour(BehaviourEvent::Kad(event)) => self.handle(event).await,
            SwarmEvent::Behaviour(BehaviourEvent::Mdns(event)) => self.handle(event).await,
            SwarmEvent::Behaviour(BehaviourEvent::Ping(event)) => self.handle(event).await,
            SwarmEvent::NewListenAddr { address, .. } => {
                info!("Listening on {}", address);

                self.emit(NetworkEvent::ListeningOn { address }).await;
            }
            SwarmEvent::ConnectionEstablished {
                peer_id,
                connection_id,
                endpoint,
                num_established,
                ..
            } => {
                if let Some(sender) = self.pending_dial.remove(&connection_id) {
                    let _ = sender.send(Ok(()));
                }

                let remote = endpoint.get_remote_address().clone();

                self.mesh.add_peer_addr(peer_id, &remote);
                let _ = self.connected.insert(peer_id, remote);

                if num_established.get() == 1 {
                    self.mesh.transition(peer_id, PeerState::Connected);
                    self.emit(NetworkEvent::PeerConnected { peer_id }).await;
                }
            }
            SwarmEvent::ConnectionClosed {
                peer_id,
                num_established,
                ..
            } => {
                if num_established == 0 {
                    let _ = self.connected.remove(&peer_id);

                    self.mesh.transition(peer_id, PeerState::Disconnected);
                    self.emit(NetworkEvent::PeerDisconnected { peer_id }).await;
                }
            }
            SwarmEvent::OutgoingConnectionError {
                connection_id,
                peer_id,
                error,
                ..
            } => {
                if let Some(sender) = self.pending_dial.remove(&connection_id) {
                    let _ = sender.send(Err(self.classify_dial_error(&error)));
                } else {
                    debug!(?peer_id, %error, "Outgoing connection failed");
                }

                if let Some(peer_id) = peer_id {
                    if !self.swarm.is_connected(&peer_id) {
                        self.mesh.transition(peer_id, PeerState::Disconnected);
                    }
                }
            }
            _ => {}
        }
    }

    /// Every discovery source funnels through here: record the signal and,
    /// when the peer is not already connected, dial it immediately rather
    /// than waiting on any automatic connection logic.
    pub(crate) async fn on_peer_discovered(&mut self, peer_id: PeerId) {
        if peer_id == *self.swarm.local_peer_id() {
            return;
        }

        debug!(%peer_id, known = self.mesh.known_peers(), "Discovery signal");

        self.emit(NetworkEvent::PeerDiscovered { peer_id }).await;

        if self.swarm.is_connected(&peer_id) || self.mesh.is_connected(&peer_id) {
            return;
        }

        let opts = DialOpts::peer_id(peer_id)
            .addresses(self.mesh.addrs_of(&peer_id))
            .extend_addresses_through_behaviour()
            .build();

        self.mesh.transition(peer_id, PeerState::Dialing);

        if let Err(err) = self.swarm.dial(opts) {
            match err {
                DialError::DialPeerConditionFalse(_) | DialError::LocalPeerId { .. } => {}
                err => warn!(%peer_id, %err, "Failed to dial discovered peer"),
            }
        }
    }

    pub(crate) async fn emit(&mut self, event: NetworkEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            debug!(%err, "Dropping network event, receiver went away");
        }
    }
}
