use eyre::{eyre, Result as EyreResult};
use libp2p::kad::RecordKey;
use libp2p::swarm::dial_opts::DialOpts;
use libp2p::swarm::DialError;
use libp2p::{Multiaddr, PeerId};
use station_primitives::Cid;
use tokio::sync::oneshot;

use crate::state::PeerState;
use crate::types::{DialFailure, ProviderRecord};
use crate::EventLoop;

#[derive(Debug)]
pub(crate) enum Command {
    ListenOn {
        addr: Multiaddr,
        sender: oneshot::Sender<EyreResult<()>>,
    },
    Dial {
        addr: Multiaddr,
        sender: oneshot::Sender<Result<(), DialFailure>>,
    },
    DialPeer {
        peer_id: PeerId,
        sender: oneshot::Sender<Result<(), DialFailure>>,
    },
    Provide {
        cid: Cid,
        sender: oneshot::Sender<EyreResult<()>>,
    },
    FindProviders {
        cid: Cid,
        sender: oneshot::Sender<Vec<ProviderRecord>>,
    },
    AddPeerAddr {
        peer_id: PeerId,
        addr: Multiaddr,
    },
    PeerCount {
        sender: oneshot::Sender<usize>,
    },
    ConnectedPeers {
        sender: oneshot::Sender<Vec<PeerId>>,
    },
    ConnectedAddrs {
        sender: oneshot::Sender<Vec<(PeerId, Multiaddr)>>,
    },
}

impl EventLoop {
    pub(crate) fn handle_command(&mut self, command: Command) {
        match command {
            Command::ListenOn { addr, sender } => {
                let result = self
                    .swarm
                    .listen_on(addr)
                    .map(|_listener_id| ())
                    .map_err(|err| eyre!(err));

                let _ = sender.send(result);
            }
            Command::Dial { addr, sender } => {
                self.dial(DialOpts::from(addr), sender);
            }
            Command::DialPeer { peer_id, sender } => {
                if self.swarm.is_connected(&peer_id) {
                    let _ = sender.send(Ok(()));
                    return;
                }

                let opts = DialOpts::peer_id(peer_id)
                    .addresses(self.mesh.addrs_of(&peer_id))
                    .extend_addresses_through_behaviour()
                    .build();

                self.dial(opts, sender);
            }
            Command::Provide { cid, sender } => {
                match self
                    .swarm
                    .behaviour_mut()
                    .kad
                    .start_providing(RecordKey::new(&*cid))
                {
                    Ok(query_id) => {
                        let _ = self.pending_provide.insert(query_id, sender);
                    }
                    Err(err) => {
                        let _ = sender.send(Err(eyre!(err)));
                    }
                }
            }
            Command::FindProviders { cid, sender } => {
                let query_id = self
                    .swarm
                    .behaviour_mut()
                    .kad
                    .get_providers(RecordKey::new(&*cid));

                let _ = self.pending_providers.insert(query_id, sender);
            }
            Command::AddPeerAddr { peer_id, addr } => {
                self.mesh.add_peer_addr(peer_id, &addr);
                let _ = self.swarm.behaviour_mut().kad.add_address(&peer_id, addr);
            }
            Command::PeerCount { sender } => {
                let _ = sender.send(self.swarm.connected_peers().count());
            }
            Command::ConnectedPeers { sender } => {
                let _ = sender.send(self.swarm.connected_peers().copied().collect());
            }
            Command::ConnectedAddrs { sender } => {
                let addrs = self
                    .connected
                    .iter()
                    .map(|(peer_id, addr)| (*peer_id, addr.clone()))
                    .collect();

                let _ = sender.send(addrs);
            }
        }
    }

    fn dial(&mut self, opts: DialOpts, sender: oneshot::Sender<Result<(), DialFailure>>) {
        let connection_id = opts.connection_id();

        if let Some(peer_id) = opts.get_peer_id() {
            self.mesh.transition(peer_id, PeerState::Dialing);
        }

        match self.swarm.dial(opts) {
            Ok(()) => {
                let _ = self.pending_dial.insert(connection_id, sender);
            }
            Err(DialError::DialPeerConditionFalse(_)) => {
                // a dial is already in flight; its outcome covers this one
                let _ = sender.send(Ok(()));
            }
            Err(err) => {
                let _ = sender.send(Err(self.classify_dial_error(&err)));
            }
        }
    }

    /// A dial that bounced off our own identity is expected whenever the
    /// same static target list is shared across stations.
    pub(crate) fn classify_dial_error(&self, err: &DialError) -> DialFailure {
        match err {
            DialError::LocalPeerId { .. } => DialFailure::SelfDial,
            DialError::WrongPeerId { obtained, .. }
                if obtained == self.swarm.local_peer_id() =>
            {
                DialFailure::SelfDial
            }
            err => DialFailure::Failed(err.to_string()),
        }
    }
}
