use std::collections::hash_map::HashMap;

use eyre::{bail, Result as EyreResult};
use futures_util::StreamExt;
use libp2p::identify::{Behaviour as IdentifyBehaviour, Config as IdentifyConfig};
use libp2p::kad::store::MemoryStore;
use libp2p::kad::{Behaviour as KadBehaviour, Config as KadConfig, Mode, QueryId};
use libp2p::mdns::tokio::Behaviour as MdnsTokioBehaviour;
use libp2p::mdns::Config as MdnsConfig;
use libp2p::noise::Config as NoiseConfig;
use libp2p::ping::Behaviour as PingBehaviour;
use libp2p::swarm::behaviour::toggle::Toggle;
use libp2p::swarm::{ConnectionId, NetworkBehaviour, Swarm};
use libp2p::tcp::Config as TcpConfig;
use libp2p::tls::Config as TlsConfig;
use libp2p::yamux::Config as YamuxConfig;
use libp2p::{Multiaddr, PeerId, StreamProtocol, SwarmBuilder};
use multiaddr::Protocol;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;
use tokio::{select, spawn};
use tracing::warn;

pub mod addr;
pub mod client;
mod commands;
pub mod config;
mod events;
pub mod mesh;
mod state;
pub mod types;

use client::NetworkClient;
use commands::Command;
use config::NetworkConfig;
use state::MeshState;
use types::{DialFailure, NetworkEvent, ProviderRecord};

const PROTOCOL_VERSION: &str = concat!("/", env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const STATION_KAD_PROTO_NAME: StreamProtocol = StreamProtocol::new("/station/kad/1.0.0");

#[derive(NetworkBehaviour)]
struct Behaviour {
    identify: IdentifyBehaviour,
    kad: KadBehaviour<MemoryStore>,
    mdns: Toggle<MdnsTokioBehaviour>,
    ping: PingBehaviour,
}

/// Starts the swarm and its event loop; returns the command handle and the
/// connection/discovery event stream.
pub async fn run(
    config: &NetworkConfig,
) -> EyreResult<(NetworkClient, mpsc::Receiver<NetworkEvent>)> {
    let peer_id = config.identity.public().to_peer_id();

    let (client, event_receiver, event_loop) = init(peer_id, config)?;

    drop(spawn(event_loop.run()));

    for addr in &config.swarm.listen {
        client.listen_on(addr.clone()).await?;
    }

    Ok((client, event_receiver))
}

fn init(
    peer_id: PeerId,
    config: &NetworkConfig,
) -> EyreResult<(NetworkClient, mpsc::Receiver<NetworkEvent>, EventLoop)> {
    let bootstrap_peers = {
        let mut peers = vec![];

        for mut addr in config.bootstrap.nodes.list.iter().cloned() {
            let Some(Protocol::P2p(peer_id)) = addr.pop() else {
                bail!("Failed to parse peer id from addr {:?}", addr);
            };

            peers.push((peer_id, addr));
        }

        peers
    };

    let swarm = SwarmBuilder::with_existing_identity(config.identity.clone())
        .with_tokio()
        .with_tcp(
            TcpConfig::default(),
            (TlsConfig::new, NoiseConfig::new),
            YamuxConfig::default,
        )?
        .with_quic()
        .with_behaviour(|key| Behaviour {
            identify: IdentifyBehaviour::new(
                IdentifyConfig::new(PROTOCOL_VERSION.to_owned(), key.public())
                    .with_push_listen_addr_updates(true),
            ),
            kad: {
                let kad_config = KadConfig::new(STATION_KAD_PROTO_NAME);

                let mut kad =
                    KadBehaviour::with_config(peer_id, MemoryStore::new(peer_id), kad_config);

                kad.set_mode(Some(Mode::Server));

                for (peer_id, addr) in bootstrap_peers {
                    let _ = kad.add_address(&peer_id, addr);
                }
                if let Err(err) = kad.bootstrap() {
                    warn!(%err, "Failed to bootstrap Kademlia");
                }

                kad
            },
            mdns: config
                .discovery
                .mdns
                .then_some(())
                .and_then(|()| MdnsTokioBehaviour::new(MdnsConfig::default(), peer_id).ok())
                .into(),
            ping: PingBehaviour::default(),
        })?
        .with_swarm_config(|cfg| cfg.with_idle_connection_timeout(Duration::from_secs(30)))
        .build();

    let (command_sender, command_receiver) = mpsc::channel(32);
    let (event_sender, event_receiver) = mpsc::channel(32);

    let client = NetworkClient::new(peer_id, command_sender);

    let event_loop = EventLoop::new(swarm, command_receiver, event_sender);

    Ok((client, event_receiver, event_loop))
}

pub(crate) struct EventLoop {
    swarm: Box<Swarm<Behaviour>>,
    command_receiver: mpsc::Receiver<Command>,
    event_sender: mpsc::Sender<NetworkEvent>,
    mesh: MeshState,
    connected: HashMap<PeerId, Multiaddr>,
    pending_dial: HashMap<ConnectionId, oneshot::Sender<Result<(), DialFailure>>>,
    pending_provide: HashMap<QueryId, oneshot::Sender<EyreResult<()>>>,
    pending_providers: HashMap<QueryId, oneshot::Sender<Vec<ProviderRecord>>>,
}

impl EventLoop {
    fn new(
        swarm: Swarm<Behaviour>,
        command_receiver: mpsc::Receiver<Command>,
        event_sender: mpsc::Sender<NetworkEvent>,
    ) -> Self {
        Self {
            swarm: Box::new(swarm),
            command_receiver,
            event_sender,
            mesh: MeshState::default(),
            connected: HashMap::default(),
            pending_dial: HashMap::default(),
            pending_provide: HashMap::default(),
            pending_providers: HashMap::default(),
        }
    }

    /// Runs until every command handle is dropped.
    pub(crate) async fn run(mut self) {
        #[expect(clippy::redundant_pub_crate, reason = "Needed for Tokio code")]
        loop {
            select! {
                event = self.swarm.next() => {
                    self.handle_swarm_event(event.expect("Swarm stream to be infinite.")).await;
                },
                command = self.command_receiver.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command);
                }
            }
        }
    }
}
