use std::collections::BTreeSet;

use libp2p::mdns;
use tracing::debug;

use super::{EventHandler, EventLoop};

impl EventHandler<mdns::Event> for EventLoop {
    async fn handle(&mut self, event: mdns::Event) {
        match event {
            mdns::Event::Discovered(peers) => {
                let mut discovered = BTreeSet::new();

                for (peer_id, addr) in peers {
                    debug!("Discovered {} at {}", peer_id, addr);

                    self.mesh.add_peer_addr(peer_id, &addr);
                    let _ = self.swarm.behaviour_mut().kad.add_address(&peer_id, addr);

                    let _ = discovered.insert(peer_id);
                }

                for peer_id in discovered {
                    self.on_peer_discovered(peer_id).await;
                }
            }
            mdns::Event::Expired(peers) => {
                for (peer_id, addr) in peers {
                    debug!("Expired {} at {}", peer_id, addr);

                    let _ = self
                        .swarm
                        .behaviour_mut()
                        .kad
                        .remove_address(&peer_id, &addr);
                }
            }
        }
    }
}
