use libp2p::identify::Event;
use tracing::debug;

use super::{EventHandler, EventLoop};

impl EventHandler<Event> for EventLoop {
    async fn handle(&mut self, event: Event) {
        debug!("identify: {:?}", event);

        if let Event::Received { peer_id, info, .. } = event {
            for addr in info.listen_addrs {
                self.mesh.add_peer_addr(peer_id, &addr);
                let _ = self.swarm.behaviour_mut().kad.add_address(&peer_id, addr);
            }
        }
    }
}
