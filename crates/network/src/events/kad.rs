use eyre::eyre;
use libp2p::kad;
use tracing::{debug, warn};

use super::{EventHandler, EventLoop};
use crate::types::ProviderRecord;

impl EventHandler<kad::Event> for EventLoop {
    async fn handle(&mut self, event: kad::Event) {
        debug!("kad: {:?}", event);

        match event {
            kad::Event::OutboundQueryProgressed {
                id,
                result: kad::QueryResult::StartProviding(result),
                ..
            } => {
                if let Some(sender) = self.pending_provide.remove(&id) {
                    let _ = sender.send(result.map(|_ok| ()).map_err(|err| eyre!(err)));
                }
            }
            kad::Event::OutboundQueryProgressed {
                id,
                result:
                    kad::QueryResult::GetProviders(Ok(kad::GetProvidersOk::FoundProviders {
                        providers,
                        ..
                    })),
                ..
            } => {
                if let Some(sender) = self.pending_providers.remove(&id) {
                    let records = providers
                        .into_iter()
                        .map(|peer_id| ProviderRecord {
                            peer_id,
                            addrs: self.mesh.addrs_of(&peer_id),
                        })
                        .collect();

                    let _ = sender.send(records);

                    if let Some(mut query) = self.swarm.behaviour_mut().kad.query_mut(&id) {
                        query.finish();
                    }
                }
            }
            kad::Event::OutboundQueryProgressed {
                id,
                result:
                    kad::QueryResult::GetProviders(Ok(
                        kad::GetProvidersOk::FinishedWithNoAdditionalRecord { .. },
                    )),
                ..
            } => {
                if let Some(sender) = self.pending_providers.remove(&id) {
                    let _ = sender.send(Vec::new());
                }
            }
            kad::Event::OutboundQueryProgressed {
                id,
                result: kad::QueryResult::GetProviders(Err(err)),
                ..
            } => {
                if let Some(sender) = self.pending_providers.remove(&id) {
                    warn!(%err, "Provider query failed");

                    let _ = sender.send(Vec::new());
                }
            }
            kad::Event::RoutingUpdated {
                peer, addresses, ..
            } => {
                for addr in addresses.iter() {
                    self.mesh.add_peer_addr(peer, addr);
                }

                self.on_peer_discovered(peer).await;
            }
            _ => {}
        }
    }
}
