use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use eyre::{bail, Result as EyreResult};
use station_config::ConfigFile;
use station_network::config::NetworkConfig;
use station_node::{start, NodeConfig};
use station_store::StoreConfig;

use crate::cli::RootArgs;

/// Run a station
#[derive(Debug, Parser)]
pub struct RunCommand;

impl RunCommand {
    pub async fn run(self, root_args: RootArgs) -> EyreResult<()> {
        let home = root_args.home;

        if !ConfigFile::exists(&home) {
            bail!("Station is not initialized in {:?}", home);
        }

        let config = ConfigFile::load(&home)?;

        let network = NetworkConfig {
            identity: config.identity,
            swarm: config.swarm,
            bootstrap: config.bootstrap,
            discovery: config.discovery,
            mesh: config.mesh,
        };

        start(NodeConfig {
            home: home.clone(),
            network,
            blobstore: StoreConfig::new(resolve(&home, config.blobstore.path)),
            staging: config.staging.map(|path| resolve(&home, path)),
            replicas: config.replicas,
        })
        .await
    }
}

/// Relative config paths are anchored at the station's home directory.
fn resolve(home: &Utf8Path, path: Utf8PathBuf) -> Utf8PathBuf {
    if path.is_relative() {
        home.join(path)
    } else {
        path
    }
}
