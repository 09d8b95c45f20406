use std::fs::create_dir_all;

use clap::Parser;
use eyre::{bail, Result as EyreResult};
use libp2p_identity::Keypair;
use station_config::ConfigFile;
use station_network::config::{SwarmConfig, DEFAULT_PORT};
use station_store::StoreConfig;
use tracing::info;

use crate::cli::RootArgs;

/// Initialize a new station
#[derive(Debug, Parser)]
pub struct InitCommand {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Overwrite an existing configuration
    #[arg(short, long)]
    pub force: bool,
}

impl InitCommand {
    pub fn run(self, root_args: &RootArgs) -> EyreResult<()> {
        let home = &root_args.home;

        create_dir_all(home)?;

        if ConfigFile::exists(home) && !self.force {
            bail!(
                "Station is already initialized in {:?}, use --force to overwrite",
                home
            );
        }

        let identity = Keypair::generate_ed25519();

        info!("Peer ID: {}", identity.public().to_peer_id());

        let config = ConfigFile::new(
            identity,
            SwarmConfig::for_port(self.port),
            StoreConfig::new("blobs".into()),
        );

        config.save(home)?;

        create_dir_all(home.join(&config.blobstore.path))?;

        info!("Initialized station in {:?}", home);

        Ok(())
    }
}
