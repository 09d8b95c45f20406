use std::fs::{read_to_string, write};

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result as EyreResult, WrapErr};
use libp2p_identity::Keypair;
use serde::{Deserialize, Serialize};
use station_network::config::{BootstrapConfig, DiscoveryConfig, MeshConfig, SwarmConfig};
use station_store::StoreConfig;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ConfigFile {
    #[serde(with = "serde_identity", default = "Keypair::generate_ed25519")]
    pub identity: Keypair,

    #[serde(default)]
    pub swarm: SwarmConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub mesh: MeshConfig,

    pub blobstore: StoreConfig,

    /// Archive bundles dropped here are ingested at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging: Option<Utf8PathBuf>,

    /// Replicated document stores, in order; the first one is the
    /// representative for discovery lookups.
    #[serde(default = "default_replicas")]
    pub replicas: Vec<String>,
}

impl ConfigFile {
    #[must_use]
    pub fn new(identity: Keypair, swarm: SwarmConfig, blobstore: StoreConfig) -> Self {
        Self {
            identity,
            swarm,
            bootstrap: BootstrapConfig::default(),
            discovery: DiscoveryConfig::default(),
            mesh: MeshConfig::default(),
            blobstore,
            staging: None,
            replicas: default_replicas(),
        }
    }

    #[must_use]
    pub fn exists(dir: &Utf8Path) -> bool {
        dir.join(CONFIG_FILE).is_file()
    }

    pub fn load(dir: &Utf8Path) -> EyreResult<Self> {
        let path = dir.join(CONFIG_FILE);
        let content = read_to_string(&path)
            .wrap_err_with(|| format!("failed to read configuration from {path:?}"))?;

        toml::from_str(&content).map_err(Into::into)
    }

    pub fn save(&self, dir: &Utf8Path) -> EyreResult<()> {
        let path = dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)?;

        write(&path, content)
            .wrap_err_with(|| format!("failed to write configuration to {path:?}"))?;

        Ok(())
    }
}

fn default_replicas() -> Vec<String> {
    ["nodes", "trust", "attestations"]
        .iter()
        .map(|name| (*name).to_owned())
        .collect()
}

pub mod serde_identity {
    use core::fmt::{self, Formatter};

    use libp2p_identity::Keypair;
    use serde::de::{self, MapAccess};
    use serde::ser::{self, SerializeMap};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(key: &Keypair, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut keypair = serializer.serialize_map(Some(2))?;
        keypair.serialize_entry("peer_id", &key.public().to_peer_id().to_base58())?;
        keypair.serialize_entry(
            "keypair",
            &bs58::encode(&key.to_protobuf_encoding().map_err(ser::Error::custom)?).into_string(),
        )?;
        keypair.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Keypair, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdentityVisitor;

        impl<'de> de::Visitor<'de> for IdentityVisitor {
            type Value = Keypair;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("an identity")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut peer_id = None::<String>;
                let mut priv_key = None::<String>;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "peer_id" => peer_id = Some(map.next_value()?),
                        "keypair" => priv_key = Some(map.next_value()?),
                        _ => {}
                    }
                }

                let _peer_id = peer_id.ok_or_else(|| de::Error::missing_field("peer_id"))?;
                let priv_key = priv_key.ok_or_else(|| de::Error::missing_field("keypair"))?;

                let decoded_priv_key =
                    bs58::decode(&priv_key).into_vec().map_err(de::Error::custom)?;

                Keypair::from_protobuf_encoding(&decoded_priv_key).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_map(IdentityVisitor)
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_config_round_trip() {
        let tmp = TempDir::new("station-config").unwrap();
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();

        assert!(!ConfigFile::exists(&dir));

        let config = ConfigFile::new(
            Keypair::generate_ed25519(),
            SwarmConfig::for_port(7353),
            StoreConfig::new("data/blobs".into()),
        );

        config.save(&dir).unwrap();
        assert!(ConfigFile::exists(&dir));

        let loaded = ConfigFile::load(&dir).unwrap();

        assert_eq!(
            loaded.identity.public().to_peer_id(),
            config.identity.public().to_peer_id()
        );
        assert_eq!(loaded.blobstore.path, config.blobstore.path);
        assert_eq!(loaded.swarm.port, 7353);
        assert_eq!(loaded.replicas, vec!["nodes", "trust", "attestations"]);
        assert!(loaded.discovery.mdns);
    }

    #[test]
    fn test_load_rejects_missing_file() {
        let tmp = TempDir::new("station-config").unwrap();
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_owned()).unwrap();

        assert!(ConfigFile::load(&dir).is_err());
    }
}
