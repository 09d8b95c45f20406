use std::fmt;

use libp2p::identity;
use multiaddr::Multiaddr;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 7353;

#[derive(Debug)]
pub struct NetworkConfig {
    pub identity: identity::Keypair,

    pub swarm: SwarmConfig,
    pub bootstrap: BootstrapConfig,
    pub discovery: DiscoveryConfig,
    pub mesh: MeshConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SwarmConfig {
    pub listen: Vec<Multiaddr>,

    /// The port assumed for direct-dial targets given without one.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl SwarmConfig {
    #[must_use]
    pub fn for_port(port: u16) -> Self {
        let listen = [
            format!("/ip4/0.0.0.0/tcp/{port}"),
            format!("/ip4/0.0.0.0/udp/{port}/quic-v1"),
        ]
        .iter()
        .filter_map(|addr| addr.parse().ok())
        .collect();

        Self { listen, port }
    }
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self::for_port(DEFAULT_PORT)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub nodes: BootstrapNodes,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BootstrapNodes {
    #[serde(deserialize_with = "deserialize_bootstrap")]
    pub list: Vec<Multiaddr>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Local broadcast (mDNS) discovery.
    #[serde(default = "bool_true")]
    pub mdns: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { mdns: true }
    }
}

/// Operator-configured connectivity the discovery fabric cannot be trusted
/// to find on its own.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Direct-dial targets: full multiaddrs, `host:port`, bare IPs or bare
    /// hostnames (normalized against `swarm.port`).
    #[serde(default)]
    pub direct_dial: Vec<String>,
}

const fn bool_true() -> bool {
    true
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

fn deserialize_bootstrap<'de, D>(deserializer: D) -> Result<Vec<Multiaddr>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct BootstrapVisitor;

    impl<'de> de::Visitor<'de> for BootstrapVisitor {
        type Value = Vec<Multiaddr>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a list of multiaddresses")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut addrs = Vec::new();

            while let Some(addr) = seq.next_element::<Multiaddr>()? {
                let Some(multiaddr::Protocol::P2p(_)) = addr.iter().last() else {
                    return Err(de::Error::custom("bootstrap address requires a peer id"));
                };

                addrs.push(addr);
            }

            Ok(addrs)
        }
    }

    deserializer.deserialize_seq(BootstrapVisitor)
}
