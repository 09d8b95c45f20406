use std::net::IpAddr;

use eyre::{Result as EyreResult, WrapErr};
use multiaddr::{Multiaddr, Protocol};

/// Normalizes a direct-dial target into a connectable multiaddr.
///
/// Accepted forms: a full multiaddr (leading `/`), `host:port`, a bare IP,
/// or a bare hostname. Numeric hosts become `/ip4` (`/ip6` for IPv6
/// literals), anything else `/dns4`; a target without a port gets
/// `default_port`.
pub fn parse_peer_target(target: &str, default_port: u16) -> EyreResult<Multiaddr> {
    if target.starts_with('/') {
        return target
            .parse()
            .wrap_err_with(|| format!("invalid multiaddr: {target}"));
    }

    if let Ok(addr) = target.parse::<std::net::SocketAddr>() {
        return Ok(from_ip(addr.ip(), addr.port()));
    }

    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(from_ip(ip, default_port));
    }

    if let Some((host, port)) = target.rsplit_once(':') {
        let port = port
            .parse::<u16>()
            .wrap_err_with(|| format!("invalid port in dial target: {target}"))?;

        if host.is_empty() || host.contains(':') {
            eyre::bail!("invalid host in dial target: {target}");
        }

        return Ok(from_host(host, port));
    }

    Ok(from_host(target, default_port))
}

/// The host component of a multiaddr, used to match existing connections
/// against direct-dial targets.
#[must_use]
pub fn host_of(addr: &Multiaddr) -> Option<String> {
    addr.iter().find_map(|protocol| match protocol {
        Protocol::Ip4(ip) => Some(ip.to_string()),
        Protocol::Ip6(ip) => Some(ip.to_string()),
        Protocol::Dns(host) | Protocol::Dns4(host) | Protocol::Dns6(host) => {
            Some(host.into_owned())
        }
        _ => None,
    })
}

fn from_ip(ip: IpAddr, port: u16) -> Multiaddr {
    let addr = match ip {
        IpAddr::V4(ip) => Multiaddr::empty().with(Protocol::Ip4(ip)),
        IpAddr::V6(ip) => Multiaddr::empty().with(Protocol::Ip6(ip)),
    };

    addr.with(Protocol::Tcp(port))
}

fn from_host(host: &str, port: u16) -> Multiaddr {
    Multiaddr::empty()
        .with(Protocol::Dns4(host.into()))
        .with(Protocol::Tcp(port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_multiaddr_passes_through() {
        let addr = parse_peer_target("/ip4/10.0.0.7/tcp/4001", 7353).unwrap();
        assert_eq!(addr.to_string(), "/ip4/10.0.0.7/tcp/4001");
    }

    #[test]
    fn test_host_and_port() {
        let addr = parse_peer_target("10.0.0.7:4001", 7353).unwrap();
        assert_eq!(addr.to_string(), "/ip4/10.0.0.7/tcp/4001");

        let addr = parse_peer_target("station-3.field.example:4001", 7353).unwrap();
        assert_eq!(addr.to_string(), "/dns4/station-3.field.example/tcp/4001");
    }

    #[test]
    fn test_bare_ip_uses_default_port() {
        let addr = parse_peer_target("10.0.0.7", 7353).unwrap();
        assert_eq!(addr.to_string(), "/ip4/10.0.0.7/tcp/7353");
    }

    #[test]
    fn test_bare_hostname_uses_default_port() {
        let addr = parse_peer_target("station-3", 7353).unwrap();
        assert_eq!(addr.to_string(), "/dns4/station-3/tcp/7353");
    }

    #[test]
    fn test_ipv6_literal() {
        let addr = parse_peer_target("[::1]:4001", 7353).unwrap();
        assert_eq!(addr.to_string(), "/ip6/::1/tcp/4001");

        let addr = parse_peer_target("::1", 7353).unwrap();
        assert_eq!(addr.to_string(), "/ip6/::1/tcp/7353");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_peer_target("/not/a/multiaddr", 7353).is_err());
        assert!(parse_peer_target(":4001", 7353).is_err());
        assert!(parse_peer_target("host:notaport:4001", 7353).is_err());
    }

    #[test]
    fn test_host_of() {
        let addr: Multiaddr = "/ip4/10.0.0.7/tcp/4001".parse().unwrap();
        assert_eq!(host_of(&addr).unwrap(), "10.0.0.7");

        let addr: Multiaddr = "/dns4/station-3/tcp/4001".parse().unwrap();
        assert_eq!(host_of(&addr).unwrap(), "station-3");

        let addr: Multiaddr = "/p2p-circuit".parse().unwrap();
        assert!(host_of(&addr).is_none());
    }
}
