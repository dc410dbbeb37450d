use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use log::debug;
use tokio::net;

use crate::error::{Error, Result};

#[async_trait]
pub trait Resolver: Sync + Send {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolves through the operating system, like `TcpStream::connect` would.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Fixed host table. Hosts missing from the table fail with `NotFound`.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, host: &str, addrs: Vec<IpAddr>) -> Self {
        self.hosts.insert(host.to_string(), addrs);
        self
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        self.hosts
            .get(host)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown host"))
    }
}

/// Returns the first IPv4 address in resolver order. IPv4-mapped IPv6
/// answers are accepted as IPv4.
pub async fn lookup_ipv4(resolver: &dyn Resolver, host: &str) -> Result<Ipv4Addr> {
    let cannot_resolve = || Error::Resolution {
        host: host.to_string(),
        reason: "cannot resolve host",
    };

    let addrs = match resolver.lookup(host).await {
        Ok(addrs) => addrs,
        Err(e) => {
            debug!("socks5: lookup {} failed: {}", host, e);
            return Err(cannot_resolve());
        }
    };

    if addrs.is_empty() {
        return Err(cannot_resolve());
    }

    addrs
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(ip) => ip.to_ipv4_mapped(),
        })
        .ok_or_else(|| Error::Resolution {
            host: host.to_string(),
            reason: "cannot resolve IPv4 address of the host",
        })
}

/// Splits `host:port` (or `[v6]:port`) into host and port.
pub fn split_host_port(addr: &str) -> Result<(String, u16)> {
    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, rest) = rest
            .split_once(']')
            .ok_or_else(|| Error::address(addr, "missing ']'"))?;
        let port = rest
            .strip_prefix(':')
            .ok_or_else(|| Error::address(addr, "missing port"))?;
        (host, port)
    } else {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| Error::address(addr, "missing port"))?;
        if host.contains(':') {
            return Err(Error::address(addr, "too many colons"));
        }
        (host, port)
    };

    if host.is_empty() {
        return Err(Error::address(addr, "missing host"));
    }

    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::address(addr, "invalid port"));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| Error::address(addr, "port out of range"))?;

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::net::Ipv6Addr;

    #[test]
    fn split_plain() {
        let (host, port) = split_host_port("example.com:443").unwrap();
        assert_eq!(host, "example.com");
        assert_eq!(port, 443);

        let (host, port) = split_host_port("10.0.0.1:0").unwrap();
        assert_eq!(host, "10.0.0.1");
        assert_eq!(port, 0);
    }

    #[test]
    fn split_bracketed() {
        let (host, port) = split_host_port("[::1]:65535").unwrap();
        assert_eq!(host, "::1");
        assert_eq!(port, 65535);
    }

    #[test]
    fn split_rejects_malformed() {
        for addr in [
            "example.com",
            "example.com:",
            "example.com:http",
            "example.com:+80",
            "example.com:65536",
            ":80",
            "::1:80",
            "[::1]80",
            "[::1",
        ] {
            let e = split_host_port(addr).unwrap_err();
            assert_eq!(e.kind(), ErrorKind::AddressFormat, "{}", addr);
        }
    }

    #[tokio::test]
    async fn first_ipv4_wins() {
        let resolver = StaticResolver::new().insert(
            "example.com",
            vec![
                IpAddr::V6(Ipv6Addr::LOCALHOST),
                IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)),
                IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8)),
            ],
        );
        let ip = lookup_ipv4(&resolver, "example.com").await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(1, 2, 3, 4));
    }

    #[tokio::test]
    async fn mapped_ipv6_counts_as_ipv4() {
        let mapped = Ipv4Addr::new(192, 0, 2, 1).to_ipv6_mapped();
        let resolver = StaticResolver::new().insert("mapped", vec![IpAddr::V6(mapped)]);
        let ip = lookup_ipv4(&resolver, "mapped").await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(192, 0, 2, 1));
    }

    #[tokio::test]
    async fn ipv6_only_fails() {
        let resolver =
            StaticResolver::new().insert("v6.example", vec![IpAddr::V6(Ipv6Addr::LOCALHOST)]);
        let e = lookup_ipv4(&resolver, "v6.example").await.unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Resolution);
        assert_eq!(
            e.to_string(),
            "socks5: cannot resolve IPv4 address of the host: v6.example"
        );
    }

    #[tokio::test]
    async fn empty_or_unknown_fails() {
        let resolver = StaticResolver::new().insert("empty", vec![]);
        let e = lookup_ipv4(&resolver, "empty").await.unwrap_err();
        assert_eq!(e.to_string(), "socks5: cannot resolve host: empty");

        let e = lookup_ipv4(&resolver, "nowhere").await.unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Resolution);
    }

    #[tokio::test]
    async fn system_resolver_handles_literals() {
        let ip = lookup_ipv4(&SystemResolver, "127.0.0.1").await.unwrap();
        assert_eq!(ip, Ipv4Addr::LOCALHOST);
    }
}
