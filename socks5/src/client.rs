use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::exchange::exchange;
use crate::proto::*;
use crate::resolve::{lookup_ipv4, split_host_port, Resolver, SystemResolver};

/// Dials `target` through the SOCKS5 server at `socks5` using the system
/// resolver and no timeout.
pub async fn connect(socks5: &str, target: &str) -> Result<TcpStream> {
    Dialer::new().dial(socks5, target).await
}

#[derive(Debug, Default, Copy, Clone)]
struct DialOptions {
    /// Bound on the whole dial, transport connect included. `None` waits
    /// forever on a silent proxy or resolver.
    timeout: Option<Duration>,
}

/// Reusable dial function. Cheap to clone, holds no per-connection state.
#[derive(Clone)]
pub struct Dialer {
    resolver: Arc<dyn Resolver>,
    options: DialOptions,
}

impl Default for Dialer {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialer {
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(SystemResolver),
            options: DialOptions::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Connects to the proxy and negotiates a CONNECT to `target`. The
    /// returned stream carries only application data. On error the
    /// connection to the proxy is dropped.
    pub async fn dial(&self, socks5: &str, target: &str) -> Result<TcpStream> {
        let result = match self.options.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.dial_inner(socks5, target))
                .await
                .unwrap_or(Err(Error::TimedOut)),
            None => self.dial_inner(socks5, target).await,
        };

        if let Err(e) = &result {
            debug!("socks5: dial {} via {} failed: {}", target, socks5, e);
        }
        result
    }

    async fn dial_inner(&self, socks5: &str, target: &str) -> Result<TcpStream> {
        let stream = TcpStream::connect(socks5)
            .await
            .map_err(Error::Connectivity)?;
        debug!("socks5: connected to proxy {}", socks5);

        let mut connector = Connector::new(stream);
        connector.handshake(target, self.resolver.as_ref()).await?;
        Ok(connector.stream)
    }
}

/// Runs both handshake phases over an already open stream. On success the
/// stream is positioned at the first byte of application data. On error the
/// stream must not be used for another attempt.
pub async fn handshake<S>(stream: &mut S, target: &str, resolver: &dyn Resolver) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut connector = Connector::new(stream);
    connector.handshake(target, resolver).await
}

struct Connector<S> {
    stream: S,
}

impl<S> Connector<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn new(stream: S) -> Self {
        Self { stream }
    }

    async fn handshake(&mut self, target: &str, resolver: &dyn Resolver) -> Result<()> {
        self.select_method().await?;

        let (host, port) = split_host_port(target)?;
        let ip = lookup_ipv4(resolver, &host).await?;
        debug!("socks5: {} resolved to {}", host, ip);

        self.request_connect(SocketAddrV4::new(ip, port)).await
    }

    async fn select_method(&mut self) -> Result<()> {
        let response = self
            .round_trip(&NEGOTIATION_REQUEST, NEGOTIATION_REPLY_LEN)
            .await?;

        if response.len() != NEGOTIATION_REPLY_LEN {
            return Err(Error::Protocol("server does not respond properly"));
        }
        if response[0] != VER {
            return Err(Error::Protocol("server does not support SOCKS5"));
        }
        if response[1] != NO_AUTH {
            return Err(Error::Negotiation {
                method: response[1],
            });
        }

        debug!("socks5: no-auth method accepted");
        Ok(())
    }

    async fn request_connect(&mut self, address: SocketAddrV4) -> Result<()> {
        let request = connect_request(address);
        let response = self.round_trip(&request, CONNECT_REPLY_LEN).await?;

        if response.len() != CONNECT_REPLY_LEN {
            return Err(Error::Protocol("server does not respond properly"));
        }
        if response[1] != REP_SUCCESS {
            return Err(Error::ConnectRefused {
                status: response[1],
            });
        }

        debug!("socks5: connection to {} established", address);
        Ok(())
    }

    async fn round_trip(&mut self, request: &[u8], expected: usize) -> Result<Vec<u8>> {
        exchange(&mut self.stream, request, expected)
            .await
            .map_err(Error::Connectivity)
    }
}
