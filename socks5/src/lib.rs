//! SOCKS5 client connector: no-auth method, IPv4 CONNECT only.
//!
//! ```no_run
//! # async fn run() -> socks5::Result<()> {
//! let stream = socks5::connect("127.0.0.1:1080", "example.com:80").await?;
//! # drop(stream);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod exchange;
mod proto;
mod resolve;

pub use client::{connect, handshake, Dialer};
pub use error::{Error, ErrorKind, Result};
pub use exchange::exchange;
pub use proto::{reply_message, CONNECT_REPLY_LEN, NEGOTIATION_REPLY_LEN};
pub use resolve::{lookup_ipv4, split_host_port, Resolver, StaticResolver, SystemResolver};
