use std::io;

use crate::proto::reply_message;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure category of a dial, for callers that branch on the kind of error
/// rather than its message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    Protocol,
    Negotiation,
    Resolution,
    AddressFormat,
    ConnectRefused,
    TimedOut,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("socks5: cannot reach proxy: {0}")]
    Connectivity(#[source] io::Error),
    #[error("socks5: {0}")]
    Protocol(&'static str),
    #[error("socks5: method negotiation failed (server selected method {method:#04x})")]
    Negotiation { method: u8 },
    #[error("socks5: {reason}: {host}")]
    Resolution { host: String, reason: &'static str },
    #[error("socks5: invalid address {addr:?}: {reason}")]
    AddressFormat { addr: String, reason: &'static str },
    #[error("socks5: can't complete connection: {} ({status:#04x})", reply_message(*.status))]
    ConnectRefused { status: u8 },
    #[error("socks5: dial timed out")]
    TimedOut,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connectivity(_) => ErrorKind::Connectivity,
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::Negotiation { .. } => ErrorKind::Negotiation,
            Error::Resolution { .. } => ErrorKind::Resolution,
            Error::AddressFormat { .. } => ErrorKind::AddressFormat,
            Error::ConnectRefused { .. } => ErrorKind::ConnectRefused,
            Error::TimedOut => ErrorKind::TimedOut,
        }
    }

    pub(crate) fn address(addr: &str, reason: &'static str) -> Self {
        Error::AddressFormat {
            addr: addr.to_string(),
            reason,
        }
    }
}
