pub mod config;
pub mod fetch;

pub use socks5;
