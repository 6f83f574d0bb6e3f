//! Relay runtime: configuration and the HTTP server.

mod config;
mod server;

pub use config::{ConfigError, ProxyConfig};
pub use server::RelayServer;
