//! Adapter configuration

use crate::{Result, RoomsError};
use std::collections::HashMap;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_PREFIX: &str = "socket.io";

// Redis glob metacharacters; a prefix containing any of them would change the
// meaning of the subscription pattern
const GLOB_METACHARS: &[char] = &['*', '?', '[', ']', '\\'];

/// Connection endpoint and channel namespace for the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Redis host
    pub host: String,
    /// Redis port
    pub port: u16,
    /// Channel namespace; every node publishes on `prefix#<node-id>`
    pub prefix: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl AdapterConfig {
    /// Build from a string option map.
    ///
    /// Recognised keys are `host`, `port` and `prefix`; anything else is ignored.
    pub fn from_options(opts: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = opts.get("host") {
            config.host = host.clone();
        }
        if let Some(port) = opts.get("port") {
            config.port = parse_port(port)?;
        }
        if let Some(prefix) = opts.get("prefix") {
            config.prefix = prefix.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Build from `ROOMS_REDIS_HOST`, `ROOMS_REDIS_PORT` and `ROOMS_PREFIX`
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: std::env::var("ROOMS_REDIS_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: match std::env::var("ROOMS_REDIS_PORT") {
                Ok(v) => parse_port(&v)?,
                Err(_) => DEFAULT_PORT,
            },
            prefix: std::env::var("ROOMS_PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }

    /// Pattern every node subscribes to
    pub fn pattern(&self) -> String {
        crate::node::subscription_pattern(&self.prefix)
    }

    fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(RoomsError::Configuration("host must not be empty".into()));
        }
        if self.prefix.is_empty() {
            return Err(RoomsError::Configuration("prefix must not be empty".into()));
        }
        if let Some(c) = self.prefix.chars().find(|c| GLOB_METACHARS.contains(c)) {
            return Err(RoomsError::Configuration(format!(
                "prefix must not contain pattern character {:?}: {}",
                c, self.prefix
            )));
        }
        Ok(())
    }
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| RoomsError::Configuration(format!("invalid port: {}", value)))
}
