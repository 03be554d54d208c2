//! Server configuration from the environment.

use crate::error::{Result, ServerError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

pub const HOST_ENV: &str = "SKETCHROOM_HOST";
pub const PORT_ENV: &str = "SKETCHROOM_PORT";
/// Older deployments set only this one.
pub const LEGACY_PORT_ENV: &str = "SERVER_PORT";
pub const CHANNEL_CAPACITY_ENV: &str = "SKETCHROOM_CHANNEL_CAPACITY";

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Per-room broadcast buffer; slower members skip what overflows.
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from any variable source. Unset or blank variables
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let host = parse_var(&lookup, HOST_ENV)?.unwrap_or(defaults.host);
        let port = match parse_var(&lookup, PORT_ENV)? {
            Some(port) => port,
            None => parse_var(&lookup, LEGACY_PORT_ENV)?.unwrap_or(defaults.port),
        };
        let channel_capacity = parse_var(&lookup, CHANNEL_CAPACITY_ENV)?.unwrap_or(defaults.channel_capacity);
        if channel_capacity == 0 {
            return Err(ServerError::Config {
                var: CHANNEL_CAPACITY_ENV,
                value: "0".to_string(),
            });
        }
        Ok(Self { host, port, channel_capacity })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>> {
    let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    match value.trim().parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ServerError::Config { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr().to_string(), "0.0.0.0:3001");
    }

    #[test]
    fn test_port_precedence() {
        assert_eq!(config_from(&[(LEGACY_PORT_ENV, "4000")]).unwrap().port, 4000);
        let both = config_from(&[(LEGACY_PORT_ENV, "4000"), (PORT_ENV, "5000")]).unwrap();
        assert_eq!(both.port, 5000);
        assert_eq!(config_from(&[(PORT_ENV, " ")]).unwrap().port, DEFAULT_PORT);
    }

    #[test]
    fn test_host_and_capacity() {
        let config = config_from(&[(HOST_ENV, "127.0.0.1"), (CHANNEL_CAPACITY_ENV, "16")]).unwrap();
        assert_eq!(config.addr().to_string(), "127.0.0.1:3001");
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn test_invalid_values() {
        let err = config_from(&[(PORT_ENV, "http")]).unwrap_err();
        assert!(matches!(err, ServerError::Config { var: PORT_ENV, ref value } if value == "http"));
        assert!(config_from(&[(HOST_ENV, "localhost")]).is_err());
        assert!(config_from(&[(CHANNEL_CAPACITY_ENV, "0")]).is_err());
    }
}
