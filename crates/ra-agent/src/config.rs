//! # Agent Configuration
//!
//! Read from the environment, validated before the server starts.

use ra_03_dispatch::MAX_SIM_DEVICES;
use shared_types::{HostName, WireFormat};
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3334";
pub const DEFAULT_SIM_DEVICES: usize = 2;

/// Default cap on one inbound request line (1MB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("RA_LISTEN_ADDR {0:?} is not a socket address")]
    InvalidListenAddr(String),

    #[error("RA_HOSTNAME {0:?} exceeds {max} bytes", max = shared_types::HOST_NAME_MAX)]
    HostnameTooLong(String),

    #[error("RA_HOSTNAME must not be empty")]
    EmptyHostname,

    #[error("RA_SIM_DEVICES {0:?} is not a device count of at most {max}", max = MAX_SIM_DEVICES)]
    InvalidDeviceCount(String),

    #[error("RA_MAX_FRAME_LEN {0:?} is not a positive byte count")]
    InvalidFrameLimit(String),

    #[error("RA_METRICS_ADDR {0:?} is not a socket address")]
    InvalidMetricsAddr(String),
}

/// Agent runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Address the TCP server binds.
    pub listen_addr: String,
    /// Host name minted into every remote identity.
    pub hostname: String,
    /// Pretty-print responses.
    pub pretty_json: bool,
    /// Number of simulated accelerators.
    pub sim_devices: String,
    /// Longest request line accepted, in bytes.
    pub max_frame_len: String,
    /// Address serving `/metrics`; no metrics endpoint when unset.
    pub metrics_addr: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            hostname: "localhost".to_string(),
            pretty_json: false,
            sim_devices: DEFAULT_SIM_DEVICES.to_string(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN.to_string(),
            metrics_addr: None,
        }
    }
}

impl AgentConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RA_LISTEN_ADDR`: bind address (default: 127.0.0.1:3334)
    /// - `RA_HOSTNAME`: identity host name (default: `HOSTNAME`, else localhost)
    /// - `RA_PRETTY_JSON`: pretty-print responses (default: false)
    /// - `RA_SIM_DEVICES`: simulated accelerator count (default: 2, max: 256)
    /// - `RA_MAX_FRAME_LEN`: longest request line in bytes (default: 1MB)
    /// - `RA_METRICS_ADDR`: Prometheus endpoint bind address (default: disabled)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: env::var("RA_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            hostname: env::var("RA_HOSTNAME")
                .or_else(|_| env::var("HOSTNAME"))
                .unwrap_or(defaults.hostname),
            pretty_json: env::var("RA_PRETTY_JSON")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.pretty_json),
            sim_devices: env::var("RA_SIM_DEVICES").unwrap_or(defaults.sim_devices),
            max_frame_len: env::var("RA_MAX_FRAME_LEN").unwrap_or(defaults.max_frame_len),
            metrics_addr: env::var("RA_METRICS_ADDR").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Checks every field. The typed accessors below fail the same way.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        self.host_name()?;
        self.device_count()?;
        self.frame_limit()?;
        self.metrics_socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(self.listen_addr.clone()))
    }

    pub fn host_name(&self) -> Result<HostName, ConfigError> {
        if self.hostname.is_empty() {
            return Err(ConfigError::EmptyHostname);
        }
        HostName::new(&self.hostname).map_err(|_| ConfigError::HostnameTooLong(self.hostname.clone()))
    }

    pub fn device_count(&self) -> Result<usize, ConfigError> {
        self.sim_devices
            .trim()
            .parse()
            .ok()
            .filter(|n| *n <= MAX_SIM_DEVICES)
            .ok_or_else(|| ConfigError::InvalidDeviceCount(self.sim_devices.clone()))
    }

    pub fn frame_limit(&self) -> Result<usize, ConfigError> {
        self.max_frame_len
            .trim()
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::InvalidFrameLimit(self.max_frame_len.clone()))
    }

    pub fn metrics_socket_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.metrics_addr
            .as_ref()
            .map(|addr| {
                addr.parse()
                    .map_err(|_| ConfigError::InvalidMetricsAddr(addr.clone()))
            })
            .transpose()
    }

    pub fn format(&self) -> WireFormat {
        if self.pretty_json {
            WireFormat::Pretty
        } else {
            WireFormat::Compact
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.socket_addr().unwrap().port(), 3334);
        assert_eq!(config.device_count().unwrap(), 2);
        assert_eq!(config.format(), WireFormat::Compact);
    }

    #[test]
    fn test_rejects_bad_listen_addr() {
        let config = AgentConfig {
            listen_addr: "localhost".to_string(),
            ..AgentConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidListenAddr("localhost".to_string()))
        );
    }

    #[test]
    fn test_rejects_long_hostname() {
        let config = AgentConfig {
            hostname: "a".repeat(shared_types::HOST_NAME_MAX + 1),
            ..AgentConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::HostnameTooLong(_))
        ));
    }

    #[test]
    fn test_rejects_bad_device_count() {
        let config = AgentConfig {
            sim_devices: "-1".to_string(),
            ..AgentConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDeviceCount(_))
        ));
    }

    #[test]
    fn test_device_count_is_bounded() {
        let at_max = AgentConfig {
            sim_devices: MAX_SIM_DEVICES.to_string(),
            ..AgentConfig::default()
        };
        assert_eq!(at_max.device_count().unwrap(), MAX_SIM_DEVICES);

        let over = AgentConfig {
            sim_devices: (MAX_SIM_DEVICES + 1).to_string(),
            ..AgentConfig::default()
        };
        assert!(matches!(
            over.validate(),
            Err(ConfigError::InvalidDeviceCount(_))
        ));
    }

    #[test]
    fn test_frame_limit() {
        assert_eq!(
            AgentConfig::default().frame_limit().unwrap(),
            DEFAULT_MAX_FRAME_LEN
        );
        let zero = AgentConfig {
            max_frame_len: "0".to_string(),
            ..AgentConfig::default()
        };
        assert_eq!(
            zero.validate(),
            Err(ConfigError::InvalidFrameLimit("0".to_string()))
        );
    }

    #[test]
    fn test_metrics_addr() {
        assert_eq!(AgentConfig::default().metrics_socket_addr().unwrap(), None);
        let enabled = AgentConfig {
            metrics_addr: Some("127.0.0.1:9334".to_string()),
            ..AgentConfig::default()
        };
        assert_eq!(enabled.metrics_socket_addr().unwrap().unwrap().port(), 9334);
        let bad = AgentConfig {
            metrics_addr: Some("metrics".to_string()),
            ..AgentConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidMetricsAddr(_))
        ));
    }

    #[test]
    fn test_pretty_format() {
        let config = AgentConfig {
            pretty_json: true,
            ..AgentConfig::default()
        };
        assert_eq!(config.format(), WireFormat::Pretty);
    }
}
