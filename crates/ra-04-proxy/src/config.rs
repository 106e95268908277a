//! Client configuration.

use crate::error::RemoteError;
use shared_types::{HostName, WireFormat};

/// How the client names itself and formats outgoing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Written into every request header's `from` field.
    pub host_name: HostName,
    pub format: WireFormat,
}

impl ClientConfig {
    pub fn new(host_name: &str) -> Result<Self, RemoteError> {
        let host_name = HostName::new(host_name)
            .map_err(|_| RemoteError::InvalidParam("host name exceeds capacity"))?;
        Ok(Self {
            host_name,
            format: WireFormat::Compact,
        })
    }

    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host_name: HostName::new("localhost").unwrap_or_default(),
            format: WireFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_long_host_name() {
        let name = "h".repeat(shared_types::HOST_NAME_MAX + 1);
        assert!(matches!(
            ClientConfig::new(&name),
            Err(RemoteError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_defaults_to_compact() {
        let config = ClientConfig::new("client-0").unwrap();
        assert_eq!(config.format, WireFormat::Compact);
        assert_eq!(config.host_name.as_str(), "client-0");
        let pretty = config.with_format(WireFormat::Pretty);
        assert_eq!(pretty.format, WireFormat::Pretty);
    }
}
