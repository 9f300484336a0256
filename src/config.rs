//! Configuration loading and management.

use crate::network::EndpointSettings;
use crate::state::{MatrixConfig, ServerInfo};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    pub server: ServerConfig,
    /// Network listen configuration.
    pub listen: ListenConfig,
    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "irc.braid.test").
    pub name: String,
    /// Network name.
    pub network: String,
    /// Server description.
    #[serde(default)]
    pub description: String,
    /// Message of the day lines.
    #[serde(default)]
    pub motd: Vec<String>,
}

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address for client connections (e.g., "0.0.0.0:6667").
    pub address: SocketAddr,
    /// Optional address for relay endpoints.
    pub relay_address: Option<SocketAddr>,
}

/// Resource limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Outbound mailbox capacity per endpoint, in messages.
    pub mailbox_capacity: usize,
    /// Maximum inbound line length, CR LF included.
    pub max_line_len: usize,
    /// Maximum nickname length.
    pub nick_len: usize,
    /// Maximum channels per user.
    pub max_channels: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 512,
            max_line_len: braid_proto::MAX_LINE_LEN,
            nick_len: braid_proto::DEFAULT_NICK_MAX_LEN,
            max_channels: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() || self.server.name.contains(' ') {
            return Err(ConfigError::Invalid("server.name must be a single word".into()));
        }
        if self.limits.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid("limits.mailbox_capacity must be positive".into()));
        }
        if self.limits.max_line_len < 16 {
            return Err(ConfigError::Invalid("limits.max_line_len is too small".into()));
        }
        if self.limits.nick_len == 0 || self.limits.max_channels == 0 {
            return Err(ConfigError::Invalid(
                "limits.nick_len and limits.max_channels must be positive".into(),
            ));
        }
        if self.listen.address.port() != 0 && self.listen.relay_address == Some(self.listen.address)
        {
            return Err(ConfigError::Invalid(
                "listen.relay_address must differ from listen.address".into(),
            ));
        }
        Ok(())
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: self.server.name.clone(),
            network: self.server.network.clone(),
            description: self.server.description.clone(),
            version: concat!("braid-", env!("CARGO_PKG_VERSION")).to_string(),
            created: chrono::Utc::now(),
            motd: self.server.motd.clone(),
        }
    }

    pub fn matrix_config(&self) -> MatrixConfig {
        MatrixConfig {
            nick_len: self.limits.nick_len,
            max_channels: self.limits.max_channels,
        }
    }

    pub fn endpoint_settings(&self) -> EndpointSettings {
        EndpointSettings {
            mailbox_capacity: self.limits.mailbox_capacity,
            max_line_len: self.limits.max_line_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [server]
        name = "irc.test"
        network = "TestNet"

        [listen]
        address = "127.0.0.1:6667"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.limits.mailbox_capacity, 512);
        assert_eq!(config.limits.nick_len, 30);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.listen.relay_address.is_none());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{MINIMAL}\n[limits]\nmailbox_capacity = 8\n[logging]\nformat = \"json\"\n"
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.endpoint_settings().mailbox_capacity, 8);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn rejects_zero_capacity() {
        let text = format!("{MINIMAL}\n[limits]\nmailbox_capacity = 0\n");
        assert!(matches!(Config::parse(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_shared_relay_address() {
        let text = MINIMAL.replace(
            "address = \"127.0.0.1:6667\"",
            "address = \"127.0.0.1:6667\"\nrelay_address = \"127.0.0.1:6667\"",
        );
        assert!(matches!(Config::parse(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            Config::load("/nonexistent/braid.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
