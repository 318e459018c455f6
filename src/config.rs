//! Configuration for the Framecast daemon
//!
//! Loads configuration from a TOML file with the minimal parameters needed
//! for the streaming server and the synthetic frame source.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub logging: LoggingConfig,
}

/// Streaming server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// TCP bind address for the frame stream
    ///
    /// Examples:
    /// - `0.0.0.0:8888` - Bind to all interfaces on port 8888
    /// - `127.0.0.1:0` - Localhost, ephemeral port (tests)
    pub bind_address: String,

    /// Frames buffered per client before the oldest is evicted
    pub queue_capacity: usize,

    /// Idle poll interval in milliseconds for session and acceptor loops
    pub idle_poll_ms: u64,
}

impl ServerConfig {
    /// Idle poll interval as a [`Duration`].
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

/// Synthetic frame source configuration (demo daemon)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Plane width in pixels
    pub width: u32,
    /// Plane height in pixels
    pub height: u32,
    /// Frames produced per second
    pub frame_rate: u32,
    /// Whether to generate a color plane
    pub color: bool,
    /// Whether to generate an infrared plane
    pub ir: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use framecast::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("framecast.toml")?;
    /// # Ok::<(), framecast::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration: all interfaces on port 8888, 10-frame queues,
    /// VGA test pattern at 30 fps.
    pub fn defaults() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "0.0.0.0:8888".to_string(),
                queue_capacity: crate::queue::DEFAULT_CAPACITY,
                idle_poll_ms: 10,
            },
            source: SourceConfig {
                width: 640,
                height: 480,
                frame_rate: 30,
                color: true,
                ir: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::defaults();
        assert_eq!(config.server.bind_address, "0.0.0.0:8888");
        assert_eq!(config.server.queue_capacity, 10);
        assert_eq!(config.server.idle_poll(), Duration::from_millis(10));
        assert_eq!(config.source.width, 640);
        assert_eq!(config.source.frame_rate, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        // Should contain all sections
        assert!(toml_string.contains("[server]"));
        assert!(toml_string.contains("[source]"));
        assert!(toml_string.contains("[logging]"));

        // Should contain key values
        assert!(toml_string.contains("bind_address = \"0.0.0.0:8888\""));
        assert!(toml_string.contains("queue_capacity = 10"));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[server]
bind_address = "127.0.0.1:9000"
queue_capacity = 4
idle_poll_ms = 5

[source]
width = 320
height = 240
frame_rate = 15
color = true
ir = false

[logging]
level = "debug"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.server.queue_capacity, 4);
        assert_eq!(config.source.height, 240);
        assert!(!config.source.ir);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framecast.toml");

        let mut config = AppConfig::defaults();
        config.server.bind_address = "127.0.0.1:8899".to_string();
        config.to_file(&path).unwrap();

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.server.bind_address, "127.0.0.1:8899");
        assert_eq!(loaded.server.queue_capacity, config.server.queue_capacity);
    }
}
