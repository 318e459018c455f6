//! Error types for Framecast

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Framecast error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Listener setup failure (socket creation, bind or listen)
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Address the server attempted to bind
        address: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Configuration parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration write error
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
