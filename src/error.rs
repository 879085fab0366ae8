//! Unified error types for liveframe
//!
//! Only construction-time configuration problems reach callers as hard
//! failures. Media errors are produced by the parsers and logged at the
//! ingest boundary, where the offending payload is dropped.

use std::fmt;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all liveframe operations
#[derive(Debug)]
pub enum Error {
    /// Malformed media payload
    Media(MediaError),
    /// Invalid configuration
    Config(ConfigError),
    /// Subsession / subscriber bookkeeping failure
    Registry(RegistryError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Media(e) => write!(f, "Media error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Registry(e) => write!(f, "Registry error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Media(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Registry(e) => Some(e),
        }
    }
}

impl From<MediaError> for Error {
    fn from(err: MediaError) -> Self {
        Error::Media(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        Error::Registry(err)
    }
}

/// Media parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Multiplexed header could not be read
    MalformedHeader,
    /// Declared stream count differs from the configured channel count
    StreamCountMismatch { declared: usize, configured: usize },
    /// Declared stream lengths run past the end of the chunk
    TruncatedStream { declared: usize, available: usize },
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::MalformedHeader => write!(f, "Malformed multiplexed header"),
            MediaError::StreamCountMismatch {
                declared,
                configured,
            } => write!(
                f,
                "Stream count mismatch: header declares {}, configured {}",
                declared, configured
            ),
            MediaError::TruncatedStream {
                declared,
                available,
            } => write!(
                f,
                "Truncated stream: {} bytes declared, {} available",
                declared, available
            ),
        }
    }
}

impl std::error::Error for MediaError {}

/// Construction-time invariant violations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Video and audio source ids of one channel are equal
    SourceIdCollision(u32),
    /// A queue or backlog was configured with zero capacity
    ZeroCapacity(&'static str),
    /// A subsession was configured with zero channels
    ZeroChannels,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::SourceIdCollision(id) => {
                write!(f, "Video and audio source ids collide: {}", id)
            }
            ConfigError::ZeroCapacity(what) => write!(f, "Zero capacity for {}", what),
            ConfigError::ZeroChannels => write!(f, "Subsession needs at least one channel"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Subsession registry errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No subsession is registered for the given channel and source
    SubsessionNotFound(String),
    /// The client is already attached to the subsession
    DuplicateClient(u64),
    /// The client is not attached to the subsession
    ClientNotFound(u64),
    /// The subsession was released after its last client left
    SubsessionReleased(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::SubsessionNotFound(key) => write!(f, "Subsession not found: {}", key),
            RegistryError::DuplicateClient(id) => write!(f, "Client already attached: {}", id),
            RegistryError::ClientNotFound(id) => write!(f, "Client not attached: {}", id),
            RegistryError::SubsessionReleased(key) => write!(f, "Subsession released: {}", key),
        }
    }
}

impl std::error::Error for RegistryError {}
