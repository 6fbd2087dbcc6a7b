// Error types for the modcache library.
// Covers local cache failures, remote transport failures, and download failures.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed source error produced by a serializer.
pub type SerializerError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache entry not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to decode cached data at {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: SerializerError,
    },

    #[error("Failed to encode data for {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: SerializerError,
    },

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid {kind} id {value}: ids must be positive")]
    InvalidId { kind: &'static str, value: i64 },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means "nothing usable is cached here".
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Decode { .. })
    }
}

/// Failure reported by the remote-fetch collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe_transport(.status, .message))]
pub struct TransportError {
    /// HTTP status code, when the failure came from a response.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

fn describe_transport(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => format!("Transport error: {}", message),
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Failure delivered to the failure observers of a download handle.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Local IO error at {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DownloadError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DownloadError::LocalIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
