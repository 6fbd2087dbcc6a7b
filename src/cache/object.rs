// Typed object cache.
// Serializes records through a pluggable serializer and turns unusable data into cache misses.

use std::fmt;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{CacheError, Result, SerializerError};

use super::store;

/// Encoding used for cached records.
pub trait Serializer: Send + Sync {
    fn encode<T: Serialize>(&self, value: &T) -> std::result::Result<Vec<u8>, SerializerError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> std::result::Result<T, SerializerError>;
}

/// JSON encoding via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    /// Write indented JSON.
    pub pretty: bool,
}

impl Serializer for JsonSerializer {
    fn encode<T: Serialize>(&self, value: &T) -> std::result::Result<Vec<u8>, SerializerError> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> std::result::Result<T, SerializerError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Reads and writes typed objects on top of the file store.
///
/// Reads never fail: a missing file, an unreadable file, and a record that no longer
/// decodes are all reported as `None`, the last two with a warning.
#[derive(Clone, Default)]
pub struct ObjectCache<S = JsonSerializer> {
    serializer: S,
}

impl<S> fmt::Debug for ObjectCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache").finish_non_exhaustive()
    }
}

impl<S: Serializer> ObjectCache<S> {
    pub fn new(serializer: S) -> Self {
        Self { serializer }
    }

    /// Read and decode an object, distinguishing the reason for a miss.
    pub fn try_read_object<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let bytes = store::read_bytes(path)?;
        self.serializer
            .decode(&bytes)
            .map_err(|source| CacheError::Decode {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Read and decode an object, treating every failure as a miss.
    pub fn read_object<T: DeserializeOwned>(&self, path: &Path) -> Option<T> {
        match self.try_read_object(path) {
            Ok(value) => Some(value),
            Err(CacheError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding unusable cache entry");
                None
            }
        }
    }

    /// Encode and write an object.
    ///
    /// An encoding failure skips the write entirely, leaving any previous file intact.
    pub fn write_object<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = self
            .serializer
            .encode(value)
            .map_err(|source| CacheError::Encode {
                path: path.to_path_buf(),
                source,
            })
            .inspect_err(|e| tracing::warn!(error = %e, "Skipping cache write"))?;

        store::write_bytes(path, &bytes)
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to write cache entry"))
    }

    /// Read raw bytes (images, archives), treating every failure as a miss.
    pub fn read_raw(&self, path: &Path) -> Option<Vec<u8>> {
        match store::read_bytes(path) {
            Ok(bytes) => Some(bytes),
            Err(CacheError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached file");
                None
            }
        }
    }

    /// Write raw bytes.
    pub fn write_raw(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        store::write_bytes(path, bytes)
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to write cached file"))
    }
}
