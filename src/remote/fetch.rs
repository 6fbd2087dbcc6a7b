// Remote-fetch collaborator interface.
// The narrow surface the download layer needs from whatever talks to the mod API.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::TransportError;

use super::types::{ModId, Modfile, ModfileId};

/// Body of a binary response, delivered chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// A binary response ready to be streamed.
pub struct BinaryBody {
    /// Declared length of the body, when the server sent one.
    pub content_length: Option<u64>,
    pub stream: ByteStream,
}

impl std::fmt::Debug for BinaryBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Describes a metadata request: an API endpoint plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequest {
    /// Endpoint path relative to the API base, e.g. `/games/34/mods/7`.
    pub endpoint: String,
    pub query: Vec<(String, String)>,
}

impl MetadataRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            query: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

/// Issues requests against the remote source of truth.
///
/// Implementations own timeouts; the download layer never cancels a request.
#[async_trait]
pub trait RemoteFetch: Send + Sync {
    /// Fetch a JSON record.
    async fn fetch_metadata(
        &self,
        request: &MetadataRequest,
    ) -> Result<serde_json::Value, TransportError>;

    /// Open a streaming download of `url`.
    async fn fetch_binary(&self, url: &str) -> Result<BinaryBody, TransportError>;

    /// Fetch a modfile record, including its signed binary URL.
    async fn resolve_modfile(
        &self,
        mod_id: ModId,
        modfile_id: ModfileId,
    ) -> Result<Modfile, TransportError>;
}
