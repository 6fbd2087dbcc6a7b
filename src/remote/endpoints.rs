// Mod API endpoint functions.
// Modfile resolution and the RemoteFetch implementation.

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::TransportError;

use super::client::HttpRemote;
use super::fetch::{BinaryBody, MetadataRequest, RemoteFetch};
use super::types::{ModId, Modfile, ModfileId};

impl HttpRemote {
    /// Get a modfile, including a freshly signed download URL.
    pub async fn get_modfile(
        &self,
        mod_id: ModId,
        modfile_id: ModfileId,
    ) -> Result<Modfile, TransportError> {
        let response = self
            .get_with_params(&modfile_endpoint(self.game_id(), mod_id, modfile_id), &[])
            .await?;
        Ok(response.json().await?)
    }
}

fn modfile_endpoint(game_id: u32, mod_id: ModId, modfile_id: ModfileId) -> String {
    format!("/games/{}/mods/{}/files/{}", game_id, mod_id, modfile_id)
}

#[async_trait]
impl RemoteFetch for HttpRemote {
    async fn fetch_metadata(
        &self,
        request: &MetadataRequest,
    ) -> Result<serde_json::Value, TransportError> {
        let response = self
            .get_with_params(&request.endpoint, &request.query)
            .await?;
        Ok(response.json().await?)
    }

    async fn fetch_binary(&self, url: &str) -> Result<BinaryBody, TransportError> {
        let response = self.get_url(url).await?;
        let content_length = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();
        Ok(BinaryBody {
            content_length,
            stream,
        })
    }

    async fn resolve_modfile(
        &self,
        mod_id: ModId,
        modfile_id: ModfileId,
    ) -> Result<Modfile, TransportError> {
        self.get_modfile(mod_id, modfile_id).await
    }
}
