// Mod API HTTP client.
// Handles authentication headers and maps non-success responses to transport errors.

use reqwest::{
    Client, Response,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::error::TransportError;

/// Error payload returned by the API on failure.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// reqwest-backed implementation of [`RemoteFetch`](super::RemoteFetch).
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    game_id: u32,
    api_key: String,
    authenticated: bool,
}

impl HttpRemote {
    /// Create a client for the configured game.
    ///
    /// With an OAuth token every request carries a bearer header; without one the API
    /// key is sent as a query parameter.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.oauth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| TransportError::new(None, e.to_string()))?,
            );
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("modcache"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            game_id: config.game_id,
            api_key: config.api_key.clone(),
            authenticated: config.oauth_token.is_some(),
        })
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }

    /// Make a GET request against an API endpoint with query parameters.
    pub async fn get_with_params(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Response, TransportError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self.client.get(&url).query(params);
        if !self.authenticated {
            request = request.query(&[("api_key", self.api_key.as_str())]);
        }

        let response = request.send().await?;
        check_response(response).await
    }

    /// Make a GET request against an absolute URL (signed binary and image locations).
    pub async fn get_url(&self, url: &str) -> Result<Response, TransportError> {
        let response = self.client.get(url).send().await?;
        check_response(response).await
    }
}

/// Check response status and convert errors.
async fn check_response(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });

    Err(TransportError::new(Some(status.as_u16()), message))
}
