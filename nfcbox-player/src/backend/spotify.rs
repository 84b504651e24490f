//! Spotify Web API playback backend

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{check_status, transport_error, PlaybackBackend, PlaybackStatus, PlaybackTarget, SpotifyAuth};
use crate::{PlayerError, Result};

/// Upper bound on any single backend request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by the API and accounts calls
pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("nfcbox/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| PlayerError::Config(format!("Could not build HTTP client: {}", e)))
}

pub struct SpotifyClient {
    http: reqwest::Client,
    api_base_url: String,
    auth: SpotifyAuth,
}

impl SpotifyClient {
    pub fn new(http: reqwest::Client, api_base_url: impl Into<String>, auth: SpotifyAuth) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<reqwest::Response> {
        let token = self.auth.access_token().await?;
        let url = format!("{}{}", self.api_base_url, path);
        debug!(%method, %url, "Backend request");

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(token)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(transport_error)?;
        check_status(response).await
    }
}

#[async_trait]
impl PlaybackBackend for SpotifyClient {
    async fn transfer(&self, device_id: &str, force_play: bool) -> Result<()> {
        let body = json!({ "device_ids": [device_id], "play": force_play });
        self.send(Method::PUT, "/me/player", &[], Some(body)).await?;
        Ok(())
    }

    async fn start(&self, device_id: &str, target: &PlaybackTarget) -> Result<()> {
        let body = match target {
            PlaybackTarget::Track(uri) => json!({ "uris": [uri] }),
            PlaybackTarget::Context(uri) => json!({ "context_uri": uri }),
        };
        self.send(
            Method::PUT,
            "/me/player/play",
            &[("device_id", device_id)],
            Some(body),
        )
        .await?;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.send(Method::PUT, "/me/player/pause", &[], None).await?;
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        self.send(Method::PUT, "/me/player/play", &[], Some(json!({})))
            .await?;
        Ok(())
    }

    async fn next(&self) -> Result<()> {
        self.send(Method::POST, "/me/player/next", &[], None).await?;
        Ok(())
    }

    async fn previous(&self) -> Result<()> {
        self.send(Method::POST, "/me/player/previous", &[], None)
            .await?;
        Ok(())
    }

    async fn current_state(&self) -> Result<Option<PlaybackStatus>> {
        let response = self.send(Method::GET, "/me/player", &[], None).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let status = response
            .json::<PlaybackStatus>()
            .await
            .map_err(|e| PlayerError::BackendUnavailable(format!("Invalid playback state: {}", e)))?;
        Ok(Some(status))
    }
}
