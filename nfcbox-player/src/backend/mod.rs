//! Playback backend
//!
//! The remote service that actually streams audio. The controller needs only
//! the seven operations of [`PlaybackBackend`]; [`SpotifyClient`] implements
//! them over the Spotify Web API.

use async_trait::async_trait;
use nfcbox_common::{MediaKind, MediaReference};
use serde::Deserialize;

use crate::{PlayerError, Result};

pub mod auth;
pub mod spotify;

pub use auth::{SpotifyAuth, TokenCache};
pub use spotify::SpotifyClient;

/// What a start call plays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackTarget {
    /// A single track URI
    Track(String),
    /// An album or playlist played as a context
    Context(String),
}

impl PlaybackTarget {
    /// Validate a resolved media reference before any backend call
    pub fn for_media(media: &MediaReference) -> Result<Self> {
        match &media.kind {
            MediaKind::Unrecognized(kind) => Err(PlayerError::UnknownMediaKind {
                uri: media.uri.clone(),
                kind: kind.clone(),
            }),
            kind if kind.is_context() => Ok(PlaybackTarget::Context(media.uri.clone())),
            _ => Ok(PlaybackTarget::Track(media.uri.clone())),
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            PlaybackTarget::Track(uri) | PlaybackTarget::Context(uri) => uri,
        }
    }
}

/// Subset of the backend's current playback state
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaybackStatus {
    pub is_playing: bool,
    #[serde(default)]
    pub device: Option<PlaybackDevice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaybackDevice {
    pub id: Option<String>,
    pub name: String,
}

/// Remote media-control operations
///
/// Every method may fail with `BackendUnavailable` or `BackendRejected`.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Make `device_id` the active device; idempotent
    async fn transfer(&self, device_id: &str, force_play: bool) -> Result<()>;

    async fn start(&self, device_id: &str, target: &PlaybackTarget) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn resume(&self) -> Result<()>;

    async fn next(&self) -> Result<()>;

    async fn previous(&self) -> Result<()>;

    /// `None` when nothing is active on the account
    async fn current_state(&self) -> Result<Option<PlaybackStatus>>;
}

/// Transport-level failure (DNS, connect, timeout): the backend is unreachable
pub(crate) fn transport_error(e: reqwest::Error) -> PlayerError {
    PlayerError::BackendUnavailable(e.to_string())
}

/// Pass successful responses through, classify everything else
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status.as_u16(), &body))
}

/// Server-side trouble and rate limiting are "unavailable"; the rest is a rejection
pub fn classify_status(status: u16, body: &str) -> PlayerError {
    let message = error_message(body);
    if status >= 500 || status == 429 {
        PlayerError::BackendUnavailable(format!("HTTP {}: {}", status, message))
    } else {
        PlayerError::BackendRejected { status, message }
    }
}

/// Pull the human-readable part out of an API or accounts error body
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error_description"))
                .and_then(|m| m.as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
