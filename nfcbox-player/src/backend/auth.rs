//! Backend authentication lifecycle
//!
//! Tokens come from the authorization-code flow (`nfcbox-player authorize`)
//! and are kept in a JSON cache file. At startup the cache must hold a usable
//! token, or one that can be refreshed; otherwise the player does not start.
//! While running, the access token is refreshed shortly before it expires.

use chrono::Utc;
use nfcbox_common::config::{BackendEndpoints, Credentials};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{check_status, transport_error};
use crate::{PlayerError, Result};

/// Scopes needed to read and control playback
pub const SCOPES: &str = "user-read-playback-state user-modify-playback-state";

/// Refresh this many seconds before the token actually expires
const REFRESH_MARGIN_SECS: i64 = 60;

/// Refresh attempts at startup while the backend is unreachable
const STARTUP_ATTEMPTS: u32 = 3;

/// Persisted token state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCache {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenCache {
    /// `Ok(None)` when no cache file exists yet
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let cache = serde_json::from_str(&content).map_err(|e| {
            PlayerError::StartupAuth(format!("Corrupt token cache {}: {}", path.display(), e))
        })?;
        Ok(Some(cache))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| PlayerError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    pub fn expires_soon(&self, now: i64) -> bool {
        self.expires_at - REFRESH_MARGIN_SECS <= now
    }

    fn from_response(response: TokenResponse, previous: Option<&TokenCache>, now: i64) -> Self {
        Self {
            access_token: response.access_token,
            // Refresh responses usually omit the refresh token; keep the old one
            refresh_token: response
                .refresh_token
                .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
            expires_at: now + response.expires_in,
            scope: response.scope.or_else(|| previous.and_then(|p| p.scope.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

/// Client-credential holder and token source for [`SpotifyClient`](super::SpotifyClient)
pub struct SpotifyAuth {
    http: reqwest::Client,
    authorize_endpoint: String,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    cache_path: PathBuf,
    token: Mutex<Option<TokenCache>>,
}

impl SpotifyAuth {
    pub fn new(
        http: reqwest::Client,
        credentials: &Credentials,
        endpoints: &BackendEndpoints,
        cache_path: PathBuf,
    ) -> Self {
        let accounts = endpoints.accounts_base_url.trim_end_matches('/');
        Self {
            http,
            authorize_endpoint: format!("{}/authorize", accounts),
            token_endpoint: format!("{}/api/token", accounts),
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            redirect_uri: credentials.redirect_uri.clone(),
            cache_path,
            token: Mutex::new(None),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Load and, if needed, refresh the cached token
    ///
    /// Every failure here is [`PlayerError::StartupAuth`]. An unreachable
    /// accounts service is retried a few times first.
    pub async fn initialize(&self) -> Result<()> {
        let cached = TokenCache::load(&self.cache_path).map_err(|e| match e {
            PlayerError::StartupAuth(msg) => PlayerError::StartupAuth(msg),
            other => PlayerError::StartupAuth(other.to_string()),
        })?;

        let cached = cached.ok_or_else(|| {
            PlayerError::StartupAuth(format!(
                "No token cache at {}; run `nfcbox-player authorize` first",
                self.cache_path.display()
            ))
        })?;

        if !cached.expires_soon(Utc::now().timestamp()) {
            info!("Using cached backend token");
            *self.token.lock().await = Some(cached);
            return Ok(());
        }

        let mut attempt = 0;
        let mut backoff = Duration::from_secs(2);
        loop {
            attempt += 1;
            match self.refresh(&cached).await {
                Ok(refreshed) => {
                    info!(attempt, "Refreshed backend token");
                    *self.token.lock().await = Some(refreshed);
                    return Ok(());
                }
                Err(PlayerError::BackendUnavailable(msg)) if attempt < STARTUP_ATTEMPTS => {
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Token refresh failed, will retry: {}",
                        msg
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(PlayerError::StartupAuth(e.to_string())),
            }
        }
    }

    /// Current access token, refreshed when close to expiry
    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;

        let current = guard.as_ref().ok_or_else(|| PlayerError::BackendRejected {
            status: 401,
            message: "Backend client is not authenticated".to_string(),
        })?;

        if !current.expires_soon(Utc::now().timestamp()) {
            return Ok(current.access_token.clone());
        }

        debug!("Access token expiring, refreshing");
        let refreshed = self.refresh(current).await?;
        let access_token = refreshed.access_token.clone();
        *guard = Some(refreshed);
        Ok(access_token)
    }

    async fn refresh(&self, current: &TokenCache) -> Result<TokenCache> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or_else(|| PlayerError::BackendRejected {
                status: 401,
                message: "Token expired and no refresh token is cached".to_string(),
            })?;

        let response = self
            .request_token(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .await?;
        let refreshed = TokenCache::from_response(response, Some(current), Utc::now().timestamp());

        if let Err(e) = refreshed.save(&self.cache_path) {
            warn!("Could not persist refreshed token: {}", e);
        }
        Ok(refreshed)
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response)
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(|e| PlayerError::BackendUnavailable(format!("Invalid token response: {}", e)))
    }

    /// URL the user opens to grant access
    pub fn authorize_url(&self) -> Result<String> {
        reqwest::Url::parse_with_params(
            &self.authorize_endpoint,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", SCOPES),
            ],
        )
        .map(|url| url.to_string())
        .map_err(|e| PlayerError::Config(format!("Invalid accounts URL: {}", e)))
    }

    /// Trade the code in the redirected URL for tokens and write the cache
    pub async fn exchange_code(&self, redirected_url: &str) -> Result<TokenCache> {
        let code = extract_code(redirected_url)?;
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;

        let cache = TokenCache::from_response(response, None, Utc::now().timestamp());
        cache.save(&self.cache_path)?;
        *self.token.lock().await = Some(cache.clone());
        info!("Token cache written to {}", self.cache_path.display());
        Ok(cache)
    }
}

/// `code` query parameter of the URL the accounts service redirected to
pub fn extract_code(redirected_url: &str) -> Result<String> {
    let url = reqwest::Url::parse(redirected_url.trim())
        .map_err(|e| PlayerError::StartupAuth(format!("Not a URL: {}", e)))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => {
                return Err(PlayerError::StartupAuth(format!(
                    "Authorization denied: {}",
                    value
                )))
            }
            _ => {}
        }
    }

    code.ok_or_else(|| PlayerError::StartupAuth("Redirect URL has no code parameter".to_string()))
}
