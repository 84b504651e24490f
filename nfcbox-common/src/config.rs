//! Configuration loading
//!
//! Every setting is resolved in the same priority order:
//! 1. Environment variable
//! 2. TOML config file
//! 3. Compiled default
//!
//! The config file itself is located by (highest priority first) the
//! `--config` command-line argument, the `NFCBOX_CONFIG` environment
//! variable, `~/.config/nfcbox/config.toml`, then `/etc/nfcbox/config.toml`.
//! A missing file is not an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "NFCBOX_CONFIG";

/// Defaults used when neither environment nor config file set a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub database_path: PathBuf,
    pub token_cache_path: PathBuf,
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
    pub settle_ms: u64,
    pub read_timeout_ms: u64,
    pub pin_play_pause: u8,
    pub pin_next: u8,
    pub pin_previous: u8,
    pub api_base_url: String,
    pub accounts_base_url: String,
    pub registry_bind_addr: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("nfcbox"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/nfcbox"));
        let cache_dir = dirs::cache_dir()
            .map(|d| d.join("nfcbox"))
            .unwrap_or_else(|| PathBuf::from("/var/cache/nfcbox"));

        Self {
            database_path: data_dir.join("nfc_tags.db"),
            token_cache_path: cache_dir.join("token.json"),
            debounce_ms: 300,
            poll_interval_ms: 100,
            settle_ms: 1000,
            read_timeout_ms: 250,
            // BCM numbering
            pin_play_pause: 22,
            pin_next: 27,
            pin_previous: 17,
            api_base_url: "https://api.spotify.com/v1".to_string(),
            accounts_base_url: "https://accounts.spotify.com".to_string(),
            registry_bind_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

/// On-disk TOML layout; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub device_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub database_path: Option<PathBuf>,
    pub token_cache_path: Option<PathBuf>,
    pub timing: TomlTiming,
    pub pins: TomlPins,
    pub backend: TomlBackend,
    pub registry: TomlRegistry,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlTiming {
    pub debounce_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlPins {
    pub play_pause: Option<u8>,
    pub next: Option<u8>,
    pub previous: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlBackend {
    pub api_base_url: Option<String>,
    pub accounts_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlRegistry {
    pub bind_addr: Option<String>,
}

impl TomlConfig {
    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }
}

/// Poll cadence and the delays the control loop enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Minimum time between two honored presses of one button
    pub debounce: Duration,
    /// Sleep at the end of every loop iteration
    pub poll_interval: Duration,
    /// Wait between device transfer and start of playback
    pub settle: Duration,
    /// Upper bound on one tag read
    pub read_timeout: Duration,
}

/// GPIO pins of the three transport buttons (BCM numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPins {
    pub play_pause: u8,
    pub next: u8,
    pub previous: u8,
}

/// Base URLs of the playback backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoints {
    pub api_base_url: String,
    pub accounts_base_url: String,
}

/// Settings required before the player may start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub device_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub device_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub database_path: PathBuf,
    pub token_cache_path: PathBuf,
    pub timing: TimingConfig,
    pub pins: ButtonPins,
    pub backend: BackendEndpoints,
    pub registry_bind_addr: String,
}

impl Config {
    /// Load from the process environment and the resolved config file
    pub fn load(cli_config: Option<&Path>) -> Result<Self> {
        let toml_config = match resolve_config_file(cli_config) {
            Some(path) => {
                info!("Loading config file: {}", path.display());
                TomlConfig::from_file(&path)?
            }
            None => {
                warn!("No config file found, using environment and defaults");
                TomlConfig::default()
            }
        };

        Self::from_sources(
            &toml_config,
            &CompiledDefaults::for_current_platform(),
            |key| std::env::var(key).ok(),
        )
    }

    /// Merge environment, file and defaults
    ///
    /// `env` returns the value of an environment variable, if set.
    pub fn from_sources<F>(toml: &TomlConfig, defaults: &CompiledDefaults, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |keys: &[&str], file: &Option<String>| -> Option<String> {
            first_env(&env, keys).or_else(|| file.clone().filter(|v| !v.is_empty()))
        };

        let millis = |key: &str, file: Option<u64>, default: u64| -> Result<Duration> {
            let ms = match first_env(&env, &[key]) {
                Some(raw) => parse_env(key, &raw)?,
                None => file.unwrap_or(default),
            };
            Ok(Duration::from_millis(ms))
        };

        let timing = TimingConfig {
            debounce: millis("NFCBOX_DEBOUNCE_MS", toml.timing.debounce_ms, defaults.debounce_ms)?,
            poll_interval: millis(
                "NFCBOX_POLL_INTERVAL_MS",
                toml.timing.poll_interval_ms,
                defaults.poll_interval_ms,
            )?,
            settle: millis("NFCBOX_SETTLE_MS", toml.timing.settle_ms, defaults.settle_ms)?,
            read_timeout: millis(
                "NFCBOX_READ_TIMEOUT_MS",
                toml.timing.read_timeout_ms,
                defaults.read_timeout_ms,
            )?,
        };

        let pins = ButtonPins {
            play_pause: toml.pins.play_pause.unwrap_or(defaults.pin_play_pause),
            next: toml.pins.next.unwrap_or(defaults.pin_next),
            previous: toml.pins.previous.unwrap_or(defaults.pin_previous),
        };
        if pins.play_pause == pins.next
            || pins.play_pause == pins.previous
            || pins.next == pins.previous
        {
            return Err(Error::Config(format!(
                "Button pins must be distinct (play/pause {}, next {}, previous {})",
                pins.play_pause, pins.next, pins.previous
            )));
        }

        let backend = BackendEndpoints {
            api_base_url: toml
                .backend
                .api_base_url
                .clone()
                .unwrap_or_else(|| defaults.api_base_url.clone()),
            accounts_base_url: toml
                .backend
                .accounts_base_url
                .clone()
                .unwrap_or_else(|| defaults.accounts_base_url.clone()),
        };

        Ok(Self {
            device_id: string(&["DEVICE_ID"], &toml.device_id),
            client_id: string(&["CLIENT_ID", "SPOTIPY_CLIENT_ID"], &toml.client_id),
            client_secret: string(&["CLIENT_SECRET", "SPOTIPY_CLIENT_SECRET"], &toml.client_secret),
            redirect_uri: string(&["REDIRECT_URI", "SPOTIPY_REDIRECT_URI"], &toml.redirect_uri),
            database_path: first_env(&env, &["NFCBOX_DATABASE"])
                .map(PathBuf::from)
                .or_else(|| toml.database_path.clone())
                .unwrap_or_else(|| defaults.database_path.clone()),
            token_cache_path: first_env(&env, &["NFCBOX_TOKEN_CACHE"])
                .map(PathBuf::from)
                .or_else(|| toml.token_cache_path.clone())
                .unwrap_or_else(|| defaults.token_cache_path.clone()),
            timing,
            pins,
            backend,
            registry_bind_addr: first_env(&env, &["NFCBOX_BIND"])
                .or_else(|| toml.registry.bind_addr.clone())
                .unwrap_or_else(|| defaults.registry_bind_addr.clone()),
        })
    }

    /// Backend credentials and target device; all four must be present
    pub fn credentials(&self) -> Result<Credentials> {
        let mut missing = Vec::new();
        let mut take = |value: &Option<String>, name: &'static str| {
            if value.is_none() {
                missing.push(name);
            }
            value.clone().unwrap_or_default()
        };

        let credentials = Credentials {
            device_id: take(&self.device_id, "DEVICE_ID"),
            client_id: take(&self.client_id, "CLIENT_ID"),
            client_secret: take(&self.client_secret, "CLIENT_SECRET"),
            redirect_uri: take(&self.redirect_uri, "REDIRECT_URI"),
        };

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )));
        }
        Ok(credentials)
    }
}

fn first_env<F>(env: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| env(key))
        .find(|value| !value.trim().is_empty())
}

fn parse_env(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{} must be a number of milliseconds, got '{}'", key, raw)))
}

/// Locate the config file, if any
pub fn resolve_config_file(cli_config: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_config {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("nfcbox").join("config.toml"));
    let system_config = PathBuf::from("/etc/nfcbox/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|path| path.exists())
}
