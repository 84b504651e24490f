//! Shared fixtures for nfcbox-player integration tests
//!
//! - `RecordingBackend`: in-memory playback backend that records every call
//! - `StaticResolver`: tag registry backed by a map
//! - `PanickingInput`: hardware driver that panics on the first tag read

#![allow(dead_code)]

use async_trait::async_trait;
use nfcbox_common::config::{ButtonPins, TimingConfig};
use nfcbox_common::{MediaKind, MediaReference};
use nfcbox_player::backend::{PlaybackBackend, PlaybackStatus, PlaybackTarget};
use nfcbox_player::hardware::{InputHardware, PinLevel};
use nfcbox_player::resolver::MediaResolver;
use nfcbox_player::{PlayerError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEVICE_ID: &str = "speaker-1";

pub const PINS: ButtonPins = ButtonPins {
    play_pause: 22,
    next: 27,
    previous: 17,
};

pub fn timing() -> TimingConfig {
    TimingConfig {
        debounce: Duration::from_millis(300),
        poll_interval: Duration::from_millis(100),
        settle: Duration::from_millis(1000),
        read_timeout: Duration::from_millis(250),
    }
}

/// Backend operations as seen by the recording backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Transfer { device_id: String, force_play: bool },
    Start { device_id: String, target: PlaybackTarget },
    Pause,
    Resume,
    Next,
    Previous,
    CurrentState,
}

/// How an injected failure surfaces
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Unavailable,
    Rejected(u16),
}

impl Failure {
    fn to_error(self) -> PlayerError {
        match self {
            Failure::Unavailable => PlayerError::BackendUnavailable("connection refused".into()),
            Failure::Rejected(status) => PlayerError::BackendRejected {
                status,
                message: "Device not found".into(),
            },
        }
    }
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
    is_playing: Option<bool>,
    failures: HashMap<&'static str, (Failure, usize)>,
}

/// In-memory backend; clones share one recorder
#[derive(Clone, Default)]
pub struct RecordingBackend {
    inner: Arc<Mutex<Recorder>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// `None` makes `current_state` report nothing active
    pub fn set_playing(&self, playing: Option<bool>) {
        self.inner.lock().unwrap().is_playing = playing;
    }

    /// Fail the next `times` calls of `operation` ("transfer", "start", "next", ...)
    pub fn fail(&self, operation: &'static str, failure: Failure, times: usize) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .insert(operation, (failure, times));
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        if let Some((failure, remaining)) = inner.failures.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(failure.to_error());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackBackend for RecordingBackend {
    async fn transfer(&self, device_id: &str, force_play: bool) -> Result<()> {
        self.record(
            "transfer",
            Call::Transfer {
                device_id: device_id.to_string(),
                force_play,
            },
        )
    }

    async fn start(&self, device_id: &str, target: &PlaybackTarget) -> Result<()> {
        self.record(
            "start",
            Call::Start {
                device_id: device_id.to_string(),
                target: target.clone(),
            },
        )
    }

    async fn pause(&self) -> Result<()> {
        self.record("pause", Call::Pause)
    }

    async fn resume(&self) -> Result<()> {
        self.record("resume", Call::Resume)
    }

    async fn next(&self) -> Result<()> {
        self.record("next", Call::Next)
    }

    async fn previous(&self) -> Result<()> {
        self.record("previous", Call::Previous)
    }

    async fn current_state(&self) -> Result<Option<PlaybackStatus>> {
        self.record("current_state", Call::CurrentState)?;
        let playing = self.inner.lock().unwrap().is_playing;
        Ok(playing.map(|is_playing| PlaybackStatus {
            is_playing,
            device: None,
        }))
    }
}

/// Registry stand-in
#[derive(Default)]
pub struct StaticResolver {
    entries: HashMap<String, MediaReference>,
    broken: bool,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: &str, uri: &str, media_type: &str) -> Self {
        self.entries
            .insert(tag.to_string(), MediaReference::new(uri, MediaKind::parse(media_type)));
        self
    }

    /// Every lookup fails as if the database were unreadable
    pub fn broken() -> Self {
        Self {
            entries: HashMap::new(),
            broken: true,
        }
    }
}

#[async_trait]
impl MediaResolver for StaticResolver {
    async fn resolve(&self, tag_identifier: &str) -> Result<Option<MediaReference>> {
        if self.broken {
            return Err(PlayerError::Registry(nfcbox_common::Error::Database(
                sqlx::Error::PoolTimedOut,
            )));
        }
        Ok(self.entries.get(tag_identifier).cloned())
    }
}

/// Driver whose tag read panics, to exercise cleanup during unwinding
pub struct PanickingInput {
    cleanups: Arc<AtomicUsize>,
}

impl PanickingInput {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let cleanups = Arc::new(AtomicUsize::new(0));
        (
            Self {
                cleanups: Arc::clone(&cleanups),
            },
            cleanups,
        )
    }
}

#[async_trait]
impl InputHardware for PanickingInput {
    async fn read_tag(&mut self) -> Result<Option<String>> {
        panic!("reader fell off the bus");
    }

    fn read_button_level(&mut self, _pin: u8) -> PinLevel {
        PinLevel::High
    }

    fn cleanup(&mut self) {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn cleanup_count(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
