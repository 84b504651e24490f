//! Playback Controller
//!
//! Converts resolved media and honored button presses into ordered backend
//! calls.
//!
//! ```text
//!   Idle ──new media──▶ DeviceTransferring ──settle, start──▶ Playing
//!    ▲                        │ transfer fails                  │
//!    └────────────────────────┴────────── start fails ◀─────────┘
//! ```
//!
//! A failed transport command leaves the state where it was.
//!
//! The controller never touches the playback session; it reports success or
//! the error and the control loop records the outcome.

use nfcbox_common::MediaReference;
use std::time::Duration;
use tracing::{debug, info};

use crate::backend::{PlaybackBackend, PlaybackTarget};
use crate::session::Button;
use crate::{PlayerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No confirmed active device
    Idle,
    /// Transfer issued, waiting to start
    DeviceTransferring,
    /// Device confirmed, last command accepted
    Playing,
}

/// Stage of [`PlaybackController::play_media`] that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayStep {
    /// Media kind cannot be played; no backend call was made
    Validate,
    /// Device transfer failed; the speaker is likely offline
    Transfer,
    /// Device accepted the transfer but refused to start the media
    Start,
}

#[derive(Debug)]
pub struct PlayFailure {
    pub step: PlayStep,
    pub error: PlayerError,
}

impl PlayFailure {
    fn at(step: PlayStep) -> impl FnOnce(PlayerError) -> Self {
        move |error| Self { step, error }
    }
}

pub type PlayResult = std::result::Result<(), PlayFailure>;

pub struct PlaybackController<B: PlaybackBackend> {
    backend: B,
    device_id: String,
    settle: Duration,
    state: ControllerState,
}

impl<B: PlaybackBackend> PlaybackController<B> {
    pub fn new(backend: B, device_id: impl Into<String>, settle: Duration) -> Self {
        Self {
            backend,
            device_id: device_id.into(),
            settle,
            state: ControllerState::Idle,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Transfer playback to the configured device, then start `media`
    ///
    /// An unrecognized media kind fails before any backend call. The failure
    /// names the step that went wrong.
    pub async fn play_media(&mut self, media: &MediaReference) -> PlayResult {
        let target =
            PlaybackTarget::for_media(media).map_err(PlayFailure::at(PlayStep::Validate))?;

        self.state = ControllerState::DeviceTransferring;
        if let Err(e) = self.backend.transfer(&self.device_id, true).await {
            self.state = ControllerState::Idle;
            return Err(PlayFailure::at(PlayStep::Transfer)(e));
        }

        // Let the backend finish switching devices
        tokio::time::sleep(self.settle).await;

        info!(uri = %target.uri(), kind = %media.kind, "Starting playback");
        match self.backend.start(&self.device_id, &target).await {
            Ok(()) => {
                self.state = ControllerState::Playing;
                Ok(())
            }
            Err(e) => {
                self.state = ControllerState::Idle;
                Err(PlayFailure::at(PlayStep::Start)(e))
            }
        }
    }

    /// Issue the transport command for an honored press
    ///
    /// Play/Pause asks the backend whether it is playing on every press; no
    /// intended state is kept locally.
    pub async fn handle_button(&mut self, button: Button) -> Result<()> {
        info!("{} button pressed", button.label());

        let result = match button {
            Button::PlayPause => self.toggle_play_pause().await,
            Button::Next => self.backend.next().await,
            Button::Previous => self.backend.previous().await,
        };

        // A failed command leaves local state alone; the next press starts over
        if result.is_ok() {
            self.state = ControllerState::Playing;
        }
        result
    }

    async fn toggle_play_pause(&self) -> Result<()> {
        let status = self.backend.current_state().await?;
        let playing = status.as_ref().map(|s| s.is_playing).unwrap_or(false);
        debug!(
            playing,
            device = status
                .as_ref()
                .and_then(|s| s.device.as_ref())
                .map(|d| d.name.as_str())
                .unwrap_or("-"),
            "Live playback state"
        );

        if playing {
            self.backend.pause().await
        } else {
            self.backend.resume().await
        }
    }
}
