//! Control Loop
//!
//! Single cooperative loop: sample inputs, filter, resolve new tags, drive the
//! controller, sleep. Tag handling is dispatched before button handling, and
//! buttons are handled in the fixed order Play/Pause, Next, Previous.
//!
//! Every per-tick failure ends as one log line here and never stops the loop.
//! Hardware is released exactly once on every exit path: shutdown, or a panic
//! unwinding out of a tick (through the sampler's `Drop`).

use nfcbox_common::config::TimingConfig;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::backend::PlaybackBackend;
use crate::controller::{PlayFailure, PlayStep, PlaybackController};
use crate::error::{ErrorKind, PlayerError};
use crate::filter::{dedup_tag, ButtonDebouncer};
use crate::hardware::InputHardware;
use crate::resolver::MediaResolver;
use crate::sampler::InputSampler;
use crate::session::{Button, PlaybackSession, TagEvent};

/// What happened to the tag read in one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagDisposition {
    /// Nothing on the reader, or the read failed
    NoTag,
    /// Same tag as the one already playing
    Duplicate,
    /// New tag without a registry row
    NotFound,
    /// Transfer and start both succeeded
    Started,
    /// Lookup or backend failure, or an unplayable media type
    Failed(ErrorKind),
}

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    pub tag: TagDisposition,
    /// Honored buttons in dispatch order, with whether the command succeeded
    pub buttons: Vec<(Button, bool)>,
}

pub struct ControlLoop<H, R, B>
where
    H: InputHardware,
    R: MediaResolver,
    B: PlaybackBackend,
{
    sampler: InputSampler<H>,
    debouncer: ButtonDebouncer,
    resolver: R,
    controller: PlaybackController<B>,
    session: PlaybackSession,
    timing: TimingConfig,
}

impl<H, R, B> ControlLoop<H, R, B>
where
    H: InputHardware,
    R: MediaResolver,
    B: PlaybackBackend,
{
    pub fn new(
        sampler: InputSampler<H>,
        resolver: R,
        controller: PlaybackController<B>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            sampler,
            debouncer: ButtonDebouncer::new(timing.debounce),
            resolver,
            controller,
            session: PlaybackSession::new(),
            timing,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn controller(&self) -> &PlaybackController<B> {
        &self.controller
    }

    pub fn debouncer(&self) -> &ButtonDebouncer {
        &self.debouncer
    }

    /// Run until `shutdown` completes, then release hardware
    ///
    /// A tick in progress when `shutdown` fires is abandoned.
    pub async fn run<F>(mut self, shutdown: F) -> PlaybackSession
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Ready. Scan a tag or press a button.");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Exiting gracefully...");
                    break;
                }
                _ = self.iterate() => {}
            }
        }

        self.sampler.release();
        self.session
    }

    /// One tick followed by the polling sleep
    async fn iterate(&mut self) {
        self.tick().await;
        tokio::time::sleep(self.timing.poll_interval).await;
    }

    /// Sample, filter, dispatch
    pub async fn tick(&mut self) -> TickSummary {
        let sample = self.sampler.poll().await;

        let tag = match sample.tag {
            None => TagDisposition::NoTag,
            Some(tag) => match dedup_tag(&self.session, tag, sample.observed_at) {
                Some(event) => self.handle_tag(event).await,
                None => {
                    debug!("Duplicate scan detected; ignoring");
                    TagDisposition::Duplicate
                }
            },
        };

        let mut buttons = Vec::new();
        for event in self.debouncer.filter(&sample.pressed, sample.observed_at) {
            let ok = match self.controller.handle_button(event.button).await {
                Ok(()) => true,
                Err(e) => {
                    self.record_failure(&e);
                    warn!(button = event.button.label(), "Transport command failed: {}", e);
                    false
                }
            };
            buttons.push((event.button, ok));

            // Hold off after a press so one push is not read twice
            tokio::time::sleep(self.timing.debounce).await;
        }

        TickSummary { tag, buttons }
    }

    async fn handle_tag(&mut self, event: TagEvent) -> TagDisposition {
        let tag = event.tag_identifier;
        info!(tag = %tag, "Tag scanned");

        let media = match self.resolver.resolve(&tag).await {
            Ok(Some(media)) => media,
            Ok(None) => {
                let e = PlayerError::RegistryMiss(tag);
                warn!("{}", e);
                self.record_failure(&e);
                return TagDisposition::NotFound;
            }
            Err(e) => {
                warn!(tag = %tag, "Registry lookup failed: {}", e);
                self.record_failure(&e);
                return TagDisposition::Failed(e.kind());
            }
        };

        info!(tag = %tag, "Playing {}: {}", media.kind, media.uri);
        match self.controller.play_media(&media).await {
            Ok(()) => {
                self.session.last_tag_identifier = Some(tag);
                self.session.device_ready = true;
                self.session.last_error = None;
                TagDisposition::Started
            }
            Err(PlayFailure {
                step: PlayStep::Validate,
                error,
            }) => {
                // Rescanning cannot fix the row; latch the tag to stop retries
                warn!(tag = %tag, "{}", error);
                self.session.last_tag_identifier = Some(tag);
                self.record_failure(&error);
                TagDisposition::Failed(error.kind())
            }
            Err(PlayFailure { step, error }) => {
                // Leave the latch alone so a rescan retries
                if step == PlayStep::Transfer {
                    warn!(tag = %tag, "Couldn't transfer playback. Is the speaker online? {}", error);
                } else {
                    warn!(tag = %tag, "Error starting playback: {}", error);
                }
                self.session.device_ready = false;
                self.record_failure(&error);
                TagDisposition::Failed(error.kind())
            }
        }
    }

    fn record_failure(&mut self, error: &PlayerError) {
        self.session.last_error = Some(error.kind());
    }
}
