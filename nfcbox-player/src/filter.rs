//! Debounce & Dedup Filter
//!
//! Two independent policies:
//! - tags: a scan equal to the session's latched tag is suppressed. This is a
//!   single-slot latch, not a time window.
//! - buttons: a press is honored only when more than the debounce window has
//!   passed since that button's last honored press.

use std::time::Duration;
use tokio::time::Instant;

use crate::session::{Button, ButtonEvent, PlaybackSession, TagEvent};

/// Pass `tag` through unless it is the tag already playing
pub fn dedup_tag(session: &PlaybackSession, tag: String, observed_at: Instant) -> Option<TagEvent> {
    if session.is_duplicate(&tag) {
        return None;
    }
    Some(TagEvent {
        tag_identifier: tag,
        observed_at,
    })
}

/// Debounce bookkeeping for one button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceState {
    pub is_pressed: bool,
    /// Time of the last honored press; `None` until the first one
    pub last_transition_at: Option<Instant>,
}

/// Per-button debounce for all three buttons
#[derive(Debug, Clone)]
pub struct ButtonDebouncer {
    window: Duration,
    states: [(Button, DebounceState); 3],
}

impl ButtonDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            states: Button::ALL.map(|button| (button, DebounceState::default())),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn state(&self, button: Button) -> DebounceState {
        self.states
            .iter()
            .find(|(b, _)| *b == button)
            .map(|(_, state)| *state)
            .unwrap_or_default()
    }

    /// Honored presses for one sample, in dispatch order
    pub fn filter(&mut self, pressed: &[Button], now: Instant) -> Vec<ButtonEvent> {
        let mut honored = Vec::new();

        for (button, state) in self.states.iter_mut() {
            state.is_pressed = pressed.contains(button);
            if !state.is_pressed {
                continue;
            }

            let settled = match state.last_transition_at {
                None => true,
                Some(last) => now.saturating_duration_since(last) > self.window,
            };
            if settled {
                state.last_transition_at = Some(now);
                honored.push(ButtonEvent {
                    button: *button,
                    observed_at: now,
                });
            }
        }

        honored
    }
}
