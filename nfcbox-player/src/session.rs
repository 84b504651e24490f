//! Events produced each tick and the session state that outlives them

use tokio::time::Instant;

use crate::error::ErrorKind;

/// The three transport buttons, in dispatch order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    PlayPause,
    Next,
    Previous,
}

impl Button {
    /// Fixed dispatch order when several buttons are honored in one tick
    pub const ALL: [Button; 3] = [Button::PlayPause, Button::Next, Button::Previous];

    pub fn label(&self) -> &'static str {
        match self {
            Button::PlayPause => "Play/Pause",
            Button::Next => "Next Track",
            Button::Previous => "Previous Track",
        }
    }
}

/// A non-duplicate tag scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEvent {
    pub tag_identifier: String,
    pub observed_at: Instant,
}

/// An honored (debounced) button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub observed_at: Instant,
}

/// State owned by the control loop for the life of the process
///
/// Mutated in place by the control loop only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSession {
    /// Single-slot duplicate-scan latch
    pub last_tag_identifier: Option<String>,
    /// Last transfer and start both succeeded
    pub device_ready: bool,
    /// Class of the most recent per-tick failure
    pub last_error: Option<ErrorKind>,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `tag` is the tag currently latched as playing
    pub fn is_duplicate(&self, tag: &str) -> bool {
        self.last_tag_identifier.as_deref() == Some(tag)
    }
}
