//! Hardware input abstraction
//!
//! The tag reader and the button GPIO lines are owned exclusively by the
//! [`InputSampler`](crate::sampler::InputSampler) through this trait; no other
//! component touches hardware.
//!
//! | Driver            | Source                                   |
//! |-------------------|------------------------------------------|
//! | [`ConsoleInput`]  | stdin commands, for bench use            |
//! | [`ScriptedInput`] | fixed frame list, for tests and dry runs |

use async_trait::async_trait;

use crate::Result;

pub mod console;
pub mod scripted;

pub use console::{ConsoleCommand, ConsoleInput};
pub use scripted::{ScriptFrame, ScriptedInput, TagRead};

/// Electrical level of a button input
///
/// Buttons are wired to ground with pull-ups, so `Low` means pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    pub fn is_pressed(self) -> bool {
        self == PinLevel::Low
    }
}

/// Tag reader plus button lines
#[async_trait]
pub trait InputHardware: Send {
    /// Read the tag currently on the reader
    ///
    /// Must return within a bounded time. `Ok(None)` means no tag;
    /// `Err(PlayerError::HardwareRead)` means unreadable or malformed data.
    async fn read_tag(&mut self) -> Result<Option<String>>;

    /// Sample one button line
    fn read_button_level(&mut self, pin: u8) -> PinLevel;

    /// Return pins and reader to a safe state
    fn cleanup(&mut self);
}
