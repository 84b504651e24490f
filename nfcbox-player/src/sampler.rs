//! Input Sampler
//!
//! Turns hardware polling into one [`RawSample`] per tick. A failed tag read
//! is not an error at this level: it is logged and reported as "no tag".
//!
//! The sampler owns the hardware and releases it exactly once, either through
//! [`InputSampler::release`] or when dropped (including while unwinding).

use nfcbox_common::config::ButtonPins;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::hardware::InputHardware;
use crate::session::Button;

/// Which GPIO line a button is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonBinding {
    pub button: Button,
    pub pin: u8,
}

/// Ordered button table, in dispatch order
pub fn button_table(pins: &ButtonPins) -> [ButtonBinding; 3] {
    [
        ButtonBinding {
            button: Button::PlayPause,
            pin: pins.play_pause,
        },
        ButtonBinding {
            button: Button::Next,
            pin: pins.next,
        },
        ButtonBinding {
            button: Button::Previous,
            pin: pins.previous,
        },
    ]
}

/// Everything read from hardware in one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    pub tag: Option<String>,
    /// Buttons read as pressed, in table order
    pub pressed: Vec<Button>,
    pub observed_at: Instant,
}

pub struct InputSampler<H: InputHardware> {
    hardware: H,
    bindings: [ButtonBinding; 3],
    released: bool,
}

impl<H: InputHardware> InputSampler<H> {
    pub fn new(hardware: H, pins: &ButtonPins) -> Self {
        Self {
            hardware,
            bindings: button_table(pins),
            released: false,
        }
    }

    pub fn bindings(&self) -> &[ButtonBinding; 3] {
        &self.bindings
    }

    /// Read the tag reader, then every button line
    pub async fn poll(&mut self) -> RawSample {
        let tag = match self.hardware.read_tag().await {
            Ok(tag) => tag,
            Err(e) => {
                debug!("Skipping tag this tick: {}", e);
                None
            }
        };

        let mut pressed = Vec::new();
        for binding in &self.bindings {
            if self.hardware.read_button_level(binding.pin).is_pressed() {
                pressed.push(binding.button);
            }
        }

        RawSample {
            tag,
            pressed,
            observed_at: Instant::now(),
        }
    }

    /// Release the hardware; later calls are no-ops
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.hardware.cleanup();
        info!("Hardware released");
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<H: InputHardware> Drop for InputSampler<H> {
    fn drop(&mut self) {
        self.release();
    }
}
