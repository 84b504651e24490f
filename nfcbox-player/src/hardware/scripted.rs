//! Deterministic frame-by-frame input driver
//!
//! Each call to `read_tag` advances to the next frame; button levels are
//! answered from the current frame. Once the script runs out every frame is
//! idle (no tag, nothing pressed).

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{InputHardware, PinLevel};
use crate::{PlayerError, Result};

/// What the reader reports in one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRead {
    Absent,
    Present(String),
    Fails(String),
}

/// Reader and button state for one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFrame {
    pub tag: TagRead,
    pub pressed_pins: HashSet<u8>,
}

impl ScriptFrame {
    pub fn idle() -> Self {
        Self {
            tag: TagRead::Absent,
            pressed_pins: HashSet::new(),
        }
    }

    pub fn tag(id: impl Into<String>) -> Self {
        Self {
            tag: TagRead::Present(id.into()),
            ..Self::idle()
        }
    }

    pub fn read_error(message: impl Into<String>) -> Self {
        Self {
            tag: TagRead::Fails(message.into()),
            ..Self::idle()
        }
    }

    /// Hold `pin` low during this frame
    pub fn press(mut self, pin: u8) -> Self {
        self.pressed_pins.insert(pin);
        self
    }
}

/// Replays a fixed list of frames
pub struct ScriptedInput {
    frames: VecDeque<ScriptFrame>,
    current: ScriptFrame,
    cleanups: Arc<AtomicUsize>,
}

impl ScriptedInput {
    pub fn new(frames: impl IntoIterator<Item = ScriptFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            current: ScriptFrame::idle(),
            cleanups: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of `cleanup` calls, readable after the driver is moved
    pub fn cleanup_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.cleanups)
    }

    /// Frames not yet consumed
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl InputHardware for ScriptedInput {
    async fn read_tag(&mut self) -> Result<Option<String>> {
        self.current = self.frames.pop_front().unwrap_or_else(ScriptFrame::idle);
        match &self.current.tag {
            TagRead::Absent => Ok(None),
            TagRead::Present(id) => Ok(Some(id.clone())),
            TagRead::Fails(message) => Err(PlayerError::HardwareRead(message.clone())),
        }
    }

    fn read_button_level(&mut self, pin: u8) -> PinLevel {
        if self.current.pressed_pins.contains(&pin) {
            PinLevel::Low
        } else {
            PinLevel::High
        }
    }

    fn cleanup(&mut self) {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}
