//! # nfcbox Player Library
//!
//! Runtime control loop of the NFC music box: reads tags and transport
//! buttons, resolves tags to media through the tag registry, and drives the
//! remote playback backend.
//!
//! Data flow per tick:
//! sampler → debounce/dedup filter → resolver (tags only) → playback controller.

pub mod backend;
pub mod control_loop;
pub mod controller;
pub mod error;
pub mod filter;
pub mod hardware;
pub mod resolver;
pub mod sampler;
pub mod session;

pub use control_loop::{ControlLoop, TagDisposition, TickSummary};
pub use controller::{ControllerState, PlayFailure, PlayResult, PlayStep, PlaybackController};
pub use error::{ErrorKind, PlayerError, Result};
pub use session::{Button, ButtonEvent, PlaybackSession, TagEvent};
