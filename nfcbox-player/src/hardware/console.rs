//! Bench driver reading reader and button activity from stdin
//!
//! Commands, one per line:
//!
//! | Line         | Effect                                        |
//! |--------------|-----------------------------------------------|
//! | `tag <id>`   | place tag `<id>` on the reader (stays there)  |
//! | `remove`     | take the tag off the reader                   |
//! | `play`, `p`  | press Play/Pause for one poll                 |
//! | `next`, `n`  | press Next for one poll                       |
//! | `prev`, `b`  | press Previous for one poll                   |

use async_trait::async_trait;
use nfcbox_common::config::ButtonPins;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info};

use super::{InputHardware, PinLevel};
use crate::session::Button;
use crate::{PlayerError, Result};

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    PlaceTag(String),
    RemoveTag,
    Press(Button),
    Nothing,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let mut words = line.split_whitespace();
        let command = match words.next() {
            None => return Ok(ConsoleCommand::Nothing),
            Some(word) => word.to_ascii_lowercase(),
        };

        match command.as_str() {
            "tag" => match (words.next(), words.next()) {
                (Some(id), None) => Ok(ConsoleCommand::PlaceTag(id.to_string())),
                _ => Err(format!("expected 'tag <id>', got '{}'", line.trim())),
            },
            "remove" => Ok(ConsoleCommand::RemoveTag),
            "play" | "pause" | "p" => Ok(ConsoleCommand::Press(Button::PlayPause)),
            "next" | "n" => Ok(ConsoleCommand::Press(Button::Next)),
            "prev" | "previous" | "b" => Ok(ConsoleCommand::Press(Button::Previous)),
            _ => Err(format!("unrecognized command '{}'", line.trim())),
        }
    }
}

/// Stdin-driven stand-in for the MFRC522 reader and button GPIO
pub struct ConsoleInput {
    lines: Lines<BufReader<Stdin>>,
    read_timeout: Duration,
    pins: ButtonPins,
    tag_on_reader: Option<String>,
    pending_press: Option<u8>,
    stdin_closed: bool,
}

impl ConsoleInput {
    pub fn new(pins: ButtonPins, read_timeout: Duration) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            read_timeout,
            pins,
            tag_on_reader: None,
            pending_press: None,
            stdin_closed: false,
        }
    }

    fn pin_for(&self, button: Button) -> u8 {
        match button {
            Button::PlayPause => self.pins.play_pause,
            Button::Next => self.pins.next,
            Button::Previous => self.pins.previous,
        }
    }

    fn apply(&mut self, command: ConsoleCommand) {
        match command {
            ConsoleCommand::PlaceTag(id) => self.tag_on_reader = Some(id),
            ConsoleCommand::RemoveTag => self.tag_on_reader = None,
            ConsoleCommand::Press(button) => self.pending_press = Some(self.pin_for(button)),
            ConsoleCommand::Nothing => {}
        }
    }
}

#[async_trait]
impl InputHardware for ConsoleInput {
    async fn read_tag(&mut self) -> Result<Option<String>> {
        if self.stdin_closed {
            tokio::time::sleep(self.read_timeout).await;
            return Ok(self.tag_on_reader.clone());
        }

        // Lines::next_line is cancel safe, so a timeout loses no input
        match tokio::time::timeout(self.read_timeout, self.lines.next_line()).await {
            Err(_elapsed) => {}
            Ok(Ok(Some(line))) => {
                let command = ConsoleCommand::parse(&line).map_err(PlayerError::HardwareRead)?;
                debug!(?command, "Console input");
                self.apply(command);
            }
            Ok(Ok(None)) => {
                info!("Console input closed; reader state is now fixed");
                self.stdin_closed = true;
            }
            Ok(Err(e)) => return Err(PlayerError::HardwareRead(e.to_string())),
        }

        Ok(self.tag_on_reader.clone())
    }

    fn read_button_level(&mut self, pin: u8) -> PinLevel {
        if self.pending_press == Some(pin) {
            self.pending_press = None;
            PinLevel::Low
        } else {
            PinLevel::High
        }
    }

    fn cleanup(&mut self) {
        self.tag_on_reader = None;
        self.pending_press = None;
        info!("Console input released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ConsoleCommand::parse("tag 584190"),
            Ok(ConsoleCommand::PlaceTag("584190".to_string()))
        );
        assert_eq!(ConsoleCommand::parse("  REMOVE "), Ok(ConsoleCommand::RemoveTag));
        assert_eq!(
            ConsoleCommand::parse("p"),
            Ok(ConsoleCommand::Press(Button::PlayPause))
        );
        assert_eq!(ConsoleCommand::parse("next"), Ok(ConsoleCommand::Press(Button::Next)));
        assert_eq!(
            ConsoleCommand::parse("prev"),
            Ok(ConsoleCommand::Press(Button::Previous))
        );
        assert_eq!(ConsoleCommand::parse(""), Ok(ConsoleCommand::Nothing));
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(ConsoleCommand::parse("tag").is_err());
        assert!(ConsoleCommand::parse("tag a b").is_err());
        assert!(ConsoleCommand::parse("volume up").is_err());
    }
}
