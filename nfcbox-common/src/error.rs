//! Errors shared by the player and the registry service

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Tag registry query or connection failure
    #[error("Tag registry error: {0}")]
    Database(#[from] sqlx::Error),

    /// Config file or database directory could not be read or created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed config file, bad value, or missing required setting
    #[error("Configuration error: {0}")]
    Config(String),

    /// No registry row with the given row id
    #[error("Not found: {0}")]
    NotFound(String),
}
