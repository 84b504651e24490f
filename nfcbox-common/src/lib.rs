//! # nfcbox Common Library
//!
//! Shared code for the nfcbox player and registry services:
//! - Tag registry schema and queries
//! - Media link parsing and media types
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod media;

pub use error::{Error, Result};
pub use media::{MediaKind, MediaLink, MediaReference};
