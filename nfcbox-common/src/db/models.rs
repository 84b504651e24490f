//! Database models

use serde::{Deserialize, Serialize};

use crate::media::{MediaKind, MediaReference};

/// One row of the `tags` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagRecord {
    pub id: i64,
    pub tag_id: String,
    pub spotify_uri: String,
    pub media_type: String,
    pub comment: Option<String>,
}

impl TagRecord {
    /// Media reference the player acts on
    pub fn media_reference(&self) -> MediaReference {
        MediaReference::new(self.spotify_uri.clone(), MediaKind::parse(&self.media_type))
    }
}

/// Values written by insert and update
#[derive(Debug, Clone)]
pub struct TagFields {
    pub tag_id: String,
    pub spotify_uri: String,
    pub media_type: String,
    pub comment: Option<String>,
}
