//! Media Resolver
//!
//! Point-read of the tag registry keyed by tag identifier. A miss is
//! `Ok(None)`; only a failing lookup is an error.

use async_trait::async_trait;
use nfcbox_common::db::find_by_tag_id;
use nfcbox_common::MediaReference;
use sqlx::SqlitePool;
use tracing::debug;

use crate::Result;

/// Maps a tag identifier to the media it should play
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, tag_identifier: &str) -> Result<Option<MediaReference>>;
}

/// Resolver backed by the SQLite tag registry
#[derive(Clone)]
pub struct RegistryResolver {
    pool: SqlitePool,
}

impl RegistryResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaResolver for RegistryResolver {
    async fn resolve(&self, tag_identifier: &str) -> Result<Option<MediaReference>> {
        let record = find_by_tag_id(&self.pool, tag_identifier).await?;
        debug!(tag = %tag_identifier, found = record.is_some(), "Registry lookup");
        Ok(record.map(|r| r.media_reference()))
    }
}
