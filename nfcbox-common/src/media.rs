//! Media references and share-link parsing
//!
//! A registry row stores a canonical URI (`spotify:album:<id>`) together with
//! its media type. Administrators paste share links such as
//! `https://open.spotify.com/album/<id>?si=...`; [`extract_uri_and_type`]
//! turns those into the canonical form.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static SHARE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"open\.([A-Za-z0-9-]+)\.com/(track|album|playlist)/([A-Za-z0-9]+)")
        .expect("share link pattern is valid")
});

/// Kind of media a tag points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Track,
    Album,
    Playlist,
    /// A stored value that is none of the above. Kept so the player can
    /// reject it locally instead of calling the backend.
    Unrecognized(String),
}

impl MediaKind {
    /// Parse a stored `media_type` column value
    pub fn parse(raw: &str) -> Self {
        match raw {
            "track" => MediaKind::Track,
            "album" => MediaKind::Album,
            "playlist" => MediaKind::Playlist,
            other => MediaKind::Unrecognized(other.to_string()),
        }
    }

    /// Column representation
    pub fn as_str(&self) -> &str {
        match self {
            MediaKind::Track => "track",
            MediaKind::Album => "album",
            MediaKind::Playlist => "playlist",
            MediaKind::Unrecognized(raw) => raw,
        }
    }

    /// Albums and playlists are started as a playback context
    pub fn is_context(&self) -> bool {
        matches!(self, MediaKind::Album | MediaKind::Playlist)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved media for a scanned tag (read-only copy of a registry row)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub uri: String,
    pub kind: MediaKind,
}

impl MediaReference {
    pub fn new(uri: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            uri: uri.into(),
            kind,
        }
    }
}

/// Result of parsing a share link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaLink {
    /// Canonical URI, `<service>:<type>:<id>`
    pub uri: String,
    pub kind: MediaKind,
}

/// Extract the canonical URI and media type from a share link
///
/// Returns `None` when the link has no `open.<service>.com/<type>/<id>` part.
pub fn extract_uri_and_type(link: &str) -> Option<MediaLink> {
    let captures = SHARE_LINK.captures(link)?;
    let service = captures.get(1)?.as_str();
    let media_type = captures.get(2)?.as_str();
    let id = captures.get(3)?.as_str();

    Some(MediaLink {
        uri: format!("{}:{}:{}", service, media_type, id),
        kind: MediaKind::parse(media_type),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_link() {
        let link = extract_uri_and_type("https://open.spotify.com/track/abc123").unwrap();
        assert_eq!(link.uri, "spotify:track:abc123");
        assert_eq!(link.kind, MediaKind::Track);
    }

    #[test]
    fn test_album_link_with_query_string() {
        let link =
            extract_uri_and_type("https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy?si=x_1")
                .unwrap();
        assert_eq!(link.uri, "spotify:album:4aawyAB9vmqN3uQ7FjRGTy");
        assert_eq!(link.kind, MediaKind::Album);
    }

    #[test]
    fn test_playlist_link_with_locale_segment_is_rejected() {
        // The type must directly follow the host
        assert!(extract_uri_and_type("https://open.spotify.com/intl-de/playlist/abc").is_none());
    }

    #[test]
    fn test_playlist_link() {
        let link = extract_uri_and_type("open.spotify.com/playlist/37i9dQZF1DX").unwrap();
        assert_eq!(link.uri, "spotify:playlist:37i9dQZF1DX");
        assert!(link.kind.is_context());
    }

    #[test]
    fn test_link_without_media_segment_is_rejected() {
        assert!(extract_uri_and_type("https://open.spotify.com/abc123").is_none());
        assert!(extract_uri_and_type("https://open.spotify.com/artist/abc123").is_none());
        assert!(extract_uri_and_type("not a link").is_none());
    }

    #[test]
    fn test_media_kind_parse() {
        assert_eq!(MediaKind::parse("track"), MediaKind::Track);
        assert_eq!(MediaKind::parse("album"), MediaKind::Album);
        assert_eq!(MediaKind::parse("playlist"), MediaKind::Playlist);
        assert_eq!(
            MediaKind::parse("podcast"),
            MediaKind::Unrecognized("podcast".to_string())
        );
        assert!(!MediaKind::Track.is_context());
        assert_eq!(MediaKind::Unrecognized("x".into()).to_string(), "x");
    }
}
