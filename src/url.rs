//! Recognition of Spotify resource locators.
//!
//! Accepted shapes:
//! - `https://open.spotify.com/<type>/<id>` (query string ignored)
//! - locale and embed prefixes: `/intl-fr/<type>/<id>`, `/embed/<type>/<id>`
//! - `https://play.spotify.com/<type>/<id>`
//! - `spotify:<type>:<id>` and the legacy `spotify:user:<name>:playlist:<id>`
//!
//! Nothing here touches the network.

use crate::error::{PluginError, Result};
use crate::models::{ParsedUrl, ResourceKind};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

const DOMAIN_MARKER: &str = "spotify";

static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());

pub fn parse(input: &str) -> Result<ParsedUrl> {
    let input = input.trim();
    let segments: Vec<String> = match input.strip_prefix("spotify:") {
        Some(rest) => rest.split(':').map(String::from).collect(),
        None => path_segments(input)?,
    };

    let mut segs: &[String] = &segments;
    // spotify:user:<name>:playlist:<id>
    if segs.len() >= 4 && segs[0] == "user" {
        segs = &segs[2..];
    }

    let kind_segment = segs.first().ok_or(PluginError::InvalidUrl)?;
    let id = segs
        .get(1)
        .filter(|id| ID_RE.is_match(id))
        .ok_or(PluginError::InvalidUrl)?;
    let kind = ResourceKind::from_segment(kind_segment)
        .ok_or_else(|| PluginError::UnsupportedType(kind_segment.clone()))?;

    Ok(ParsedUrl { kind, id: id.clone() })
}

fn path_segments(input: &str) -> Result<Vec<String>> {
    let url = Url::parse(input).map_err(|_| PluginError::InvalidUrl)?;
    let host = url.host_str().ok_or(PluginError::InvalidUrl)?;
    if !(host == "spotify.com" || host.ends_with(".spotify.com")) {
        return Err(PluginError::InvalidUrl);
    }
    let segments = url
        .path_segments()
        .ok_or(PluginError::InvalidUrl)?
        .filter(|s| !s.is_empty())
        .skip_while(|s| s.starts_with("intl-") || *s == "embed")
        .map(String::from)
        .collect();
    Ok(segments)
}

/// Cheap predicate the host calls before routing a URL to this plugin.
pub fn is_valid(input: &str) -> bool {
    input.contains(DOMAIN_MARKER) && parse(input).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_spotify_links() {
        let p = parse("https://open.spotify.com/track/6Fbsn9471Xd0vVsMWwhePh?si=f992e1fe1f714674").unwrap();
        assert_eq!(p.kind, ResourceKind::Track);
        assert_eq!(p.id, "6Fbsn9471Xd0vVsMWwhePh");

        let p = parse("https://open.spotify.com/intl-vi/album/5Gu0Ldddj2f6a0q5gitIok").unwrap();
        assert_eq!(p.kind, ResourceKind::Album);

        let p = parse("https://open.spotify.com/embed/playlist/37i9dQZEVXbLdGSmz6xilI").unwrap();
        assert_eq!(p.kind, ResourceKind::Playlist);
    }

    #[test]
    fn parses_uris() {
        let p = parse("spotify:artist:3FwYnbtGNt8hJfjNuOfpeG").unwrap();
        assert_eq!(p.kind, ResourceKind::Artist);
        assert_eq!(p.id, "3FwYnbtGNt8hJfjNuOfpeG");

        let p = parse("spotify:user:someone:playlist:0HlfmkivifBxTcNeoev41s").unwrap();
        assert_eq!(p.kind, ResourceKind::Playlist);
        assert_eq!(p.id, "0HlfmkivifBxTcNeoev41s");
    }

    #[test]
    fn missing_id_is_invalid_and_unknown_type_is_unsupported() {
        assert!(matches!(parse("invalid-url"), Err(PluginError::InvalidUrl)));
        assert!(matches!(parse("https://open.spotify.com/show/"), Err(PluginError::InvalidUrl)));
        assert!(matches!(
            parse("https://open.spotify.com/show/id"),
            Err(PluginError::UnsupportedType(t)) if t == "show"
        ));
        assert!(matches!(
            parse("spotify:episode:512ojhOuo1ktJprKbVcKyQ"),
            Err(PluginError::UnsupportedType(_))
        ));
    }

    #[test]
    fn other_domains_are_rejected() {
        assert!(matches!(parse("https://example.com/track/abc"), Err(PluginError::InvalidUrl)));
        assert!(matches!(parse("https://notspotify.com/track/abc"), Err(PluginError::InvalidUrl)));
    }

    #[test]
    fn validity_predicate() {
        assert!(!is_valid(""));
        assert!(!is_valid("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(!is_valid("https://open.spotify.com/show/4rOoJ6Egrf8K2IrywzwOMk"));
        assert!(!is_valid("https://open.spotify.com/episode/512ojhOuo1ktJprKbVcKyQ"));
        assert!(!is_valid("spotify is great"));
        for kind in ResourceKind::ALL {
            assert!(is_valid(&format!("https://open.spotify.com/{}/5Gu0Ldddj2f6a0q5gitIok", kind)));
        }
    }
}
