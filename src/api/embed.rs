//! Decoding of the public embed page (`/embed/<type>/<id>`), the data source
//! used when no access token is available. The page carries the resource as
//! JSON inside its `__NEXT_DATA__` script tag; list pages only expose the first
//! batch of tracks and a single subtitle string per track instead of artists.

use crate::error::UpstreamError;
use crate::models::{ListMetadata, ResourceKind, TrackDescriptor};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static NEXT_DATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<script[^>]*id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).unwrap()
});

/// Extract `props.pageProps.state.data.entity` from the embed page markup.
pub fn entity_from_html(html: &str) -> Result<Value, UpstreamError> {
    let raw = NEXT_DATA_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or_else(|| UpstreamError::Malformed("embed page without __NEXT_DATA__".into()))?;
    let mut j: Value = serde_json::from_str(raw.as_str())
        .map_err(|e| UpstreamError::Malformed(format!("embed json: {}", e)))?;
    j.pointer_mut("/props/pageProps/state/data/entity")
        .map(Value::take)
        .filter(|e| !e.is_null())
        .ok_or_else(|| UpstreamError::Malformed("embed page without entity".into()))
}

pub fn track_from_entity(entity: &Value) -> Result<TrackDescriptor, UpstreamError> {
    let title = entity["name"]
        .as_str()
        .or_else(|| entity["title"].as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| UpstreamError::Malformed("embed track without a name".into()))?
        .to_string();

    let mut artist_names: Vec<String> = entity["artists"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|artist| artist["name"].as_str())
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    if artist_names.is_empty() {
        let sub = entity["subtitle"]
            .as_str()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| UpstreamError::Malformed("embed track without an artist".into()))?;
        artist_names.push(sub.to_string());
    }
    Ok(TrackDescriptor { title, artist_names })
}

pub fn list_from_entity(kind: ResourceKind, url: &str, entity: &Value) -> ListMetadata {
    let name = entity["title"]
        .as_str()
        .or_else(|| entity["name"].as_str())
        .unwrap_or_default()
        .to_string();
    let thumbnail_url = entity["coverArt"]["sources"][0]["url"].as_str().map(String::from);
    let tracks = entity["trackList"]
        .as_array()
        .map(|items| {
            items
                .iter()
                // podcast episodes are listed with entityType "episode"
                .filter(|i| i["entityType"].as_str().map_or(true, |t| t == "track"))
                .filter_map(|i| {
                    let title = i["title"].as_str().filter(|s| !s.is_empty())?;
                    let artist = i["subtitle"].as_str().filter(|s| !s.is_empty())?;
                    Some(TrackDescriptor { title: title.to_string(), artist_names: vec![artist.to_string()] })
                })
                .collect()
        })
        .unwrap_or_default();

    ListMetadata {
        kind,
        name,
        thumbnail_url,
        canonical_url: url.to_string(),
        tracks,
    }
}
