use serde::{Deserialize, Serialize};
use std::fmt;

/// The four Spotify resource kinds this plugin can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Track,
    Album,
    Playlist,
    Artist,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Track,
        ResourceKind::Album,
        ResourceKind::Playlist,
        ResourceKind::Artist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Track => "track",
            ResourceKind::Album => "album",
            ResourceKind::Playlist => "playlist",
            ResourceKind::Artist => "artist",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == segment)
    }

    /// Page size the web API allows for the paginated track listings.
    pub fn page_limit(&self) -> Option<u32> {
        match self {
            ResourceKind::Album => Some(50),
            ResourceKind::Playlist => Some(100),
            ResourceKind::Track | ResourceKind::Artist => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub kind: ResourceKind,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub title: String,
    pub artist_names: Vec<String>,
}

impl TrackDescriptor {
    /// `"<title> <artist1> <artist2> ..."`, the query handed to the search provider.
    pub fn search_query(&self) -> String {
        let mut q = self.title.clone();
        for name in &self.artist_names {
            q.push(' ');
            q.push_str(name);
        }
        q
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMetadata {
    pub kind: ResourceKind,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub canonical_url: String,
    pub tracks: Vec<TrackDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResourceMetadata {
    Track(TrackDescriptor),
    List(ListMetadata),
}

impl ResourceMetadata {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceMetadata::Track(_) => ResourceKind::Track,
            ResourceMetadata::List(list) => list.kind,
        }
    }

    pub fn search_queries(&self) -> Vec<String> {
        match self {
            ResourceMetadata::Track(t) => vec![t.search_query()],
            ResourceMetadata::List(list) => list.tracks.iter().map(|t| t.search_query()).collect(),
        }
    }
}
