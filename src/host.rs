//! The surface of the host playback framework this plugin runs inside.
//!
//! The host owns the queues, the transport and the event bus. The plugin only
//! searches through it, inserts into queues it hands out, and emits events.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One playable hit returned by the host's search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub uploader: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Song {
    pub result: SearchResult,
    pub member: Option<String>,
    pub metadata: Option<Value>,
    /// The list this song was resolved from.
    pub playlist: Option<PlaylistRef>,
}

impl Song {
    pub fn in_playlist(result: SearchResult, playlist: &PlaylistRef, options: &PlayOptions) -> Self {
        Self {
            result,
            member: options.member.clone(),
            metadata: options.metadata.clone(),
            playlist: Some(playlist.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Playlist {
    pub source: &'static str,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub url: String,
    pub member: Option<String>,
    pub metadata: Option<Value>,
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePosition {
    End,
    /// Index into the queue, 0 being the song currently playing.
    Index(usize),
}

impl QueuePosition {
    /// `0` means "append", anything else is an index.
    pub fn from_offset(position: usize) -> Self {
        if position == 0 {
            QueuePosition::End
        } else {
            QueuePosition::Index(position)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayOptions {
    pub member: Option<String>,
    pub text_channel: Option<String>,
    pub skip: bool,
    pub position: usize,
    /// Passed through untouched onto every song.
    pub metadata: Option<Value>,
}

#[async_trait]
pub trait Queue: Send + Sync {
    fn id(&self) -> &str;

    /// Insert songs, keeping their order, at the given position.
    async fn add_to_queue(&self, songs: Vec<Song>, position: QueuePosition) -> Result<()>;

    /// Skip to the next song in the queue.
    async fn skip(&self) -> Result<()>;
}

pub enum QueueCreation {
    Created(Arc<dyn Queue>),
    /// The host took care of the request itself; nothing was queued.
    AlreadyHandled,
}

pub enum PluginEvent {
    AddList { queue: Arc<dyn Queue>, playlist: Playlist },
    PlaySong { queue: Arc<dyn Queue>, song: Song },
}

impl PluginEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PluginEvent::AddList { .. } => "addList",
            PluginEvent::PlaySong { .. } => "playSong",
        }
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Best match for a free-text query. Errors are treated as a miss.
    async fn search(&self, query: &str) -> Result<Option<SearchResult>>;
}

#[async_trait]
pub trait Host: SearchProvider {
    fn get_queue(&self, destination: &str) -> Option<Arc<dyn Queue>>;

    /// Create a queue for the destination seeded with `first_song`. Returns
    /// once the first song is ready to play.
    async fn create_queue(
        &self,
        destination: &str,
        first_song: Song,
        text_channel: Option<&str>,
    ) -> Result<QueueCreation>;

    /// The host's own entry point for playing a single search result.
    async fn play(&self, destination: &str, result: SearchResult, options: &PlayOptions) -> Result<()>;

    fn emit(&self, event: PluginEvent);

    /// Whether a freshly created queue is announced with "addList" as well as "playSong".
    fn emit_add_list_when_creating_queue(&self) -> bool {
        true
    }
}
