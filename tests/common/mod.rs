#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use spotify_play_plugin::host::{
    Host, PlayOptions, PluginEvent, Queue, QueueCreation, QueuePosition, SearchProvider,
    SearchResult, Song,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn hit(name: &str) -> SearchResult {
    SearchResult {
        id: format!("yt-{}", name.replace(' ', "-")),
        name: name.to_string(),
        url: format!("https://www.youtube.com/watch?v={}", name.replace(' ', "-")),
        duration_secs: Some(200),
        uploader: None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueOp {
    Add { songs: Vec<String>, position: QueuePosition },
    Skip,
}

pub struct RecordingQueue {
    id: String,
    pub ops: Mutex<Vec<QueueOp>>,
    /// Playlist name each added song links back to, in insertion order.
    pub links: Mutex<Vec<Option<String>>>,
}

impl RecordingQueue {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self { id: id.to_string(), ops: Mutex::new(Vec::new()), links: Mutex::new(Vec::new()) })
    }

    pub fn ops(&self) -> Vec<QueueOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn links(&self) -> Vec<Option<String>> {
        self.links.lock().unwrap().clone()
    }

    fn link(&self, song: &Song) {
        let name = song.playlist.as_ref().map(|p| p.name.clone());
        self.links.lock().unwrap().push(name);
    }
}

#[async_trait]
impl Queue for RecordingQueue {
    fn id(&self) -> &str {
        &self.id
    }

    async fn add_to_queue(&self, songs: Vec<Song>, position: QueuePosition) -> Result<()> {
        songs.iter().for_each(|s| self.link(s));
        let songs = songs.into_iter().map(|s| s.result.name).collect();
        self.ops.lock().unwrap().push(QueueOp::Add { songs, position });
        Ok(())
    }

    async fn skip(&self) -> Result<()> {
        self.ops.lock().unwrap().push(QueueOp::Skip);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub name: &'static str,
    pub queue: String,
    pub songs: Vec<String>,
}

/// Fake host that answers searches from a fixed table and records every
/// queue mutation and event.
#[derive(Default)]
pub struct RecordingHost {
    results: HashMap<String, SearchResult>,
    failing: HashSet<String>,
    delays: HashMap<String, u64>,
    pub existing: Mutex<Option<Arc<RecordingQueue>>>,
    pub created: Mutex<Vec<(String, String)>>,
    pub created_queue: Mutex<Option<Arc<RecordingQueue>>>,
    pub already_handled: Mutex<usize>,
    pub events: Mutex<Vec<RecordedEvent>>,
    pub played: Mutex<Vec<String>>,
    pub searches: Mutex<Vec<String>>,
    pub add_list_on_create: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self { add_list_on_create: true, ..Default::default() }
    }

    /// Query resolves to a song named `name`.
    pub fn with_result(mut self, query: &str, name: &str) -> Self {
        self.results.insert(query.to_string(), hit(name));
        self
    }

    /// Query makes the search backend return an error.
    pub fn with_failure(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn with_delay(mut self, query: &str, ms: u64) -> Self {
        self.delays.insert(query.to_string(), ms);
        self
    }

    pub fn with_existing_queue(self, queue: Arc<RecordingQueue>) -> Self {
        *self.existing.lock().unwrap() = Some(queue);
        self
    }

    /// The next `n` queue creations report `AlreadyHandled`.
    pub fn with_already_handled(self, n: usize) -> Self {
        *self.already_handled.lock().unwrap() = n;
        self
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_queue(&self) -> Option<Arc<RecordingQueue>> {
        self.created_queue.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for RecordingHost {
    async fn search(&self, query: &str) -> Result<Option<SearchResult>> {
        self.searches.lock().unwrap().push(query.to_string());
        if let Some(ms) = self.delays.get(query) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.failing.contains(query) {
            return Err(anyhow!("search backend unavailable"));
        }
        Ok(self.results.get(query).cloned())
    }
}

#[async_trait]
impl Host for RecordingHost {
    fn get_queue(&self, _destination: &str) -> Option<Arc<dyn Queue>> {
        self.existing
            .lock()
            .unwrap()
            .clone()
            .map(|q| q as Arc<dyn Queue>)
    }

    async fn create_queue(
        &self,
        destination: &str,
        first_song: Song,
        _text_channel: Option<&str>,
    ) -> Result<QueueCreation> {
        self.created
            .lock()
            .unwrap()
            .push((destination.to_string(), first_song.result.name.clone()));
        {
            let mut pending = self.already_handled.lock().unwrap();
            if *pending > 0 {
                *pending -= 1;
                return Ok(QueueCreation::AlreadyHandled);
            }
        }
        let queue = RecordingQueue::new(destination);
        queue.link(&first_song);
        queue.ops.lock().unwrap().push(QueueOp::Add {
            songs: vec![first_song.result.name],
            position: QueuePosition::End,
        });
        *self.created_queue.lock().unwrap() = Some(queue.clone());
        Ok(QueueCreation::Created(queue))
    }

    async fn play(&self, _destination: &str, result: SearchResult, _options: &PlayOptions) -> Result<()> {
        self.played.lock().unwrap().push(result.name);
        Ok(())
    }

    fn emit(&self, event: PluginEvent) {
        let recorded = match &event {
            PluginEvent::AddList { queue, playlist } => RecordedEvent {
                name: event.name(),
                queue: queue.id().to_string(),
                songs: playlist.songs.iter().map(|s| s.result.name.clone()).collect(),
            },
            PluginEvent::PlaySong { queue, song } => RecordedEvent {
                name: event.name(),
                queue: queue.id().to_string(),
                songs: vec![song.result.name.clone()],
            },
        };
        self.events.lock().unwrap().push(recorded);
    }

    fn emit_add_list_when_creating_queue(&self) -> bool {
        self.add_list_on_create
    }
}
