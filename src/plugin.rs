use crate::api::spotify::SpotifyApi;
use crate::config::{InsertionPolicy, PluginOptions};
use crate::error::{PluginError, Result};
use crate::host::{
    Host, PlayOptions, Playlist, PlaylistRef, PluginEvent, Queue, QueueCreation, QueuePosition,
    SearchResult, Song,
};
use crate::models::{ListMetadata, ResourceMetadata};
use futures::future::join_all;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

impl InsertionPolicy {
    /// Where the rest of a list goes, given where its first song was put.
    pub fn remainder_position(&self, first: QueuePosition, skip: bool) -> QueuePosition {
        match (self, first) {
            (InsertionPolicy::AppendToEnd, _) => QueuePosition::End,
            (InsertionPolicy::Contiguous, QueuePosition::End) => QueuePosition::End,
            // after a skip the first song has moved up and taken the slot's place
            (InsertionPolicy::Contiguous, QueuePosition::Index(p)) if skip => QueuePosition::Index(p),
            (InsertionPolicy::Contiguous, QueuePosition::Index(p)) => QueuePosition::Index(p + 1),
        }
    }
}

/// Plays Spotify tracks, albums, playlists and artists through the host.
///
/// A list starts playing as soon as one of its tracks is found on the search
/// provider; the rest are searched afterwards and appended behind it.
pub struct SpotifyPlugin<H: Host> {
    api: SpotifyApi,
    host: Arc<H>,
    parallel: bool,
    emit_events_after_fetching: bool,
    insertion_policy: InsertionPolicy,
}

impl<H: Host> SpotifyPlugin<H> {
    pub fn new(options: PluginOptions, host: Arc<H>) -> Result<Self> {
        options.validate()?;
        let api = SpotifyApi::new(&options.api, &options.endpoints)?;
        Ok(Self {
            api,
            host,
            parallel: options.parallel,
            emit_events_after_fetching: options.emit_events_after_fetching,
            insertion_policy: options.insertion_policy,
        })
    }

    pub fn api(&self) -> &SpotifyApi {
        &self.api
    }

    /// Whether this plugin should handle `url`. Never touches the network.
    pub fn validate(&self, url: &str) -> bool {
        crate::url::is_valid(url)
    }

    pub async fn play(&self, destination: &str, url: &str, options: PlayOptions) -> Result<()> {
        let data = self.api.get_data(url).await?;
        self.play_metadata(destination, data, options).await
    }

    pub async fn play_metadata(
        &self,
        destination: &str,
        data: ResourceMetadata,
        options: PlayOptions,
    ) -> Result<()> {
        match data {
            ResourceMetadata::Track(track) => {
                let query = track.search_query();
                let result = self
                    .search(&query)
                    .await
                    .ok_or(PluginError::NoSearchResult { query })?;
                self.host.play(destination, result, &options).await?;
                Ok(())
            }
            ResourceMetadata::List(list) => self.play_list(destination, list, options).await,
        }
    }

    async fn play_list(&self, destination: &str, list: ListMetadata, options: PlayOptions) -> Result<()> {
        let ListMetadata { name, thumbnail_url, canonical_url, tracks, .. } = list;
        let mut queries: VecDeque<String> = tracks.iter().map(|t| t.search_query()).collect();
        let playlist_ref = PlaylistRef {
            name: name.clone(),
            url: canonical_url.clone(),
        };

        let mut first_song = self
            .next_first_song(&mut queries, &playlist_ref, &options)
            .await
            .ok_or_else(|| PluginError::NoTracksResolved { name: name.clone() })?;

        let mut playlist = Playlist {
            source: "spotify",
            name,
            thumbnail_url,
            url: canonical_url,
            member: options.member.clone(),
            metadata: options.metadata.clone(),
            songs: vec![first_song.clone()],
        };
        let first_position = QueuePosition::from_offset(options.position);
        let rest_position = self
            .insertion_policy
            .remainder_position(first_position, options.skip);

        if let Some(queue) = self.host.get_queue(destination) {
            queue.add_to_queue(vec![first_song], first_position).await?;
            if options.skip {
                queue.skip().await?;
            } else if !self.emit_events_after_fetching {
                self.emit_add_list(&queue, &playlist);
            }
            self.fetch_the_rest(&queue, &mut playlist, &playlist_ref, queries, rest_position, &options)
                .await?;
            if !options.skip && self.emit_events_after_fetching {
                self.emit_add_list(&queue, &playlist);
            }
        } else {
            let queue = loop {
                match self
                    .host
                    .create_queue(destination, first_song.clone(), options.text_channel.as_deref())
                    .await?
                {
                    QueueCreation::Created(q) => break q,
                    QueueCreation::AlreadyHandled => {
                        debug!("queue creation for {} already handled, trying the next track", destination);
                        first_song = self
                            .next_first_song(&mut queries, &playlist_ref, &options)
                            .await
                            .ok_or_else(|| PluginError::NoTracksResolved { name: playlist.name.clone() })?;
                        playlist.songs = vec![first_song.clone()];
                    }
                }
            };
            if !self.emit_events_after_fetching {
                self.announce_new_queue(&queue, &playlist);
            }
            self.fetch_the_rest(&queue, &mut playlist, &playlist_ref, queries, rest_position, &options)
                .await?;
            if self.emit_events_after_fetching {
                self.announce_new_queue(&queue, &playlist);
            }
        }

        info!(
            "queued {} song(s) from \"{}\" in {}",
            playlist.songs.len(),
            playlist.name,
            destination
        );
        Ok(())
    }

    /// Search queued queries in order until one of them matches.
    async fn next_first_song(
        &self,
        queries: &mut VecDeque<String>,
        playlist_ref: &PlaylistRef,
        options: &PlayOptions,
    ) -> Option<Song> {
        while let Some(query) = queries.pop_front() {
            if let Some(result) = self.search(&query).await {
                return Some(Song::in_playlist(result, playlist_ref, options));
            }
            debug!("no search result for {:?}, trying the next track", query);
        }
        None
    }

    async fn fetch_the_rest(
        &self,
        queue: &Arc<dyn Queue>,
        playlist: &mut Playlist,
        playlist_ref: &PlaylistRef,
        queries: VecDeque<String>,
        position: QueuePosition,
        options: &PlayOptions,
    ) -> Result<()> {
        if queries.is_empty() {
            return Ok(());
        }
        let results: Vec<Option<SearchResult>> = if self.parallel {
            join_all(queries.iter().map(|q| self.search(q))).await
        } else {
            let mut results = Vec::with_capacity(queries.len());
            for q in &queries {
                results.push(self.search(q).await);
            }
            results
        };

        let songs: Vec<Song> = results
            .into_iter()
            .flatten()
            .map(|r| Song::in_playlist(r, playlist_ref, options))
            .collect();
        debug!(
            "resolved {} of {} remaining tracks of \"{}\"",
            songs.len(),
            queries.len(),
            playlist.name
        );

        if !songs.is_empty() {
            queue.add_to_queue(songs.clone(), position).await?;
        }
        playlist.songs.extend(songs);
        Ok(())
    }

    fn emit_add_list(&self, queue: &Arc<dyn Queue>, playlist: &Playlist) {
        self.host.emit(PluginEvent::AddList {
            queue: Arc::clone(queue),
            playlist: playlist.clone(),
        });
    }

    fn announce_new_queue(&self, queue: &Arc<dyn Queue>, playlist: &Playlist) {
        if self.host.emit_add_list_when_creating_queue() {
            self.emit_add_list(queue, playlist);
        }
        self.host.emit(PluginEvent::PlaySong {
            queue: Arc::clone(queue),
            song: playlist.songs[0].clone(),
        });
    }

    async fn search(&self, query: &str) -> Option<SearchResult> {
        match self.host.search(query).await {
            Ok(r) => r,
            Err(e) => {
                debug!("search for {:?} failed: {}", query, e);
                None
            }
        }
    }
}
