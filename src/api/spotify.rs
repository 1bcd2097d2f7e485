use super::embed;
use super::token::TokenManager;
use crate::config::{ApiOptions, Endpoints};
use crate::error::{PluginError, Result, UpstreamError};
use crate::models::{ListMetadata, ParsedUrl, ResourceKind, ResourceMetadata, TrackDescriptor};
use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ApiArtist {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

impl ApiTrack {
    /// `None` unless the track has a title and at least one named artist.
    fn into_descriptor(self) -> Option<TrackDescriptor> {
        let artist_names: Vec<String> = self
            .artists
            .into_iter()
            .map(|a| a.name)
            .filter(|n| !n.is_empty())
            .collect();
        if self.name.is_empty() || artist_names.is_empty() {
            return None;
        }
        Some(TrackDescriptor { title: self.name, artist_names })
    }
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<ApiTrack>,
}

/// Album pages list tracks directly, playlist pages wrap them in an item.
trait IntoTrack {
    fn into_track(self) -> Option<ApiTrack>;
}

impl IntoTrack for ApiTrack {
    fn into_track(self) -> Option<ApiTrack> {
        Some(self)
    }
}

impl IntoTrack for PlaylistItem {
    fn into_track(self) -> Option<ApiTrack> {
        self.track
    }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<Option<T>>,
    next: Option<String>,
    #[serde(default)]
    offset: u32,
    #[serde(default)]
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

/// Common shape of the album, playlist and artist objects.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Option<Vec<ApiImage>>,
    #[serde(default)]
    external_urls: Option<ExternalUrls>,
    tracks: Option<Page<T>>,
}

impl<T> Envelope<T> {
    fn thumbnail(&self) -> Option<String> {
        self.images.as_ref()?.first().map(|i| i.url.clone())
    }

    fn canonical_url(&self, fallback: &str) -> String {
        self.external_urls
            .as_ref()
            .and_then(|u| u.spotify.clone())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TopTracks {
    #[serde(default)]
    tracks: Vec<Option<ApiTrack>>,
}

/// Metadata client for Spotify resources.
///
/// Uses the web API whenever the token manager can supply a token and falls
/// back to the public embed page otherwise. Album and playlist track listings
/// are followed page by page while a token is available.
pub struct SpotifyApi {
    client: Client,
    api_base: String,
    web_base: String,
    top_tracks_country: String,
    token: TokenManager,
}

impl SpotifyApi {
    pub fn new(options: &ApiOptions, endpoints: &Endpoints) -> Result<Self> {
        options.validate()?;
        let client = Client::new();
        let token = TokenManager::new(
            client.clone(),
            options.credentials(),
            &endpoints.auth_base,
            &endpoints.web_base,
        );
        Ok(Self {
            client,
            api_base: endpoints.api_base.trim_end_matches('/').to_string(),
            web_base: endpoints.web_base.trim_end_matches('/').to_string(),
            top_tracks_country: options.top_tracks_country().to_string(),
            token,
        })
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.token
    }

    pub fn top_tracks_country(&self) -> &str {
        &self.top_tracks_country
    }

    pub async fn get_data(&self, url: &str) -> Result<ResourceMetadata> {
        let parsed = crate::url::parse(url)?;
        let bearer = self.token.ensure_token().await;

        let data = match (parsed.kind, bearer) {
            (ResourceKind::Track, Some(bearer)) => {
                let track: ApiTrack = self
                    .get_json(&bearer, &format!("{}/tracks/{}", self.api_base, parsed.id), &[])
                    .await?;
                let track = track
                    .into_descriptor()
                    .ok_or_else(|| UpstreamError::Malformed("track without a title or artist".into()))?;
                ResourceMetadata::Track(track)
            }
            (ResourceKind::Track, None) => {
                let entity = self.embed_entity(&parsed).await?;
                ResourceMetadata::Track(embed::track_from_entity(&entity)?)
            }
            (kind, None) => {
                debug!("no usable token, reading {} {} from the embed page", kind, parsed.id);
                let entity = self.embed_entity(&parsed).await?;
                ResourceMetadata::List(embed::list_from_entity(kind, url, &entity))
            }
            (kind, Some(bearer)) => ResourceMetadata::List(self.get_list(&bearer, &parsed, url, kind).await?),
        };

        if let ResourceMetadata::List(list) = &data {
            if list.tracks.is_empty() {
                return Err(PluginError::EmptyResource {
                    kind: list.kind,
                    name: list.name.clone(),
                });
            }
        }
        Ok(data)
    }

    async fn get_list(
        &self,
        bearer: &str,
        parsed: &ParsedUrl,
        url: &str,
        kind: ResourceKind,
    ) -> Result<ListMetadata> {
        let id = &parsed.id;
        let (name, thumbnail_url, canonical_url, tracks) = match kind {
            ResourceKind::Album => {
                let env: Envelope<ApiTrack> = self
                    .get_json(bearer, &format!("{}/albums/{}", self.api_base, id), &[])
                    .await?;
                let (name, thumb, canon) = (env.name.clone(), env.thumbnail(), env.canonical_url(url));
                let tracks = match env.tracks {
                    Some(first) => self.collect_pages(kind, id, first).await,
                    None => Vec::new(),
                };
                (name, thumb, canon, tracks)
            }
            ResourceKind::Playlist => {
                let env: Envelope<PlaylistItem> = self
                    .get_json(bearer, &format!("{}/playlists/{}", self.api_base, id), &[])
                    .await?;
                let (name, thumb, canon) = (env.name.clone(), env.thumbnail(), env.canonical_url(url));
                let tracks = match env.tracks {
                    Some(first) => self.collect_pages(kind, id, first).await,
                    None => Vec::new(),
                };
                (name, thumb, canon, tracks)
            }
            ResourceKind::Artist => {
                let env: Envelope<ApiTrack> = self
                    .get_json(bearer, &format!("{}/artists/{}", self.api_base, id), &[])
                    .await?;
                let top: TopTracks = self
                    .get_json(
                        bearer,
                        &format!("{}/artists/{}/top-tracks", self.api_base, id),
                        &[("market", self.top_tracks_country.clone())],
                    )
                    .await?;
                let tracks: Vec<ApiTrack> = top.tracks.into_iter().flatten().collect();
                (env.name.clone(), env.thumbnail(), env.canonical_url(url), tracks)
            }
            ResourceKind::Track => return Err(PluginError::UnsupportedType(kind.to_string())),
        };

        Ok(ListMetadata {
            kind,
            name,
            thumbnail_url,
            canonical_url,
            tracks: tracks
                .into_iter()
                .filter(|t| t.kind == "track")
                .filter_map(ApiTrack::into_descriptor)
                .collect(),
        })
    }

    /// Follow `next` links of an album/playlist listing. A failed page ends the
    /// walk and keeps what was gathered so far; so does losing the token.
    async fn collect_pages<T>(&self, kind: ResourceKind, id: &str, first: Page<T>) -> Vec<ApiTrack>
    where
        T: IntoTrack + DeserializeOwned,
    {
        let page_limit = kind.page_limit().unwrap_or(50);
        let path = if kind == ResourceKind::Playlist { "playlists" } else { "albums" };
        let url = format!("{}/{}/{}/tracks", self.api_base, path, id);

        let mut tracks: Vec<ApiTrack> = Vec::new();
        let mut next = first.next;
        let mut offset = first.offset;
        let mut limit = first.limit;
        tracks.extend(first.items.into_iter().flatten().filter_map(IntoTrack::into_track));

        while next.is_some() {
            let Some(bearer) = self.token.ensure_token().await else {
                debug!("token lost while paginating {} {}; returning first pages only", kind, id);
                break;
            };
            if limit == 0 {
                limit = page_limit;
            }
            let query = [
                ("offset", (offset + limit).to_string()),
                ("limit", page_limit.to_string()),
            ];
            match self.get_json::<Page<T>>(&bearer, &url, &query).await {
                Ok(page) => {
                    if page.items.is_empty() {
                        break;
                    }
                    next = page.next;
                    offset = page.offset;
                    limit = page.limit;
                    tracks.extend(page.items.into_iter().flatten().filter_map(IntoTrack::into_track));
                }
                Err(e) => {
                    warn!("[SpotifyAPI]: {}", e);
                    warn!("[SpotifyPlugin]: There is an API error, return songs as much as possible.");
                    break;
                }
            }
        }
        tracks
    }

    async fn embed_entity(&self, parsed: &ParsedUrl) -> Result<Value, UpstreamError> {
        let url = format!("{}/embed/{}/{}", self.web_base, parsed.kind, parsed.id);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(UpstreamError::Unavailable {
                status: Some(status.as_u16()),
                detail: Some(format!("embed page for {} {} could not be loaded", parsed.kind, parsed.id)),
            });
        }
        let html = resp.text().await?;
        embed::entity_from_html(&html)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        bearer: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, UpstreamError> {
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, bearer)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let detail = body["error"]["message"].as_str().map(String::from);
            return Err(UpstreamError::Unavailable {
                status: Some(status.as_u16()),
                detail,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| UpstreamError::Malformed(format!("{}: {}", url, e)))
    }
}
