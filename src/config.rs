use crate::error::{PluginError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

static REGION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PluginOptions {
    #[serde(default)]
    pub api: ApiOptions,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub emit_events_after_fetching: bool,
    #[serde(default)]
    pub insertion_policy: InsertionPolicy,

    // CLI only: daily-rotated log files are written here when set
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub endpoints: Endpoints,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ApiOptions {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Market used for the artist top-tracks listing, e.g. "US", "VN".
    #[serde(default)]
    pub top_tracks_country: Option<String>,
}

/// Where the songs resolved after the first one land in the queue.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPolicy {
    /// Right behind the first song so the whole list stays together.
    #[default]
    Contiguous,
    /// At the end of the queue regardless of where the first song went.
    AppendToEnd,
}

/// Base URLs of the upstream services. Each one may be overridden by env var,
/// which is how the test suite points the client at a mock server.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Endpoints {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_auth_base")]
    pub auth_base: String,
    #[serde(default = "default_web_base")]
    pub web_base: String,
}

impl Endpoints {
    /// Point every upstream at a single base URL.
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            api_base: base.clone(),
            auth_base: base.clone(),
            web_base: base,
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            auth_base: default_auth_base(),
            web_base: default_web_base(),
        }
    }
}

fn default_parallel() -> bool { true }
fn default_api_base() -> String {
    env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into())
}
fn default_auth_base() -> String {
    env::var("SPOTIFY_AUTH_BASE").unwrap_or_else(|_| "https://accounts.spotify.com".into())
}
fn default_web_base() -> String {
    env::var("SPOTIFY_WEB_BASE").unwrap_or_else(|_| "https://open.spotify.com".into())
}

pub const DEFAULT_TOP_TRACKS_COUNTRY: &str = "US";

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            api: ApiOptions::default(),
            parallel: default_parallel(),
            emit_events_after_fetching: false,
            insertion_policy: InsertionPolicy::default(),
            log_dir: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl PluginOptions {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: PluginOptions = toml::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.api.validate()
    }
}

impl ApiOptions {
    pub fn validate(&self) -> Result<()> {
        if let Some(country) = &self.top_tracks_country {
            if !REGION_RE.is_match(country) {
                return Err(PluginError::InvalidConfiguration(format!(
                    "Invalid region code: {:?}",
                    country
                )));
            }
        }
        Ok(())
    }

    /// Both halves must be present and non-empty for the credentialed grant.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.to_string(), secret.to_string()))
            }
            _ => None,
        }
    }

    pub fn top_tracks_country(&self) -> &str {
        self.top_tracks_country
            .as_deref()
            .unwrap_or(DEFAULT_TOP_TRACKS_COUNTRY)
    }
}
