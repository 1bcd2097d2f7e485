use thiserror::Error;

use crate::models::ResourceKind;

/// Failures talking to the Spotify web API, the landing page or the embed page.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The resource is private, removed, or the API refused to serve it.
    #[error("{}", unavailable_message(.status, .detail))]
    Unavailable {
        status: Option<u16>,
        detail: Option<String>,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected upstream response: {0}")]
    Malformed(String),
}

fn unavailable_message(status: &Option<u16>, detail: &Option<String>) -> String {
    let mut msg = String::from("The URL is private or unavailable.");
    if let Some(d) = detail.as_deref().filter(|d| !d.is_empty()) {
        msg.push_str("\nDetails: ");
        msg.push_str(d);
    }
    if let Some(code) = status {
        msg.push_str(&format!("\nStatus code: {}.", code));
    }
    msg
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Unsupported URL type: {0}")]
    UnsupportedType(String),

    #[error("{kind} \"{name}\" does not contain any track")]
    EmptyResource { kind: ResourceKind, name: String },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Cannot find \"{query}\" on the search provider.")]
    NoSearchResult { query: String },

    #[error("Cannot find any tracks of \"{name}\" on the search provider.")]
    NoTracksResolved { name: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("host error: {0}")]
    Host(#[from] anyhow::Error),
}

impl From<reqwest::Error> for PluginError {
    fn from(err: reqwest::Error) -> Self {
        PluginError::Upstream(UpstreamError::Transport(err))
    }
}

pub type Result<T, E = PluginError> = std::result::Result<T, E>;
