//! Spotify resource resolution for a host playback framework
pub mod config;
pub mod error;
pub mod models;
pub mod url;
pub mod api;
pub mod host;
pub mod plugin;

pub use error::{PluginError, UpstreamError};
pub use plugin::SpotifyPlugin;
