//! Upstream access: token lifecycle, the web API client and the embed fallback.
pub mod embed;
pub mod spotify;
pub mod token;

pub use spotify::SpotifyApi;
pub use token::{AccessToken, TokenManager, TokenOrigin, TokenSnapshot};
