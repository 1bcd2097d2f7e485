use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Subtracted from every computed expiry so a token never lapses mid-request.
pub const SAFETY_MARGIN_MS: i64 = 5_000;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""accessToken":"(.+?)""#).unwrap());
static EXPIRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""accessTokenExpirationTimestampMs":(\d+)"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenOrigin {
    Credentialed,
    Anonymous,
    None,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at_ms: i64, // epoch millis, margin already subtracted
    pub origin: TokenOrigin,
}

impl AccessToken {
    fn none() -> Self {
        Self { value: String::new(), expires_at_ms: 0, origin: TokenOrigin::None }
    }

    fn is_usable(&self) -> bool {
        self.origin != TokenOrigin::None && !self.value.is_empty()
    }
}

/// Point-in-time view of the manager, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub origin: TokenOrigin,
    pub available: bool,
    pub expires_at_ms: i64,
    pub has_credentials: bool,
}

#[derive(Deserialize)]
struct GrantResponse {
    access_token: String,
    expires_in: i64,
}

struct TokenState {
    token: AccessToken,
    credentials: Option<(String, String)>,
    credential_warned: bool,
    scrape_warned: bool,
}

/// Owns the single access token used by a `SpotifyApi`.
///
/// With client credentials it performs the client-credentials grant; without
/// them (or once the grant has failed) it scrapes the anonymous token that the
/// public web player embeds in its landing page. Expiry is checked lazily on
/// each call. The state mutex is held across the refresh, so overlapping
/// callers wait for the in-flight request instead of issuing their own.
pub struct TokenManager {
    client: Client,
    auth_base: String,
    web_base: String,
    state: tokio::sync::Mutex<TokenState>,
}

impl TokenManager {
    pub fn new(
        client: Client,
        credentials: Option<(String, String)>,
        auth_base: &str,
        web_base: &str,
    ) -> Self {
        Self {
            client,
            auth_base: auth_base.trim_end_matches('/').to_string(),
            web_base: web_base.trim_end_matches('/').to_string(),
            state: tokio::sync::Mutex::new(TokenState {
                token: AccessToken::none(),
                credentials,
                credential_warned: false,
                scrape_warned: false,
            }),
        }
    }

    /// Refresh the token if it is missing or stale and return the bearer
    /// header value, or `None` when no usable token could be obtained.
    pub async fn ensure_token(&self) -> Option<String> {
        let mut st = self.state.lock().await;
        let now = Utc::now().timestamp_millis();
        if now >= st.token.expires_at_ms {
            self.refresh_locked(&mut st, now).await;
        }
        if st.token.is_usable() {
            Some(format!("Bearer {}", st.token.value))
        } else {
            None
        }
    }

    pub async fn snapshot(&self) -> TokenSnapshot {
        let st = self.state.lock().await;
        TokenSnapshot {
            origin: st.token.origin,
            available: st.token.is_usable(),
            expires_at_ms: st.token.expires_at_ms,
            has_credentials: st.credentials.is_some(),
        }
    }

    async fn refresh_locked(&self, st: &mut TokenState, now: i64) {
        if let Some((client_id, client_secret)) = st.credentials.clone() {
            match self.client_credentials_grant(&client_id, &client_secret).await {
                Ok(grant) => {
                    debug!("Obtained Spotify token from client credentials");
                    st.token = AccessToken {
                        value: grant.access_token,
                        expires_at_ms: now + grant.expires_in * 1000 - SAFETY_MARGIN_MS,
                        origin: TokenOrigin::Credentialed,
                    };
                    return;
                }
                Err(e) => {
                    // never retried for the lifetime of this manager
                    st.credentials = None;
                    if !st.credential_warned {
                        st.credential_warned = true;
                        warn!("{}", e);
                        warn!("[SPOTIFY_PLUGIN_API] Cannot get token from your credentials. Try scraping token instead.");
                    }
                }
            }
        }

        match self.scrape_token().await {
            Ok(Some((value, expires_at_ms))) => {
                debug!("Scraped anonymous Spotify token");
                st.token = AccessToken {
                    value,
                    // unknown expiry: usable now, scraped again on the next call
                    expires_at_ms: expires_at_ms.map(|t| t - SAFETY_MARGIN_MS).unwrap_or(0),
                    origin: TokenOrigin::Anonymous,
                };
            }
            Ok(None) => self.mark_unavailable(st, None),
            Err(e) => self.mark_unavailable(st, Some(e)),
        }
    }

    fn mark_unavailable(&self, st: &mut TokenState, err: Option<anyhow::Error>) {
        st.token = AccessToken::none();
        if let Some(e) = &err {
            debug!("token scrape failed: {}", e);
        }
        if !st.scrape_warned {
            st.scrape_warned = true;
            warn!(
                "[SPOTIFY_PLUGIN_API] Cannot get token from scraping. \
                 Cannot fetch more than 100 tracks from a playlist or album."
            );
        }
    }

    async fn client_credentials_grant(&self, client_id: &str, client_secret: &str) -> Result<GrantResponse> {
        let auth_header = format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", client_id, client_secret))
        );
        let url = format!("{}/api/token", self.auth_base);
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth_header)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("client credentials grant failed: {} - {}", status, body));
        }
        Ok(resp.json().await?)
    }

    async fn scrape_token(&self) -> Result<Option<(String, Option<i64>)>> {
        let url = format!("{}/", self.web_base);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("landing page returned {}", status));
        }
        let body = resp.text().await?;
        Ok(scrape_from_body(&body))
    }
}

/// Pull `(token, expiry_ms)` out of the landing page markup.
fn scrape_from_body(body: &str) -> Option<(String, Option<i64>)> {
    let token = TOKEN_RE.captures(body)?.get(1)?.as_str().to_string();
    let expiry = EXPIRY_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i64>().ok());
    Some((token, expiry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_finds_token_and_expiry() {
        let body = r#"<script>{"clientId":"x","accessToken":"BQD-abc_123","accessTokenExpirationTimestampMs":1700000000000,"isAnonymous":true}</script>"#;
        let (tok, exp) = scrape_from_body(body).unwrap();
        assert_eq!(tok, "BQD-abc_123");
        assert_eq!(exp, Some(1_700_000_000_000));
    }

    #[test]
    fn scrape_without_expiry_or_token() {
        assert_eq!(
            scrape_from_body(r#""accessToken":"this_is_a_valid_token""#),
            Some(("this_is_a_valid_token".to_string(), None))
        );
        assert_eq!(scrape_from_body("some text without token"), None);
    }
}
