use crate::apis::status_error;
use crate::app::ports::ListeningHistoryPort;
use crate::config::{Config, SpotifyConfig};
use crate::constants::{SPOTIFY_SCOPES, SPOTIFY_SERVICE};
use crate::error::{ConcertError, Result};
use crate::retry::{with_retry, RetryPolicy};
use crate::types::{AccessToken, ProviderArtist, TimeRange};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

#[derive(Debug, Deserialize)]
struct TopArtistsResponse {
    #[serde(default)]
    items: Vec<RawArtist>,
}

#[derive(Debug, Deserialize)]
struct RawArtist {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    images: Vec<RawImage>,
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    url: String,
}

impl RawArtist {
    fn into_artist(self) -> Option<ProviderArtist> {
        let id = self.id.filter(|s| !s.trim().is_empty())?;
        let name = self.name.filter(|s| !s.trim().is_empty())?;
        Some(ProviderArtist {
            id,
            name,
            image_url: self.images.into_iter().next().map(|i| i.url),
            genres: self.genres,
        })
    }
}

/// Result of an authorization-code exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

impl TokenResponse {
    pub fn token(&self) -> AccessToken {
        AccessToken::new(self.access_token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    error_description: Option<String>,
}

/// Spotify Web API client: top artists plus the OAuth helpers
pub struct SpotifyClient {
    client: reqwest::Client,
    config: SpotifyConfig,
    retry: RetryPolicy,
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConcertError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config: config.spotify.clone(),
            retry: RetryPolicy::new(&config.retry, config.spotify.timeout()),
        })
    }

    /// URL the user visits to grant `user-top-read`
    pub fn authorize_url(&self, redirect_uri: &str) -> Result<String> {
        let base = format!("{}/authorize", self.config.accounts_base.trim_end_matches('/'));
        let url = reqwest::Url::parse_with_params(
            &base,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("scope", SPOTIFY_SCOPES),
            ],
        )
        .map_err(|e| ConcertError::Config(format!("Invalid accounts URL '{}': {}", base, e)))?;
        Ok(url.to_string())
    }

    /// Trades an authorization code for an access token. Codes are single
    /// use, so this is attempted once.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        let url = format!("{}/api/token", self.config.accounts_base.trim_end_matches('/'));
        let policy = RetryPolicy::once(self.config.timeout());

        with_retry(SPOTIFY_SERVICE, "exchange_code", &policy, || async {
            let resp = self
                .client
                .post(&url)
                .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
                .form(&[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri),
                ])
                .send()
                .await
                .map_err(|e| ConcertError::from_reqwest(SPOTIFY_SERVICE, e))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                if let Ok(err) = serde_json::from_str::<TokenErrorBody>(&body) {
                    let detail = err.error_description.unwrap_or_else(|| err.error.clone());
                    match err.error.as_str() {
                        "invalid_grant" => return Err(ConcertError::Auth(detail)),
                        "invalid_client" => {
                            return Err(ConcertError::Config(format!("Spotify client credentials rejected: {}", detail)))
                        }
                        _ => {}
                    }
                }
                return Err(status_error(SPOTIFY_SERVICE, status, &body));
            }

            let token: TokenResponse = resp
                .json()
                .await
                .map_err(|e| ConcertError::upstream(SPOTIFY_SERVICE, format!("token parse failed: {}", e)))?;
            info!("Exchanged authorization code for access token");
            Ok(token)
        })
        .await
    }

    async fn request_top_artists(
        &self,
        token: &AccessToken,
        window: TimeRange,
        limit: u32,
    ) -> Result<Vec<ProviderArtist>> {
        let url = format!("{}/me/top/artists", self.config.api_base.trim_end_matches('/'));
        let limit = limit.to_string();
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token.as_str())
            .query(&[("time_range", window.as_param()), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| ConcertError::from_reqwest(SPOTIFY_SERVICE, e))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ConcertError::Auth(
                "Spotify rejected the access token; sign in again".into(),
            ));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(SPOTIFY_SERVICE, status, &body));
        }

        let body: TopArtistsResponse = resp.json().await.map_err(|e| {
            ConcertError::upstream(SPOTIFY_SERVICE, format!("top artists parse failed: {}", e))
        })?;

        let total = body.items.len();
        let artists: Vec<ProviderArtist> = body
            .items
            .into_iter()
            .filter_map(RawArtist::into_artist)
            .collect();
        if artists.len() < total {
            debug!(
                dropped = total - artists.len(),
                "Dropped artist records missing id or name"
            );
        }
        Ok(artists)
    }
}

#[async_trait]
impl ListeningHistoryPort for SpotifyClient {
    #[instrument(skip(self, token, window), fields(window = %window))]
    async fn top_artists(
        &self,
        token: &AccessToken,
        window: TimeRange,
        limit: u32,
    ) -> Result<Vec<ProviderArtist>> {
        let artists = with_retry(SPOTIFY_SERVICE, "top_artists", &self.retry, || {
            self.request_top_artists(token, window, limit)
        })
        .await?;
        debug!("Fetched {} top artists", artists.len());
        Ok(artists)
    }
}
