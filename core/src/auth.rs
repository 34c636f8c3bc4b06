/*
    spotbot | Web form that turns a mood prompt into a curated Spotify playlist.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::config::Settings;
use crate::spotify::SpotifyClient;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::StatusCode;
use rspotify::{scopes, AuthCodeSpotify, Credentials, OAuth};
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

pub const SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Sessions kept by [`AuthBridge`] before the oldest one is dropped.
pub const DEFAULT_SESSION_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Spotify authentication failed: {0}")]
    Spotify(#[from] rspotify::ClientError),
    #[error("Token endpoint rejected the authorization code (HTTP {0})")]
    Rejected(u16),
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Builds the Spotify login link the user follows to grant access.
///
/// Requested scopes:
/// - user-top-read: top tracks and artists feed the prompt.
/// - playlist-modify-private: the generated playlist is private.
/// - ugc-image-upload: custom cover art.
pub fn authorize_url(settings: &Settings) -> Result<String, AuthError> {
    let creds = Credentials::new(&settings.spotify_client_id, &settings.spotify_client_secret);
    let oauth = OAuth {
        redirect_uri: settings.base_url.clone(),
        scopes: scopes!("playlist-modify-private", "ugc-image-upload", "user-top-read"),
        ..Default::default()
    };

    let spotify = AuthCodeSpotify::new(creds, oauth);
    Ok(spotify.get_authorize_url(false)?)
}

/// Turns an authorization code into a ready-to-use client handle.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    type Handle: Send + Sync;

    async fn exchange(&self, code: &str) -> Result<Self::Handle, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Authorization-code exchange against the Spotify accounts service.
pub struct SpotifyAccounts {
    http: reqwest::Client,
    accounts_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyAccounts {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            accounts_url: SPOTIFY_ACCOUNTS_URL.to_string(),
            client_id: settings.spotify_client_id.clone(),
            client_secret: settings.spotify_client_secret.clone(),
            redirect_uri: settings.base_url.clone(),
        }
    }

    /// Points the exchange at another accounts host.
    pub fn with_accounts_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TokenExchange for SpotifyAccounts {
    type Handle = SpotifyClient;

    async fn exchange(&self, code: &str) -> Result<SpotifyClient, AuthError> {
        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Token exchange rejected with HTTP {}", status);
            return Err(AuthError::Rejected(status.as_u16()));
        }

        let token: TokenResponse = response.json().await?;
        info!("Spotify access token obtained (expires in {}s)", token.expires_in);
        Ok(SpotifyClient::from_access_token(
            token.access_token,
            token.expires_in,
        ))
    }
}

struct SessionCache<H> {
    entries: HashMap<String, Arc<H>>,
    order: VecDeque<String>,
}

impl<H> SessionCache<H> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn insert(&mut self, code: &str, handle: Arc<H>, capacity: usize) {
        while self.entries.len() >= capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(code.to_string());
        self.entries.insert(code.to_string(), handle);
    }
}

/// Keyed store of client handles, one per authorization code.
///
/// A code can only be exchanged once, so page reloads that carry the same
/// `?code=` must reuse the stored handle. Failed exchanges are not stored.
pub struct AuthBridge<X: TokenExchange> {
    exchange: X,
    capacity: usize,
    sessions: Mutex<SessionCache<X::Handle>>,
}

impl<X: TokenExchange> AuthBridge<X> {
    pub fn new(exchange: X) -> Self {
        Self::with_capacity(exchange, DEFAULT_SESSION_CAPACITY)
    }

    pub fn with_capacity(exchange: X, capacity: usize) -> Self {
        Self {
            exchange,
            capacity: capacity.max(1),
            sessions: Mutex::new(SessionCache::new()),
        }
    }

    /// The lock is never held across the exchange, so a slow token endpoint
    /// only delays the request that is waiting on it.
    pub async fn connect(&self, code: &str) -> Result<Arc<X::Handle>, AuthError> {
        if let Some(handle) = self.sessions.lock().await.entries.get(code) {
            debug!("Reusing stored Spotify session");
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(self.exchange.exchange(code).await?);

        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.entries.get(code) {
            return Ok(Arc::clone(existing));
        }
        sessions.insert(code, Arc::clone(&handle), self.capacity);
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct CountingExchange {
        calls: AtomicUsize,
        reject: bool,
        /// Codes whose exchange stalls for a few seconds.
        slow: Option<&'static str>,
    }

    impl CountingExchange {
        fn new(reject: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reject,
                slow: None,
            }
        }
    }

    #[async_trait]
    impl TokenExchange for CountingExchange {
        type Handle = String;

        async fn exchange(&self, code: &str) -> Result<String, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.slow == Some(code) {
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            if self.reject {
                Err(AuthError::Rejected(400))
            } else {
                Ok(format!("token-for-{}", code))
            }
        }
    }

    fn test_settings() -> Settings {
        Settings {
            spotify_client_id: "client-id".to_string(),
            spotify_client_secret: "client-secret".to_string(),
            base_url: "http://localhost:8501/".to_string(),
            openai_api_key: "sk-test".to_string(),
            openai_base_url: "http://localhost".to_string(),
            chat_model: "test-chat".to_string(),
            image_model: "test-image".to_string(),
        }
    }

    #[tokio::test]
    async fn test_connect_reuses_handle_for_same_code() {
        let bridge = AuthBridge::new(CountingExchange::new(false));

        let first = bridge.connect("abc").await.unwrap();
        let second = bridge.connect("abc").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, "token-for-abc");
        assert_eq!(bridge.exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_exchange_does_not_block_stored_sessions() {
        let exchange = CountingExchange {
            slow: Some("slow"),
            ..CountingExchange::new(false)
        };
        let bridge = Arc::new(AuthBridge::new(exchange));
        bridge.connect("fast").await.unwrap();

        let pending = {
            let bridge = Arc::clone(&bridge);
            tokio::spawn(async move { bridge.connect("slow").await.map(|h| (*h).clone()) })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let cached = tokio::time::timeout(Duration::from_millis(500), bridge.connect("fast"))
            .await
            .expect("stored session lookup waited on another exchange")
            .unwrap();
        assert_eq!(*cached, "token-for-fast");

        assert_eq!(pending.await.unwrap().unwrap(), "token-for-slow");
        assert_eq!(bridge.exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connect_failures_are_not_stored() {
        let bridge = AuthBridge::new(CountingExchange::new(true));

        assert!(matches!(
            bridge.connect("expired").await,
            Err(AuthError::Rejected(400))
        ));
        assert!(bridge.connect("expired").await.is_err());
        assert_eq!(bridge.exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connect_evicts_oldest_session() {
        let bridge = AuthBridge::with_capacity(CountingExchange::new(false), 2);

        bridge.connect("a").await.unwrap();
        bridge.connect("b").await.unwrap();
        bridge.connect("c").await.unwrap();
        assert_eq!(bridge.exchange.calls.load(Ordering::SeqCst), 3);

        // "b" and "c" are still stored, "a" was dropped.
        bridge.connect("c").await.unwrap();
        bridge.connect("b").await.unwrap();
        assert_eq!(bridge.exchange.calls.load(Ordering::SeqCst), 3);
        bridge.connect("a").await.unwrap();
        assert_eq!(bridge.exchange.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_spotify_accounts_exchanges_code() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "BQD-access",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": "user-top-read"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let accounts = SpotifyAccounts::new(&test_settings()).with_accounts_url(mock_server.uri());
        let bridge = AuthBridge::new(accounts);

        let first = bridge.connect("the-code").await.unwrap();
        let second = bridge.connect("the-code").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_spotify_accounts_non_200_is_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Authorization code expired"
            })))
            .mount(&mock_server)
            .await;

        let accounts = SpotifyAccounts::new(&test_settings()).with_accounts_url(mock_server.uri());
        let result = accounts.exchange("stale-code").await;

        assert!(matches!(result, Err(AuthError::Rejected(400))));
    }

    #[test]
    fn test_authorize_url_carries_client_and_scopes() {
        let url = authorize_url(&test_settings()).unwrap();

        assert!(url.starts_with("https://accounts.spotify.com/authorize"));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("user-top-read"));
        assert!(url.contains("ugc-image-upload"));
    }
}
