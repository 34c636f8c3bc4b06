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

use crate::models::PlaylistRef;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{debug, warn};
use reqwest::{header, Client};
use rspotify::{
    model::{PlayableId, PlaylistId, SearchResult, SearchType, TrackId, UserId},
    prelude::*,
    AuthCodeSpotify, Token,
};
use thiserror::Error;

pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

pub use rspotify::model::TimeRange as HistoryRange;

#[derive(Error, Debug)]
pub enum SpotifyError {
    #[error("Spotify API error: {0}")]
    Client(#[from] rspotify::ClientError),
    #[error("Invalid Spotify ID: {0}")]
    InvalidId(String),
    #[error("Unexpected Spotify response: {0}")]
    Unexpected(String),
    #[error("Spotify request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Spotify API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// The subset of the Spotify Web API a generation cycle needs.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    async fn top_tracks(
        &self,
        range: HistoryRange,
        limit: u32,
    ) -> Result<Vec<String>, SpotifyError>;

    async fn top_artists(
        &self,
        range: HistoryRange,
        limit: u32,
    ) -> Result<Vec<String>, SpotifyError>;

    /// Returns the URI of the first track matching `query`, if any.
    async fn search_track(&self, query: &str) -> Result<Option<String>, SpotifyError>;

    async fn current_user_id(&self) -> Result<String, SpotifyError>;

    /// Creates a private, non-collaborative playlist owned by `user_id`.
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<PlaylistRef, SpotifyError>;

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), SpotifyError>;

    /// Uploads a base64-encoded JPEG as the playlist cover.
    async fn upload_cover(
        &self,
        playlist_id: &str,
        jpeg_base64: &str,
    ) -> Result<(), SpotifyError>;
}

/// Client handle bound to a single user's access token.
///
/// rspotify has no cover upload endpoint, so that one call goes through
/// `reqwest` with the same token.
pub struct SpotifyClient {
    spotify: AuthCodeSpotify,
    http: Client,
    api_url: String,
    access_token: String,
}

impl SpotifyClient {
    /// Wraps an access token obtained from the token endpoint.
    ///
    /// No refresh token is kept: once the token expires every call fails and the
    /// user is sent back to the login link.
    pub fn from_access_token(access_token: String, expires_in_secs: i64) -> Self {
        let expires_in = Duration::seconds(expires_in_secs);
        let token = Token {
            access_token: access_token.clone(),
            expires_in,
            expires_at: Some(Utc::now() + expires_in),
            ..Default::default()
        };
        Self {
            spotify: AuthCodeSpotify::from_token(token),
            http: Client::new(),
            api_url: SPOTIFY_API_URL.to_string(),
            access_token,
        }
    }

    /// Points the raw `reqwest` calls at another Web API host.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

fn playlist_id(id: &str) -> Result<PlaylistId<'static>, SpotifyError> {
    PlaylistId::from_id(id)
        .map(|id| id.into_static())
        .map_err(|_| SpotifyError::InvalidId(id.to_string()))
}

fn playable_ids(uris: &[String]) -> Result<Vec<PlayableId<'static>>, SpotifyError> {
    uris.iter()
        .map(|uri| {
            TrackId::from_uri(uri)
                .map(|id| PlayableId::Track(id.into_static()))
                .map_err(|_| SpotifyError::InvalidId(uri.clone()))
        })
        .collect()
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn top_tracks(
        &self,
        range: HistoryRange,
        limit: u32,
    ) -> Result<Vec<String>, SpotifyError> {
        let page = self
            .spotify
            .current_user_top_tracks_manual(Some(range), Some(limit), None)
            .await?;
        Ok(page.items.into_iter().map(|track| track.name).collect())
    }

    async fn top_artists(
        &self,
        range: HistoryRange,
        limit: u32,
    ) -> Result<Vec<String>, SpotifyError> {
        let page = self
            .spotify
            .current_user_top_artists_manual(Some(range), Some(limit), None)
            .await?;
        Ok(page.items.into_iter().map(|artist| artist.name).collect())
    }

    async fn search_track(&self, query: &str) -> Result<Option<String>, SpotifyError> {
        let result = self
            .spotify
            .search(query, SearchType::Track, None, None, Some(1), None)
            .await?;

        match result {
            SearchResult::Tracks(page) => Ok(page
                .items
                .into_iter()
                .next()
                .and_then(|track| track.id)
                .map(|id| id.uri())),
            _ => Err(SpotifyError::Unexpected(format!(
                "search for '{}' did not return tracks",
                query
            ))),
        }
    }

    async fn current_user_id(&self) -> Result<String, SpotifyError> {
        let user = self.spotify.me().await?;
        Ok(user.id.id().to_string())
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<PlaylistRef, SpotifyError> {
        let user = UserId::from_id(user_id)
            .map_err(|_| SpotifyError::InvalidId(user_id.to_string()))?;

        let playlist = self
            .spotify
            .user_playlist_create(user, name, Some(false), Some(false), Some(description))
            .await?;

        let url = playlist
            .external_urls
            .get("spotify")
            .cloned()
            .ok_or_else(|| {
                SpotifyError::Unexpected(format!("playlist {} has no public URL", playlist.id))
            })?;

        Ok(PlaylistRef {
            id: playlist.id.id().to_string(),
            url,
        })
    }

    async fn add_tracks(&self, playlist: &str, uris: &[String]) -> Result<(), SpotifyError> {
        let id = playlist_id(playlist)?;
        let items = playable_ids(uris)?;
        debug!("Adding {} tracks to playlist {}", items.len(), playlist);
        self.spotify.playlist_add_items(id, items, None).await?;
        Ok(())
    }

    async fn upload_cover(
        &self,
        playlist: &str,
        jpeg_base64: &str,
    ) -> Result<(), SpotifyError> {
        let id = playlist_id(playlist)?;
        let response = self
            .http
            .put(format!("{}/playlists/{}/images", self.api_url, id.id()))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(header::CONTENT_TYPE, "image/jpeg")
            .body(jpeg_base64.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Cover upload for {} failed with HTTP {}", playlist, status);
            return Err(SpotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Cover uploaded to playlist {}", playlist);
        Ok(())
    }
}
