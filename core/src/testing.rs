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

//! In-memory doubles for the service seams, shared by unit tests.

use crate::cover::{CoverError, ImageGenerator};
use crate::models::{PlaylistRef, Recommendation, RecommendedSong};
use crate::prompt::ChatMessage;
use crate::recommend::{LanguageModel, RecommendError};
use crate::spotify::{HistoryRange, SpotifyApi, SpotifyError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    TopTracks,
    TopArtists,
    Search(String),
    Me,
    Create { name: String, description: String },
    Add { playlist: String, uris: Vec<String> },
    Upload { playlist: String, jpeg_base64: String },
}

#[derive(Default)]
pub struct FakeSpotify {
    pub top_tracks: Vec<String>,
    pub top_artists: Vec<String>,
    pub fail_top_items: bool,
    pub fail_upload: bool,
    /// Queries for which the search comes back empty.
    pub no_match: HashSet<String>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeSpotify {
    pub fn with_history() -> Self {
        Self {
            top_tracks: vec!["Pink + White".to_string(), "Sofia".to_string()],
            top_artists: vec!["Frank Ocean".to_string(), "Clairo".to_string()],
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn searches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Search(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SpotifyApi for FakeSpotify {
    async fn top_tracks(
        &self,
        _range: HistoryRange,
        limit: u32,
    ) -> Result<Vec<String>, SpotifyError> {
        self.record(Call::TopTracks);
        if self.fail_top_items {
            return Err(SpotifyError::Unexpected("connection reset".to_string()));
        }
        Ok(self.top_tracks.iter().take(limit as usize).cloned().collect())
    }

    async fn top_artists(
        &self,
        _range: HistoryRange,
        limit: u32,
    ) -> Result<Vec<String>, SpotifyError> {
        self.record(Call::TopArtists);
        if self.fail_top_items {
            return Err(SpotifyError::Unexpected("connection reset".to_string()));
        }
        Ok(self.top_artists.iter().take(limit as usize).cloned().collect())
    }

    async fn search_track(&self, query: &str) -> Result<Option<String>, SpotifyError> {
        self.record(Call::Search(query.to_string()));
        if self.no_match.contains(query) {
            return Ok(None);
        }
        Ok(Some(format!("spotify:track:fake{}", self.searches())))
    }

    async fn current_user_id(&self) -> Result<String, SpotifyError> {
        self.record(Call::Me);
        Ok("listener".to_string())
    }

    async fn create_playlist(
        &self,
        _user_id: &str,
        name: &str,
        description: &str,
    ) -> Result<PlaylistRef, SpotifyError> {
        self.record(Call::Create {
            name: name.to_string(),
            description: description.to_string(),
        });
        Ok(PlaylistRef {
            id: "playlist123".to_string(),
            url: "https://open.spotify.com/playlist/playlist123".to_string(),
        })
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), SpotifyError> {
        self.record(Call::Add {
            playlist: playlist_id.to_string(),
            uris: uris.to_vec(),
        });
        Ok(())
    }

    async fn upload_cover(
        &self,
        playlist_id: &str,
        jpeg_base64: &str,
    ) -> Result<(), SpotifyError> {
        self.record(Call::Upload {
            playlist: playlist_id.to_string(),
            jpeg_base64: jpeg_base64.to_string(),
        });
        if self.fail_upload {
            return Err(SpotifyError::Api {
                status: 413,
                body: "payload too large".to_string(),
            });
        }
        Ok(())
    }
}

/// Language model that answers with a fixed recommendation.
pub struct FakeModel {
    pub recommendation: Recommendation,
    pub seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl FakeModel {
    pub fn with_songs(count: usize) -> Self {
        let songs = (1..=count)
            .map(|i| RecommendedSong {
                name: format!("Song {}", i),
                artists: vec![format!("Artist {}", i)],
            })
            .collect();
        Self {
            recommendation: Recommendation {
                playlist_name: "Bedroom Glow".to_string(),
                playlist_description: "Hazy guitars and soft vocals.".to_string(),
                songs,
            },
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn recommend(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Recommendation, RecommendError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        Ok(self.recommendation.clone())
    }
}

/// Image generator returning a tiny PNG and counting prompts.
#[derive(Default)]
pub struct FakeImages {
    pub prompts: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn requests(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, CoverError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(png_bytes(4, 4))
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([120, 40, 200, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
