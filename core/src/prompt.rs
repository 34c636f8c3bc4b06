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

use crate::cover::to_upload_jpeg;
use crate::models::PreferenceSnapshot;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_SONGS: u32 = 1;
pub const MAX_SONGS: u32 = 30;
pub const DEFAULT_SONGS: u32 = 10;

pub const MAX_PROMPT_CHARS: usize = 100;
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 300;
pub const MAX_IMAGE_PROMPT_CHARS: usize = 100;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RequestError {
    #[error("Please provide a playlist description before submitting.")]
    EmptyPrompt,
    #[error("Song count must be a number between 1 and 30, got '{0}'")]
    SongCount(String),
    #[error("The uploaded cover could not be read as a PNG or JPEG image.")]
    InvalidImage,
    #[error("{field} is limited to {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Raw form input, exactly as submitted.
#[derive(Debug, Clone, Default)]
pub struct PlaylistForm {
    pub prompt: String,
    pub song_count: String,
    pub title: String,
    pub description: String,
    pub upload: Option<Vec<u8>>,
    pub image_prompt: String,
}

/// A validated generation request. Blank optional fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub song_count: u32,
    pub title: Option<String>,
    pub description: Option<String>,
    /// The uploaded cover, already re-encoded as a base64 JPEG.
    pub upload_jpeg: Option<String>,
    pub image_prompt: Option<String>,
}

fn check_len(value: &str, field: &'static str, max: usize) -> Result<(), RequestError> {
    if value.chars().count() > max {
        return Err(RequestError::TooLong { field, max });
    }
    Ok(())
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl TryFrom<PlaylistForm> for GenerationRequest {
    type Error = RequestError;

    fn try_from(form: PlaylistForm) -> Result<Self, Self::Error> {
        let prompt = form.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(RequestError::EmptyPrompt);
        }
        let song_count = form
            .song_count
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|count| (MIN_SONGS..=MAX_SONGS).contains(count))
            .ok_or_else(|| RequestError::SongCount(form.song_count.trim().to_string()))?;

        check_len(&prompt, "Prompt", MAX_PROMPT_CHARS)?;
        check_len(form.title.trim(), "Playlist title", MAX_TITLE_CHARS)?;
        check_len(form.description.trim(), "Playlist description", MAX_DESCRIPTION_CHARS)?;
        check_len(form.image_prompt.trim(), "Cover description", MAX_IMAGE_PROMPT_CHARS)?;

        // Converted here so a broken file fails before any API call is made.
        let upload_jpeg = match form.upload.filter(|bytes| !bytes.is_empty()) {
            Some(bytes) => Some(to_upload_jpeg(&bytes).map_err(|e| {
                warn!("Rejected uploaded cover: {}", e);
                RequestError::InvalidImage
            })?),
            None => None,
        };

        Ok(Self {
            prompt,
            song_count,
            title: non_blank(form.title),
            description: non_blank(form.description),
            upload_jpeg,
            image_prompt: non_blank(form.image_prompt),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

const SYSTEM_PROMPT: &str = "You are spotbot, world's best music recommendation AI. \
Given a description of a user's music history of their top 10 artists and top 10 tracks, \
you will recommend different and fresh songs tailored to a description provided by the user.";

/// Assembles the conversation sent to the language model.
pub fn build_messages(
    request: &GenerationRequest,
    snapshot: &PreferenceSnapshot,
) -> Vec<ChatMessage> {
    let mut user = format!(
        "The following is the user's music history:\n\
         This user likes the following artists: {:?}\n\
         This user likes the following songs: {:?}\n\
         Create a playlist with {} different and new songs that fits the following description: '''{}'''.",
        snapshot.artist_names, snapshot.track_names, request.song_count, request.prompt
    );

    if let Some(title) = &request.title {
        user.push_str(&format!("\nPlaylist Name: {}", title));
    }
    if let Some(description) = &request.description {
        user.push_str(&format!("\nPlaylist Description: {}", description));
    }

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}
