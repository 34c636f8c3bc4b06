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
use crate::cover::{self, CoverError, CoverSource, ImageGenerator, OpenAiImages};
use crate::models::CreatedPlaylist;
use crate::playlist;
use crate::preferences;
use crate::prompt::{build_messages, GenerationRequest};
use crate::recommend::{LanguageModel, OpenAiChat, RecommendError};
use crate::spotify::{SpotifyApi, SpotifyError};
use log::{error, info};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Your Spotify connection has expired, please log in again.")]
    SessionExpired(#[source] SpotifyError),
    #[error(transparent)]
    Recommend(#[from] RecommendError),
    #[error(transparent)]
    Cover(#[from] CoverError),
    #[error("Could not build the playlist: {0}")]
    Playlist(#[from] SpotifyError),
}

impl PipelineError {
    /// Whether the page should offer the login link again.
    pub fn needs_relogin(&self) -> bool {
        matches!(self, PipelineError::SessionExpired(_))
    }
}

/// Runs one generation cycle, one external call at a time.
pub struct Spotbot {
    model: Arc<dyn LanguageModel>,
    images: Arc<dyn ImageGenerator>,
}

impl Spotbot {
    pub fn new(model: Arc<dyn LanguageModel>, images: Arc<dyn ImageGenerator>) -> Self {
        Self { model, images }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(OpenAiChat::new(settings)),
            Arc::new(OpenAiImages::new(settings)),
        )
    }

    pub async fn run(
        &self,
        api: &dyn SpotifyApi,
        request: &GenerationRequest,
    ) -> Result<CreatedPlaylist, PipelineError> {
        // Any failure here is reported as an expired session, whatever the cause.
        let snapshot = preferences::extract(api).await.map_err(|e| {
            error!("Failed to read listening history: {}", e);
            PipelineError::SessionExpired(e)
        })?;

        let messages = build_messages(request, &snapshot);
        let recommendation = self.model.recommend(&messages).await?;
        if recommendation.songs.len() != request.song_count as usize {
            info!(
                "Asked for {} songs, model returned {}",
                request.song_count,
                recommendation.songs.len()
            );
        }

        let cover = cover::prepare(CoverSource::select(request), self.images.as_ref()).await?;

        let created =
            playlist::assemble(api, &recommendation, request, cover.as_deref()).await?;
        info!(
            "Playlist ready: {} ({} tracks, {} unmatched)",
            created.url,
            created.tracks_added,
            created.unmatched.len()
        );
        Ok(created)
    }
}
