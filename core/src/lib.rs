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

pub mod auth;
pub mod config;
pub mod cover;
pub mod models;
pub mod pipeline;
pub mod playlist;
pub mod preferences;
pub mod prompt;
pub mod recommend;
pub mod spotify;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key items for convenience
pub use auth::{authorize_url, AuthBridge, AuthError, SpotifyAccounts, TokenExchange};
pub use config::Settings;
pub use models::{CreatedPlaylist, Recommendation, RecommendedSong};
pub use pipeline::{PipelineError, Spotbot};
pub use prompt::{GenerationRequest, PlaylistForm, RequestError};
pub use spotify::{SpotifyApi, SpotifyClient, SpotifyError};
