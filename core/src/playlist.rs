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

use crate::models::{CreatedPlaylist, Recommendation, RecommendedSong};
use crate::prompt::GenerationRequest;
use crate::spotify::{SpotifyApi, SpotifyError};
use log::{debug, info, warn};

pub const TITLE_PREFIX: &str = "spotbot - ";
pub const CREDIT: &str = "this playlist was generated by spotbot!";

/// User title if given, otherwise the model's name with the spotbot prefix.
pub fn playlist_title(request: &GenerationRequest, recommendation: &Recommendation) -> String {
    match &request.title {
        Some(title) => title.clone(),
        None => format!("{}{}", TITLE_PREFIX, recommendation.playlist_name),
    }
}

/// User description if given, otherwise the model's description plus the credit line.
pub fn playlist_description(
    request: &GenerationRequest,
    recommendation: &Recommendation,
) -> String {
    match &request.description {
        Some(description) => description.clone(),
        // Plain concatenation would glue the credit onto the last word, so
        // it is appended as a separate sentence.
        None => format!("{} {}", recommendation.playlist_description.trim_end(), CREDIT),
    }
}

/// Track URIs in recommendation order, plus the songs that found no match.
#[derive(Debug, Default)]
pub struct ResolvedTracks {
    pub uris: Vec<String>,
    pub unmatched: Vec<String>,
}

/// Issues one search per song and keeps the first hit, whatever it is.
pub async fn resolve_tracks(
    api: &dyn SpotifyApi,
    songs: &[RecommendedSong],
) -> Result<ResolvedTracks, SpotifyError> {
    let mut resolved = ResolvedTracks::default();

    for song in songs {
        let query = song.search_query();
        match api.search_track(&query).await? {
            Some(uri) => {
                debug!("{} -> {}", song, uri);
                resolved.uris.push(uri);
            }
            None => {
                warn!("No Spotify match for '{}', leaving it out", query);
                resolved.unmatched.push(song.to_string());
            }
        }
    }

    Ok(resolved)
}

/// Creates the private playlist, fills it and sets the cover.
pub async fn assemble(
    api: &dyn SpotifyApi,
    recommendation: &Recommendation,
    request: &GenerationRequest,
    cover_jpeg: Option<&str>,
) -> Result<CreatedPlaylist, SpotifyError> {
    let tracks = resolve_tracks(api, &recommendation.songs).await?;

    let name = playlist_title(request, recommendation);
    let description = playlist_description(request, recommendation);

    let user_id = api.current_user_id().await?;
    let playlist = api.create_playlist(&user_id, &name, &description).await?;
    info!("Created playlist '{}' ({})", name, playlist.id);

    if tracks.uris.is_empty() {
        warn!("No recommended song could be resolved, playlist {} stays empty", playlist.id);
    } else {
        api.add_tracks(&playlist.id, &tracks.uris).await?;
    }

    // The playlist already exists at this point, so a failed upload only
    // costs the cover.
    let cover_uploaded = match cover_jpeg {
        Some(jpeg) => match api.upload_cover(&playlist.id, jpeg).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cover upload for playlist {} failed: {}", playlist.id, e);
                false
            }
        },
        None => false,
    };

    Ok(CreatedPlaylist {
        id: playlist.id,
        name,
        description,
        url: playlist.url,
        tracks_added: tracks.uris.len(),
        cover_uploaded,
        unmatched: tracks.unmatched,
    })
}
