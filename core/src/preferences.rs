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

use crate::models::PreferenceSnapshot;
use crate::spotify::{HistoryRange, SpotifyApi, SpotifyError};
use log::debug;

pub const TOP_ITEMS_LIMIT: u32 = 10;
pub const TOP_ITEMS_RANGE: HistoryRange = HistoryRange::MediumTerm;

/// Fetches the user's top tracks and top artists, in Spotify's ranking order.
pub async fn extract(api: &dyn SpotifyApi) -> Result<PreferenceSnapshot, SpotifyError> {
    let track_names = api.top_tracks(TOP_ITEMS_RANGE, TOP_ITEMS_LIMIT).await?;
    let artist_names = api.top_artists(TOP_ITEMS_RANGE, TOP_ITEMS_LIMIT).await?;

    debug!(
        "Listening history: {} tracks, {} artists",
        track_names.len(),
        artist_names.len()
    );

    Ok(PreferenceSnapshot {
        track_names,
        artist_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeSpotify};

    #[tokio::test]
    async fn test_extract_keeps_ranking_order() {
        let spotify = FakeSpotify::with_history();

        let snapshot = extract(&spotify).await.unwrap();

        assert_eq!(snapshot.track_names, vec!["Pink + White", "Sofia"]);
        assert_eq!(snapshot.artist_names, vec!["Frank Ocean", "Clairo"]);
        assert_eq!(spotify.calls(), vec![Call::TopTracks, Call::TopArtists]);
    }

    #[tokio::test]
    async fn test_extract_caps_at_ten_items() {
        let spotify = FakeSpotify {
            top_tracks: (0..25).map(|i| format!("Track {}", i)).collect(),
            top_artists: (0..3).map(|i| format!("Artist {}", i)).collect(),
            ..Default::default()
        };

        let snapshot = extract(&spotify).await.unwrap();

        assert_eq!(snapshot.track_names.len(), 10);
        assert_eq!(snapshot.artist_names.len(), 3);
    }

    #[tokio::test]
    async fn test_extract_stops_at_first_failure() {
        let spotify = FakeSpotify {
            fail_top_items: true,
            ..Default::default()
        };

        assert!(extract(&spotify).await.is_err());
        assert_eq!(spotify.calls(), vec![Call::TopTracks]);
    }
}
