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

use serde::{Deserialize, Serialize};
use std::fmt;

/// The user's listening history used to steer recommendations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceSnapshot {
    pub track_names: Vec<String>,
    pub artist_names: Vec<String>,
}

/// One song as suggested by the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedSong {
    #[serde(rename = "songname")]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
}

impl RecommendedSong {
    /// Search query sent to Spotify: song name followed by comma-joined artists.
    pub fn search_query(&self) -> String {
        format!("{} {}", self.name, self.artists.join(","))
    }
}

impl fmt::Display for RecommendedSong {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.artists.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} - {}", self.name, self.artists.join(", "))
        }
    }
}

/// Arguments of the `create_playlist` function call returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub playlist_name: String,
    pub playlist_description: String,
    pub songs: Vec<RecommendedSong>,
}

/// Playlist as returned by Spotify right after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    pub id: String,
    pub url: String,
}

/// Outcome of a full generation cycle, rendered as the final link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub tracks_added: usize,
    pub cover_uploaded: bool,
    /// Songs whose search returned nothing and were left out.
    pub unmatched: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_joins_artists_with_commas() {
        let song = RecommendedSong {
            name: "Sunday Candy".to_string(),
            artists: vec!["Donnie Trumpet".to_string(), "Chance the Rapper".to_string()],
        };

        assert_eq!(
            song.search_query(),
            "Sunday Candy Donnie Trumpet,Chance the Rapper"
        );
    }

    #[test]
    fn test_recommended_song_display() {
        let song = RecommendedSong {
            name: "Pink + White".to_string(),
            artists: vec!["Frank Ocean".to_string()],
        };
        assert_eq!(format!("{}", song), "Pink + White - Frank Ocean");

        let anonymous = RecommendedSong {
            name: "Intro".to_string(),
            artists: Vec::new(),
        };
        assert_eq!(format!("{}", anonymous), "Intro");
    }

    #[test]
    fn test_recommendation_parses_function_arguments() {
        let raw = r#"{
            "playlist_name": "Late Night Drift",
            "playlist_description": "Soft guitars for after midnight.",
            "songs": [
                {"songname": "Sofia", "artists": ["Clairo"]},
                {"songname": "Apocalypse", "artists": ["Cigarettes After Sex"]}
            ]
        }"#;

        let rec: Recommendation = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.playlist_name, "Late Night Drift");
        assert_eq!(rec.songs.len(), 2);
        assert_eq!(rec.songs[1].name, "Apocalypse");
        assert_eq!(rec.songs[1].artists, vec!["Cigarettes After Sex"]);
    }
}
