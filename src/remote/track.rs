//! Remote catalogue items backed by raw API responses.
//!
//! Typed accessors are extracted once at construction; `reload` replaces the
//! whole response through the API handle.

use serde_json::Value;

use crate::error::ApiError;
use crate::item::{Matchable, MatchableCollection, TAG_SEP};
use crate::remote::api::RemoteApi;
use crate::remote::id::{ObjectKind, Uri};

/// A single track from the remote catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTrack {
    pub response: Value,
    pub uri: Uri,
    pub name: String,
    /// All artists joined with [`TAG_SEP`].
    pub artist: Option<String>,
    pub album: Option<String>,
    pub length: Option<f64>,
    pub year: Option<i32>,
    pub track_number: Option<u32>,
}

impl RemoteTrack {
    pub fn from_response(response: Value) -> Result<Self, ApiError> {
        let uri = response["uri"]
            .as_str()
            .map(|uri| Uri(uri.to_string()))
            .ok_or_else(|| ApiError::InvalidResponse("track response has no uri".to_string()))?;

        let name = response["name"].as_str().unwrap_or_default().to_string();
        let artist = join_artist_names(&response["artists"]);
        let album = response["album"]["name"].as_str().map(str::to_string);
        let length = response["duration_ms"].as_f64().map(|ms| ms / 1000.0);
        let year = response["album"]["release_date"]
            .as_str()
            .and_then(parse_release_year);
        let track_number = response["track_number"].as_u64().map(|n| n as u32);

        Ok(RemoteTrack {
            response,
            uri,
            name,
            artist,
            album,
            length,
            year,
            track_number,
        })
    }

    /// Fetch a fresh response for this track and re-extract all fields.
    pub async fn reload(&mut self, api: &dyn RemoteApi, use_cache: bool) -> Result<(), ApiError> {
        let responses = api
            .get_items(&[self.uri.0.clone()], ObjectKind::Track, 1, false, use_cache)
            .await?;
        let response = responses
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(self.uri.0.clone()))?;
        *self = RemoteTrack::from_response(response)?;
        Ok(())
    }
}

impl Matchable for RemoteTrack {
    fn name(&self) -> &str {
        &self.name
    }
    fn title(&self) -> Option<&str> {
        Some(&self.name)
    }
    fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }
    fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }
    fn length(&self) -> Option<f64> {
        self.length
    }
    fn year(&self) -> Option<i32> {
        self.year
    }
    fn uri(&self) -> Option<&Uri> {
        Some(&self.uri)
    }
}

/// An album from the remote catalogue with its (possibly partial) track
/// list. `track_total` reports the catalogue's count even before all pages
/// of tracks are loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteAlbum {
    pub response: Value,
    pub uri: Uri,
    pub name: String,
    pub artist: Option<String>,
    pub year: Option<i32>,
    pub track_total: usize,
    pub compilation: bool,
    pub tracks: Vec<RemoteTrack>,
}

impl RemoteAlbum {
    pub fn from_response(response: Value) -> Result<Self, ApiError> {
        let uri = response["uri"]
            .as_str()
            .map(|uri| Uri(uri.to_string()))
            .ok_or_else(|| ApiError::InvalidResponse("album response has no uri".to_string()))?;

        let name = response["name"].as_str().unwrap_or_default().to_string();
        let artist = join_artist_names(&response["artists"]);
        let year = response["release_date"].as_str().and_then(parse_release_year);
        let compilation = response["album_type"].as_str() == Some("compilation");

        let mut tracks = Vec::new();
        if let Some(items) = response["tracks"]["items"].as_array() {
            for item in items {
                let mut track = RemoteTrack::from_response(item.clone())?;
                // album-scoped track responses omit their parent album
                track.album.get_or_insert_with(|| name.clone());
                if track.year.is_none() {
                    track.year = year;
                }
                tracks.push(track);
            }
        }
        let track_total = response["total_tracks"]
            .as_u64()
            .or(response["tracks"]["total"].as_u64())
            .map(|n| n as usize)
            .unwrap_or(tracks.len());

        Ok(RemoteAlbum {
            response,
            uri,
            name,
            artist,
            year,
            track_total,
            compilation,
            tracks,
        })
    }

    /// Fetch the full album, extended with all pages of its tracks.
    pub async fn reload(&mut self, api: &dyn RemoteApi, use_cache: bool) -> Result<(), ApiError> {
        let responses = api
            .get_items(&[self.uri.0.clone()], ObjectKind::Album, 1, true, use_cache)
            .await?;
        let response = responses
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(self.uri.0.clone()))?;
        *self = RemoteAlbum::from_response(response)?;
        Ok(())
    }
}

impl Matchable for RemoteAlbum {
    fn name(&self) -> &str {
        &self.name
    }
    fn title(&self) -> Option<&str> {
        None
    }
    fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }
    fn album(&self) -> Option<&str> {
        Some(&self.name)
    }
    fn length(&self) -> Option<f64> {
        let lengths: Vec<f64> = self.tracks.iter().filter_map(|t| t.length).collect();
        (!lengths.is_empty()).then(|| lengths.iter().sum())
    }
    fn year(&self) -> Option<i32> {
        self.year
    }
    fn uri(&self) -> Option<&Uri> {
        Some(&self.uri)
    }
}

impl MatchableCollection for RemoteAlbum {
    type Item = RemoteTrack;

    fn items(&self) -> &[RemoteTrack] {
        &self.tracks
    }
}

fn join_artist_names(artists: &Value) -> Option<String> {
    let names: Vec<&str> = artists
        .as_array()?
        .iter()
        .filter_map(|artist| artist["name"].as_str())
        .collect();
    (!names.is_empty()).then(|| names.join(TAG_SEP))
}

/// The leading 4-digit year of a `YYYY[-MM[-DD]]` release date.
fn parse_release_year(date: &str) -> Option<i32> {
    let digits: String = date.chars().take_while(char::is_ascii_digit).collect();
    (digits.len() == 4).then(|| digits.parse().ok())?
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn track_response() -> Value {
        json!({
            "uri": "spotify:track:6rqhFgbbKwnb9MLmUQDhG6",
            "name": "Love Song",
            "artists": [{"name": "Alpha"}, {"name": "Beta"}],
            "album": {"name": "First Light", "release_date": "2004-06-01"},
            "duration_ms": 210_000,
            "track_number": 3,
        })
    }

    #[test]
    fn track_extracts_typed_fields() {
        let track = RemoteTrack::from_response(track_response()).unwrap();
        assert_eq!(track.name, "Love Song");
        assert_eq!(track.artist.as_deref(), Some("Alpha; Beta"));
        assert_eq!(track.album.as_deref(), Some("First Light"));
        assert_eq!(track.length, Some(210.0));
        assert_eq!(track.year, Some(2004));
        assert_eq!(track.track_number, Some(3));
    }

    #[test]
    fn track_without_uri_is_rejected() {
        assert!(RemoteTrack::from_response(json!({"name": "x"})).is_err());
    }

    #[test]
    fn album_inherits_name_and_year_into_tracks() {
        let album = RemoteAlbum::from_response(json!({
            "uri": "spotify:album:1rqhFgbbKwnb9MLmUQDhG6",
            "name": "First Light",
            "artists": [{"name": "Alpha"}],
            "release_date": "2004",
            "album_type": "album",
            "total_tracks": 2,
            "tracks": {"items": [
                {"uri": "spotify:track:2rqhFgbbKwnb9MLmUQDhG6", "name": "One", "duration_ms": 1000},
                {"uri": "spotify:track:3rqhFgbbKwnb9MLmUQDhG6", "name": "Two", "duration_ms": 2000},
            ], "total": 2},
        }))
        .unwrap();

        assert_eq!(album.track_total, 2);
        assert!(!album.compilation);
        assert_eq!(album.tracks[0].album.as_deref(), Some("First Light"));
        assert_eq!(album.tracks[1].year, Some(2004));
    }

    #[test]
    fn release_year_parses_partial_dates() {
        assert_eq!(parse_release_year("2004-06-01"), Some(2004));
        assert_eq!(parse_release_year("2004"), Some(2004));
        assert_eq!(parse_release_year("unknown"), None);
    }
}
