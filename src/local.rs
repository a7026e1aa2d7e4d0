//! Local-side item collections and their grouped views.

use std::collections::HashMap;

use camino::Utf8PathBuf;
use itertools::Itertools;

use crate::error::MusifyError;
use crate::field::{Field, HasFields, TagValue};
use crate::item::{Matchable, MatchableCollection, TAG_SEP};
use crate::local::track::LocalTrack;
use crate::remote::Uri;

pub mod library;
pub mod playlist;
pub mod track;

/// A typed lookup into a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemQuery {
    Index(usize),
    Name(String),
    Uri(Uri),
    Path(Utf8PathBuf),
}

/// An ordered, named collection of local tracks.
///
/// Aggregate values (artist, year, length, compilation) are computed when
/// the collection is built or extended; editing a contained track's URI
/// never changes them.
#[derive(Debug, Clone, Default)]
pub struct TrackCollection {
    pub name: String,
    /// The grouping field when this collection is a library view.
    pub grouped_on: Option<Field>,
    tracks: Vec<LocalTrack>,
    compilation: Option<bool>,
    artist: Option<String>,
    year: Option<i32>,
    length: Option<f64>,
}

impl TrackCollection {
    pub fn from_tracks(name: impl Into<String>, tracks: Vec<LocalTrack>) -> Self {
        let mut collection = TrackCollection {
            name: name.into(),
            tracks,
            ..Default::default()
        };
        collection.refresh_aggregates();
        collection
    }

    /// Build a view grouped on ``field``: every track's value must equal the
    /// group name (or contain it, for list tags).
    pub fn grouped(
        field: Field,
        name: impl Into<String>,
        tracks: Vec<LocalTrack>,
    ) -> Result<Self, MusifyError> {
        let name = name.into();
        for track in &tracks {
            let matches = match track.field(field) {
                TagValue::Str(value) => value == name,
                TagValue::StrList(values) => values.iter().any(|value| value == &name),
                other => group_value_matches(&other, &name),
            };
            if !matches {
                return Err(MusifyError::Composition {
                    field,
                    name,
                    found: format!("{:?}", track.field(field)),
                });
            }
        }

        let mut collection = Self::from_tracks(name, tracks);
        collection.grouped_on = Some(field);
        Ok(collection)
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    /// Mutable access for URI assignment; aggregates are not recomputed.
    pub fn tracks_mut(&mut self) -> &mut [LocalTrack] {
        &mut self.tracks
    }

    pub fn into_tracks(self) -> Vec<LocalTrack> {
        self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// `Some(false)` marks a non-compilation album or folder view,
    /// `Some(true)` a compilation, `None` a loose set (e.g. a playlist).
    /// Only album-shaped views report a value: the flag drives whether the
    /// searcher may treat the collection as one release.
    pub fn compilation(&self) -> Option<bool> {
        match self.grouped_on {
            Some(Field::Album | Field::Folder) => self.compilation,
            _ => None,
        }
    }

    /// Contains-check by URI when both sides have one, else by path.
    pub fn contains(&self, track: &LocalTrack) -> bool {
        self.tracks.iter().any(|existing| existing == track)
    }

    /// Append a track, skipping it when already contained unless
    /// ``allow_duplicates``. Returns whether the track was added.
    pub fn push(&mut self, track: LocalTrack, allow_duplicates: bool) -> bool {
        if !allow_duplicates && self.contains(&track) {
            return false;
        }
        self.tracks.push(track);
        self.refresh_aggregates();
        true
    }

    /// Extend with the given tracks; returns how many were added.
    pub fn extend(
        &mut self,
        tracks: impl IntoIterator<Item = LocalTrack>,
        allow_duplicates: bool,
    ) -> usize {
        let mut added = 0;
        for track in tracks {
            if allow_duplicates || !self.contains(&track) {
                self.tracks.push(track);
                added += 1;
            }
        }
        if added > 0 {
            self.refresh_aggregates();
        }
        added
    }

    pub fn get_by_index(&self, index: usize) -> Option<&LocalTrack> {
        self.tracks.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&LocalTrack> {
        self.tracks.iter().find(|track| track.name() == name)
    }

    pub fn get_by_uri(&self, uri: &Uri) -> Option<&LocalTrack> {
        self.tracks.iter().find(|track| track.uri() == Some(uri))
    }

    pub fn get_by_path(&self, path: &Utf8PathBuf) -> Option<&LocalTrack> {
        let path = path.as_str().to_lowercase();
        self.tracks
            .iter()
            .find(|track| track.path.as_str().to_lowercase() == path)
    }

    pub fn find(&self, query: &ItemQuery) -> Option<&LocalTrack> {
        match query {
            ItemQuery::Index(index) => self.get_by_index(*index),
            ItemQuery::Name(name) => self.get_by_name(name),
            ItemQuery::Uri(uri) => self.get_by_uri(uri),
            ItemQuery::Path(path) => self.get_by_path(path),
        }
    }

    /// Valid URIs in track order, for pushing to a remote playlist.
    pub fn uris(&self) -> Vec<Uri> {
        self.tracks.iter().filter_map(|track| track.uri().cloned()).collect()
    }

    fn refresh_aggregates(&mut self) {
        self.artist = most_common_artists(&self.tracks);
        self.year = most_common_year(&self.tracks);

        let lengths: Vec<f64> = self.tracks.iter().filter_map(|t| t.props.length).collect();
        self.length = (!lengths.is_empty()).then(|| lengths.iter().sum());

        let flagged = self.tracks.iter().filter(|t| t.tags.compilation).count();
        self.compilation =
            (!self.tracks.is_empty()).then(|| flagged * 2 > self.tracks.len());
    }
}

fn group_value_matches(value: &TagValue, name: &str) -> bool {
    match value {
        TagValue::Int(n) => n.to_string() == name,
        TagValue::Float(n) => n.to_string() == name,
        TagValue::Bool(b) => b.to_string() == name,
        TagValue::Date(d) => d.to_string() == name,
        TagValue::DateTime(d) => d.to_string() == name,
        _ => false,
    }
}

/// All artists across the tracks, ordered by frequency of appearance.
fn most_common_artists(tracks: &[LocalTrack]) -> Option<String> {
    let counts = tracks
        .iter()
        .filter_map(|track| track.tags.artist.as_deref())
        .flat_map(|artist| artist.split(TAG_SEP))
        .counts();
    if counts.is_empty() {
        return None;
    }
    let ordered: Vec<&str> = counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(artist, _)| artist)
        .collect();
    Some(ordered.join(TAG_SEP))
}

fn most_common_year(tracks: &[LocalTrack]) -> Option<i32> {
    tracks
        .iter()
        .filter_map(|track| track.tags.year)
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(year, _)| year)
        .next()
}

impl Matchable for TrackCollection {
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
        match self.grouped_on {
            Some(Field::Album) => Some(&self.name),
            _ => None,
        }
    }
    fn length(&self) -> Option<f64> {
        self.length
    }
    fn year(&self) -> Option<i32> {
        self.year
    }
    fn uri(&self) -> Option<&Uri> {
        None
    }
}

impl MatchableCollection for TrackCollection {
    type Item = LocalTrack;

    fn items(&self) -> &[LocalTrack] {
        &self.tracks
    }
}

/// Group ``tracks`` into validated collections on ``field``, sorted by
/// group name.
pub fn grouped_collections(
    tracks: &[LocalTrack],
    field: Field,
) -> Result<Vec<TrackCollection>, MusifyError> {
    let groups: HashMap<String, Vec<&LocalTrack>> =
        crate::processor::sort::Sorter::group_by_field(tracks, field);
    groups
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .map(|(name, members)| {
            TrackCollection::grouped(field, name, members.into_iter().cloned().collect())
        })
        .collect()
}
