//! A track backed by a file on disk.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::Result;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use tracing::debug;

use crate::error::MusifyError;
use crate::field::{Field, HasFields, TagValue};
use crate::item::{Matchable, UriState};
use crate::remote::Uri;
use crate::scan::{self, FileProps, TagWriteResult, TrackTags};

/// A local file with its mutable tag set, immutable file properties, and
/// host-library state.
///
/// The remote URI lives inside the comments tag: absent means the track was
/// never matched, the reserved sentinel marks it unavailable on the remote
/// service, anything parsing as a URI is a confirmed match.
#[derive(Debug, Clone, Default)]
pub struct LocalTrack {
    pub path: Utf8PathBuf,
    pub tags: TrackTags,
    pub props: FileProps,
    uri: UriState,
    pub date_added: Option<DateTime>,
    pub last_played: Option<DateTime>,
    pub play_count: Option<i64>,
    pub rating: Option<f64>,
}

impl LocalTrack {
    /// Read the file at ``path`` and build a track from its tags.
    pub async fn load(path: Utf8PathBuf) -> Result<Self, MusifyError> {
        let (tags, props) = scan::read_path(&path).await.ok_or_else(|| MusifyError::TagIo {
            path: path.clone(),
            message: "no scanner recognised the file".to_string(),
        })?;
        Ok(Self::from_parts(path, tags, props))
    }

    /// Build a track from already-read tags. The URI state is derived from
    /// the comments tag.
    pub fn from_parts(path: Utf8PathBuf, tags: TrackTags, props: FileProps) -> Self {
        let uri = uri_from_comments(&tags);
        LocalTrack {
            path,
            tags,
            props,
            uri,
            ..Default::default()
        }
    }

    /// Track title, falling back to the file stem.
    pub fn name(&self) -> &str {
        self.tags
            .title
            .as_deref()
            .or_else(|| self.path.file_stem())
            .unwrap_or(self.path.as_str())
    }

    pub fn uri(&self) -> Option<&Uri> {
        self.uri.uri()
    }

    pub fn uri_state(&self) -> &UriState {
        &self.uri
    }

    pub fn has_uri(&self) -> Option<bool> {
        self.uri.has_uri()
    }

    /// Set the URI state, keeping the comments tag in sync so a later
    /// `save` persists it.
    pub fn set_uri(&mut self, state: UriState) {
        debug!(track = self.name(), from = ?self.uri, to = ?state, "uri change");
        self.tags
            .comments
            .retain(|comment| UriState::from_tag(comment) == UriState::Missing);
        if let Some(tag) = state.to_tag() {
            self.tags.comments.push(tag.to_string());
        }
        self.uri = state;
    }

    /// Write the current tags back to disk.
    pub fn save(&self, replace: bool, dry_run: bool) -> Result<TagWriteResult> {
        scan::write_tags(&self.path, &self.tags, replace, dry_run)
    }

    /// Re-read tags and properties from disk, replacing any local edits.
    pub async fn reload(&mut self) -> Result<(), MusifyError> {
        let fresh = Self::load(self.path.clone()).await?;
        self.tags = fresh.tags;
        self.props = fresh.props;
        self.uri = fresh.uri;
        Ok(())
    }

    pub fn folder(&self) -> Option<&str> {
        self.path.parent().and_then(Utf8Path::file_name)
    }

    fn date_modified(&self) -> Option<DateTime> {
        self.props
            .date_modified
            .map(|stamp| stamp.to_zoned(TimeZone::UTC).datetime())
    }
}

fn uri_from_comments(tags: &TrackTags) -> UriState {
    tags.comments
        .iter()
        .map(|comment| UriState::from_tag(comment))
        .find(|state| *state != UriState::Missing)
        .unwrap_or_default()
}

/// Equal by URI when either side has one, by path otherwise.
impl PartialEq for LocalTrack {
    fn eq(&self, other: &Self) -> bool {
        if self.has_uri() == Some(true) || other.has_uri() == Some(true) {
            self.uri == other.uri
        } else {
            self.path == other.path
        }
    }
}

impl Matchable for LocalTrack {
    fn name(&self) -> &str {
        LocalTrack::name(self)
    }
    fn title(&self) -> Option<&str> {
        self.tags.title.as_deref()
    }
    fn artist(&self) -> Option<&str> {
        self.tags.artist.as_deref()
    }
    fn album(&self) -> Option<&str> {
        self.tags.album.as_deref()
    }
    fn length(&self) -> Option<f64> {
        self.props.length
    }
    fn year(&self) -> Option<i32> {
        self.tags.year
    }
    fn uri(&self) -> Option<&Uri> {
        self.uri.uri()
    }
}

impl HasFields for LocalTrack {
    fn field(&self, field: Field) -> TagValue {
        fn str_value(value: &Option<String>) -> TagValue {
            value
                .as_deref()
                .map(|v| TagValue::Str(v.to_string()))
                .unwrap_or_default()
        }
        fn int_value(value: Option<u32>) -> TagValue {
            value.map(|v| TagValue::Int(v as i64)).unwrap_or_default()
        }

        match field {
            Field::Title => str_value(&self.tags.title),
            Field::Artist => str_value(&self.tags.artist),
            Field::Album => str_value(&self.tags.album),
            Field::AlbumArtist => str_value(&self.tags.album_artist),
            Field::TrackNumber => int_value(self.tags.track_number),
            Field::TrackTotal => int_value(self.tags.track_total),
            Field::DiscNumber => int_value(self.tags.disc_number),
            Field::DiscTotal => int_value(self.tags.disc_total),
            Field::Year => self.tags.year.map(|y| TagValue::Int(y as i64)).unwrap_or_default(),
            Field::Bpm => self.tags.bpm.map(TagValue::Float).unwrap_or_default(),
            Field::Key => str_value(&self.tags.key),
            Field::Genres => TagValue::StrList(self.tags.genres.clone()),
            Field::Comments => TagValue::StrList(self.tags.comments.clone()),
            Field::Compilation => TagValue::Bool(self.tags.compilation),
            Field::Length => self.props.length.map(TagValue::Float).unwrap_or_default(),
            Field::Rating => self
                .rating
                .or(self.tags.rating)
                .map(TagValue::Float)
                .unwrap_or_default(),
            Field::Path => TagValue::Str(self.path.to_string()),
            Field::Folder => self
                .folder()
                .map(|f| TagValue::Str(f.to_string()))
                .unwrap_or_default(),
            Field::Filename => self
                .path
                .file_stem()
                .map(|f| TagValue::Str(f.to_string()))
                .unwrap_or_default(),
            Field::Ext => TagValue::Str(self.props.ext.clone()),
            Field::Size => TagValue::Int(self.props.size as i64),
            Field::DateAdded => self.date_added.map(TagValue::DateTime).unwrap_or_default(),
            Field::DateModified => self.date_modified().map(TagValue::DateTime).unwrap_or_default(),
            Field::LastPlayed => self.last_played.map(TagValue::DateTime).unwrap_or_default(),
            Field::PlayCount => self.play_count.map(TagValue::Int).unwrap_or_default(),
        }
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::testing::{track, track_with_uri};
    use super::*;

    #[test]
    fn uri_round_trips_through_comments() {
        let mut t = track("/lib/a.mp3", "A", "X", "Y");
        assert_eq!(t.has_uri(), None);

        t.set_uri(UriState::Valid(Uri("spotify:track:6rqhFgbbKwnb9MLmUQDhG6".to_string())));
        assert_eq!(t.has_uri(), Some(true));
        assert!(t.tags.comments.iter().any(|c| c.starts_with("spotify:track:")));

        // rebuilding from the same tags restores the state
        let rebuilt = LocalTrack::from_parts(t.path.clone(), t.tags.clone(), t.props.clone());
        assert_eq!(rebuilt.has_uri(), Some(true));
        assert_eq!(rebuilt.uri(), t.uri());

        t.set_uri(UriState::Unavailable);
        assert_eq!(t.has_uri(), Some(false));
        t.set_uri(UriState::Missing);
        assert_eq!(t.has_uri(), None);
        assert!(t.tags.comments.is_empty());
    }

    #[test]
    fn set_uri_replaces_previous_uri_comment() {
        let mut t = track_with_uri("/lib/a.mp3", "A", "spotify:track:6rqhFgbbKwnb9MLmUQDhG6");
        t.tags.comments.push("just a note".to_string());
        t.set_uri(UriState::Valid(Uri("spotify:track:7rqhFgbbKwnb9MLmUQDhG6".to_string())));

        let uri_comments: Vec<&String> = t
            .tags
            .comments
            .iter()
            .filter(|c| c.starts_with("spotify:"))
            .collect();
        assert_eq!(uri_comments, vec!["spotify:track:7rqhFgbbKwnb9MLmUQDhG6"]);
        assert!(t.tags.comments.iter().any(|c| c == "just a note"));
    }

    #[test]
    fn equality_prefers_uri_over_path() {
        let a = track_with_uri("/lib/a.mp3", "A", "spotify:track:6rqhFgbbKwnb9MLmUQDhG6");
        let b = track_with_uri("/lib/b.mp3", "B", "spotify:track:6rqhFgbbKwnb9MLmUQDhG6");
        assert_eq!(a, b);

        let c = track("/lib/c.mp3", "C", "X", "Y");
        let c2 = track("/lib/c.mp3", "Different title", "X", "Y");
        assert_eq!(c, c2);
        assert!(a != c);
    }

    #[test]
    fn name_falls_back_to_file_stem() {
        let mut t = track("/lib/some song.mp3", "Title", "X", "Y");
        t.tags.title = None;
        assert_eq!(t.name(), "some song");
    }
}
