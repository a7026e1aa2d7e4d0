//! Tag fields and typed tag values shared by the rule processors and sorter.

use std::cmp::Ordering;

use jiff::civil::{Date, DateTime};
use strum::{Display, EnumIter, EnumString};

use crate::error::MusifyError;

/// Every tag or file property a rule can address on a local track.
#[derive(Debug, Display, EnumString, EnumIter, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Title,
    Artist,
    Album,
    AlbumArtist,
    TrackNumber,
    TrackTotal,
    DiscNumber,
    DiscTotal,
    Year,
    Bpm,
    Key,
    Genres,
    Comments,
    Compilation,
    Length,
    Rating,
    Path,
    Folder,
    Filename,
    Ext,
    Size,
    DateAdded,
    DateModified,
    LastPlayed,
    PlayCount,
}

impl Field {
    /// Resolve a MusicBee rule-file field name to a [`Field`].
    pub fn from_musicbee(name: &str) -> Result<Self, MusifyError> {
        let field = match name {
            "Title" => Field::Title,
            "ArtistPeople" => Field::Artist,
            "Album" => Field::Album,
            "AlbumArtist" => Field::AlbumArtist,
            "TrackNo" => Field::TrackNumber,
            "DiscNo" => Field::DiscNumber,
            "GenreSplits" => Field::Genres,
            "Year" => Field::Year,
            "Tempo" => Field::Bpm,
            "Comment" => Field::Comments,
            "FileDuration" => Field::Length,
            "FolderName" => Field::Folder,
            "FilePath" => Field::Path,
            "FileName" => Field::Filename,
            "FileExtension" => Field::Ext,
            "FileDateAdded" => Field::DateAdded,
            "FilePlayCount" => Field::PlayCount,
            other => {
                return Err(MusifyError::Rule {
                    what: "field",
                    name: other.to_string(),
                });
            }
        };
        Ok(field)
    }
}

/// Anything that can expose its tags by [`Field`]. Implemented by local
/// tracks; rule processors and the sorter only see this view.
pub trait HasFields {
    fn field(&self, field: Field) -> TagValue;
}

/// A tag value as exposed for comparison and sorting. `None` stands in for an
/// absent tag.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TagValue {
    #[default]
    None,
    Str(String),
    StrList(Vec<String>),
    Int(i64),
    Float(f64),
    Date(Date),
    DateTime(DateTime),
    Bool(bool),
}

impl TagValue {
    /// Absent tags and `false` flags both count as null (MusicBee treats an
    /// unset checkbox the same as a missing tag).
    pub fn is_null(&self) -> bool {
        matches!(self, TagValue::None | TagValue::Bool(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Order two values of the same shape. Mixed date/datetime pairs compare
    /// at day precision; everything else mismatched is unordered.
    pub fn partial_cmp_value(&self, other: &TagValue) -> Option<Ordering> {
        use TagValue::*;
        match (self, other) {
            (Str(a), Str(b)) => Some(a.cmp(b)),
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (DateTime(a), Date(b)) => Some(a.date().cmp(b)),
            (Date(a), DateTime(b)) => Some(a.cmp(&b.date())),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            _ => Option::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn field_names_round_trip() {
        assert_eq!(Field::from_str("album_artist").unwrap(), Field::AlbumArtist);
        assert_eq!(Field::DateAdded.to_string(), "date_added");
    }

    #[test]
    fn musicbee_names_resolve() {
        assert_eq!(Field::from_musicbee("ArtistPeople").unwrap(), Field::Artist);
        assert_eq!(Field::from_musicbee("FileDuration").unwrap(), Field::Length);
        assert!(Field::from_musicbee("NoSuchField").is_err());
    }

    #[test]
    fn datetime_compares_to_date_at_day_precision() {
        let dt = TagValue::DateTime(DateTime::constant(2023, 5, 2, 13, 30, 0, 0));
        let d = TagValue::Date(Date::constant(2023, 5, 2));
        assert_eq!(dt.partial_cmp_value(&d), Some(Ordering::Equal));
    }
}
