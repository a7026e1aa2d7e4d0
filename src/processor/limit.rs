//! Truncates an ordered track list by count, album count, duration or size.

use std::collections::HashSet;
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};

use crate::error::MusifyError;
use crate::field::{Field, HasFields, TagValue};
use crate::processor::sort::Sorter;

/// What the limit counts.
#[derive(Debug, Display, EnumString, EnumIter, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum LimitKind {
    Items,
    Albums,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Bytes,
    #[strum(to_string = "kilobytes", serialize = "kb")]
    Kilobytes,
    #[strum(to_string = "megabytes", serialize = "mb")]
    Megabytes,
    #[strum(to_string = "gigabytes", serialize = "gb")]
    Gigabytes,
    #[strum(to_string = "terabytes", serialize = "tb")]
    Terabytes,
}

/// The ordering applied before the limit walks the list.
#[derive(Debug, Display, EnumString, EnumIter, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum LimitSort {
    Random,
    HighestRating,
    LowestRating,
    MostRecentlyAdded,
    LeastRecentlyAdded,
    MostRecentlyPlayed,
    LeastRecentlyPlayed,
    MostOftenPlayed,
    LeastOftenPlayed,
}

impl LimitKind {
    pub fn from_name(name: &str) -> Result<Self, MusifyError> {
        LimitKind::from_str(&name.to_lowercase()).map_err(|_| MusifyError::Rule {
            what: "limit kind",
            name: name.to_string(),
        })
    }
}

impl LimitSort {
    pub fn from_name(name: &str) -> Result<Self, MusifyError> {
        LimitSort::from_str(&super::compare::camel_to_snake(name)).map_err(|_| MusifyError::Rule {
            what: "limit sort",
            name: name.to_string(),
        })
    }

    fn apply<T: HasFields>(self, tracks: &mut [T]) {
        match self {
            LimitSort::Random => Sorter::shuffle(tracks),
            LimitSort::HighestRating => Sorter::sort_by_field(tracks, Field::Rating, true),
            LimitSort::LowestRating => Sorter::sort_by_field(tracks, Field::Rating, false),
            LimitSort::MostRecentlyAdded => Sorter::sort_by_field(tracks, Field::DateAdded, true),
            LimitSort::LeastRecentlyAdded => Sorter::sort_by_field(tracks, Field::DateAdded, false),
            LimitSort::MostRecentlyPlayed => Sorter::sort_by_field(tracks, Field::LastPlayed, true),
            LimitSort::LeastRecentlyPlayed => {
                Sorter::sort_by_field(tracks, Field::LastPlayed, false)
            }
            LimitSort::MostOftenPlayed => Sorter::sort_by_field(tracks, Field::PlayCount, true),
            LimitSort::LeastOftenPlayed => Sorter::sort_by_field(tracks, Field::PlayCount, false),
        }
    }
}

/// Limits a track list in place. `max == 0` disables limiting.
///
/// Tracks named by the ignore set are kept regardless of the limit and do
/// not count towards it.
#[derive(Debug, Clone)]
pub struct Limiter {
    pub max: usize,
    pub kind: LimitKind,
    pub pre_sort: Option<LimitSort>,
    /// Multiplier applied to ``max`` while admitting tracks on duration or
    /// size limits. MusicBee allows roughly 1.25 over the configured limit.
    pub allowance: f64,
}

impl Default for Limiter {
    fn default() -> Self {
        Limiter {
            max: 0,
            kind: LimitKind::Items,
            pre_sort: None,
            allowance: 1.0,
        }
    }
}

impl Limiter {
    pub fn new(max: usize, kind: LimitKind) -> Self {
        Limiter {
            max,
            kind,
            ..Default::default()
        }
    }

    /// Limit ``tracks`` in place. ``ignore`` holds lowercased paths to keep
    /// regardless.
    pub fn limit<T: HasFields>(&self, tracks: &mut Vec<T>, ignore: &HashSet<String>) {
        if tracks.is_empty() || self.max == 0 {
            return;
        }

        if let Some(pre_sort) = self.pre_sort {
            pre_sort.apply(tracks);
        }

        let mut candidates = Vec::with_capacity(tracks.len());
        let mut kept = Vec::new();
        for track in tracks.drain(..) {
            let path = track_path(&track);
            if !ignore.is_empty() && ignore.contains(&path) {
                kept.push(track);
            } else {
                candidates.push(track);
            }
        }

        match self.kind {
            LimitKind::Items => {
                candidates.truncate(self.max);
                kept.extend(candidates);
            }
            LimitKind::Albums => {
                let mut seen_albums: Vec<String> = Vec::new();
                for track in candidates {
                    let album = match track.field(Field::Album) {
                        TagValue::Str(album) => album,
                        _ => String::new(),
                    };
                    if seen_albums.len() < self.max && !seen_albums.contains(&album) {
                        seen_albums.push(album.clone());
                    }
                    if seen_albums.contains(&album) {
                        kept.push(track);
                    }
                }
            }
            _ => {
                let mut count = 0.0;
                for track in candidates {
                    let value = self.convert(&track);
                    if count + value <= self.max as f64 * self.allowance {
                        count += value;
                        kept.push(track);
                    }
                    if count > self.max as f64 {
                        break;
                    }
                }
            }
        }

        *tracks = kept;
    }

    /// The track's contribution in this limiter's unit.
    fn convert<T: HasFields>(&self, track: &T) -> f64 {
        let length = match track.field(Field::Length) {
            TagValue::Float(length) => length,
            TagValue::Int(length) => length as f64,
            _ => 0.0,
        };
        let size = match track.field(Field::Size) {
            TagValue::Int(size) => size as f64,
            TagValue::Float(size) => size,
            _ => 0.0,
        };

        match self.kind {
            LimitKind::Items | LimitKind::Albums => 0.0,
            LimitKind::Seconds => length,
            LimitKind::Minutes => length / 60.0,
            LimitKind::Hours => length / 3600.0,
            LimitKind::Days => length / 86_400.0,
            LimitKind::Weeks => length / 604_800.0,
            LimitKind::Bytes => size,
            LimitKind::Kilobytes => size / 1e3,
            LimitKind::Megabytes => size / 1e6,
            LimitKind::Gigabytes => size / 1e9,
            LimitKind::Terabytes => size / 1e12,
        }
    }
}

fn track_path<T: HasFields>(track: &T) -> String {
    match track.field(Field::Path) {
        TagValue::Str(path) => path.to_lowercase(),
        _ => String::new(),
    }
}
