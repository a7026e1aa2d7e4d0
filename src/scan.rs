//! Uniform read/write contract over audio containers.
//!
//! Reading walks a chain of format backends (lofty first, then the
//! moosicbox fallback); the first one to recognise the file wins. Writing
//! and tag deletion go through lofty only.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::{Result, Section, eyre::Context};
use jiff::Timestamp;
use strum::{Display, EnumIter, EnumString};
use tokio::task::spawn_blocking;

use crate::error::MusifyError;
use crate::field::Field;

mod lofty;
mod moosicbox_audiotags;

/// Extensions the library scanner considers to be tracks.
pub const TRACK_EXTENSIONS: &[&str] = &["mp3", "m4a", "flac", "wma", "ogg"];

/// Container format, derived from the file extension.
#[derive(Debug, Display, EnumString, EnumIter, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum FileKind {
    Mp3,
    M4a,
    Flac,
    Wma,
    Ogg,
}

impl FileKind {
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        FileKind::from_str(&path.extension()?.to_lowercase()).ok()
    }
}

/// The mutable tag set of a track, as read from or written to a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub track_number: Option<u32>,
    pub track_total: Option<u32>,
    pub disc_number: Option<u32>,
    pub disc_total: Option<u32>,
    pub year: Option<i32>,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub genres: Vec<String>,
    pub comments: Vec<String>,
    pub compilation: bool,
    pub rating: Option<f64>,
    /// Embedded images, round-tripped as raw bytes.
    pub images: Vec<Vec<u8>>,
}

/// Immutable file properties captured at read time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileProps {
    pub ext: String,
    pub kind: Option<FileKind>,
    pub size: u64,
    pub channels: Option<u8>,
    pub bit_rate: Option<u32>,
    pub bit_depth: Option<u8>,
    pub sample_rate: Option<u32>,
    /// Duration in seconds.
    pub length: Option<f64>,
    pub date_modified: Option<Timestamp>,
}

trait FormatScanner: Send + Sync {
    /// `Ok(None)` means "not a format this backend reads".
    fn scan(&self, path: Utf8PathBuf) -> Result<Option<(TrackTags, FileProps)>>;
}

const SCANNERS: &[&dyn FormatScanner] =
    &[&lofty::Scanner::new(), &moosicbox_audiotags::Scanner::new()];

/// Read tags and properties from a file, `None` when no backend recognises
/// it. Filesystem properties (extension, size, mtime) are filled in here.
pub async fn read_path(path: &Utf8Path) -> Option<(TrackTags, FileProps)> {
    let path = path.to_path_buf();
    spawn_blocking(move || {
        let scanned = SCANNERS
            .iter()
            .filter_map(|scanner| scanner.scan(path.clone()).ok().flatten())
            .next();
        let (tags, mut props) = scanned?;

        props.ext = path.extension().unwrap_or_default().to_lowercase();
        props.kind = FileKind::from_path(&path);
        if let Ok(metadata) = std::fs::metadata(&path) {
            props.size = metadata.len();
            props.date_modified = metadata.modified().ok().and_then(|t| Timestamp::try_from(t).ok());
        }
        Some((tags, props))
    })
    .await
    .expect("scanning should never panic")
}

/// Why a field was touched during a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteReason {
    Added,
    Replaced,
    Removed,
}

/// The outcome of a tag write or delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagWriteResult {
    pub saved: bool,
    pub updated: HashMap<Field, WriteReason>,
}

/// Write ``tags`` to the container at ``path``.
///
/// With `replace = false` only fields that are empty in the file are filled
/// in; with `replace = true` differing values are overwritten and values
/// absent from ``tags`` are removed. The file is opened exclusively for the
/// duration of the save. `dry_run` reports what would change without
/// touching the file.
pub fn write_tags(
    path: &Utf8Path,
    tags: &TrackTags,
    replace: bool,
    dry_run: bool,
) -> Result<TagWriteResult> {
    lofty::write(path, tags, replace, dry_run)
        .wrap_err("Could not write tags")
        .with_note(|| format!("path: {path}"))
}

/// Remove the given fields from the container at ``path``.
pub fn delete_tags(path: &Utf8Path, fields: &[Field], dry_run: bool) -> Result<TagWriteResult> {
    lofty::delete(path, fields, dry_run)
        .wrap_err("Could not delete tags")
        .with_note(|| format!("path: {path}"))
}

pub(crate) fn open_exclusive(path: &Utf8Path) -> Result<std::fs::File, MusifyError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| MusifyError::TagIo {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn file_kind_from_extension() {
        assert_eq!(FileKind::from_path(Utf8Path::new("/x/y.MP3")), Some(FileKind::Mp3));
        assert_eq!(FileKind::from_path(Utf8Path::new("/x/y.flac")), Some(FileKind::Flac));
        assert_eq!(FileKind::from_path(Utf8Path::new("/x/y.txt")), None);
        assert_eq!(FileKind::from_path(Utf8Path::new("/x/noext")), None);
    }

    #[test]
    fn every_kind_is_a_scannable_extension() {
        for kind in FileKind::iter() {
            assert!(TRACK_EXTENSIONS.contains(&kind.to_string().as_str()));
        }
    }
}
