use camino::Utf8PathBuf;
use color_eyre::{Result, Section, eyre::Context};
use moosicbox_audiotags::{Error, Tag};

use crate::scan::{FileProps, FormatScanner, TrackTags};

/// Fallback reader for containers lofty fails on. Read-only.
pub struct Scanner;

impl Scanner {
    pub const fn new() -> Self {
        Scanner
    }
}

impl FormatScanner for Scanner {
    fn scan(&self, path: Utf8PathBuf) -> Result<Option<(TrackTags, FileProps)>> {
        let tag = match Tag::new().read_from_path(&path) {
            Ok(tag) => tag,
            Err(
                Error::UnknownFileExtension(_)
                | Error::UnsupportedFormat(_)
                | Error::UnsupportedMimeType(_),
            ) => return Ok(None),
            Err(other) => {
                return Err(other)
                    .wrap_err("Could not parse metadata")
                    .with_note(|| format!("path: {path}"));
            }
        };

        let tags = TrackTags {
            title: tag.title().map(str::to_string),
            artist: tag.artist().map(str::to_string),
            album: tag.album().map(|album| album.title.to_string()),
            track_number: tag.track_number().map(u32::from),
            track_total: tag.total_tracks().map(u32::from),
            disc_number: tag.disc_number().map(u32::from),
            disc_total: tag.total_discs().map(u32::from),
            year: tag.year(),
            genres: tag.genre().map(str::to_string).into_iter().collect(),
            ..Default::default()
        };
        let props = FileProps {
            length: tag.duration(),
            ..Default::default()
        };
        Ok(Some((tags, props)))
    }
}
