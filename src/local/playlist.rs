//! Playlists tied to files on disk.

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::Result;
use serde::Serialize;

use crate::local::track::LocalTrack;
use crate::processor::filter::TrackFilter;
use crate::remote::Uri;

pub mod m3u;
pub mod xautopf;

pub use m3u::M3uPlaylist;
pub use xautopf::XAutoPfPlaylist;

/// The outcome of saving a local playlist, counted over track paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocalSyncResult {
    pub start: usize,
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub difference: i64,
    pub final_count: usize,
}

/// A local playlist in one of the supported file formats.
#[derive(Debug, Clone)]
pub enum LocalPlaylist {
    M3u(M3uPlaylist),
    Auto(XAutoPfPlaylist),
}

impl LocalPlaylist {
    /// Load a playlist file of a recognised extension, `None` otherwise.
    pub fn load(
        path: &Utf8Path,
        universe: &[LocalTrack],
        library_folder: Option<&Utf8Path>,
        other_folders: &[Utf8PathBuf],
        check_existence: bool,
    ) -> Option<Result<Self>> {
        match path.extension()?.to_lowercase().as_str() {
            "m3u" => Some(
                M3uPlaylist::load(path, universe, library_folder, other_folders, check_existence)
                    .map(LocalPlaylist::M3u),
            ),
            "xautopf" => Some(
                XAutoPfPlaylist::load(path, universe, library_folder, other_folders, check_existence)
                    .map(LocalPlaylist::Auto),
            ),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LocalPlaylist::M3u(playlist) => &playlist.name,
            LocalPlaylist::Auto(playlist) => &playlist.name,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        match self {
            LocalPlaylist::M3u(playlist) => &playlist.path,
            LocalPlaylist::Auto(playlist) => &playlist.path,
        }
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        match self {
            LocalPlaylist::M3u(playlist) => &playlist.tracks,
            LocalPlaylist::Auto(playlist) => &playlist.tracks,
        }
    }

    pub fn tracks_mut(&mut self) -> &mut Vec<LocalTrack> {
        match self {
            LocalPlaylist::M3u(playlist) => &mut playlist.tracks,
            LocalPlaylist::Auto(playlist) => &mut playlist.tracks,
        }
    }

    /// Total duration, when every track reports one.
    pub fn length(&self) -> Option<f64> {
        let tracks = self.tracks();
        let lengths: Vec<f64> = tracks.iter().filter_map(|t| t.props.length).collect();
        (lengths.len() == tracks.len() && !lengths.is_empty()).then(|| lengths.iter().sum())
    }

    /// Valid URIs in playlist order.
    pub fn uris(&self) -> Vec<Uri> {
        self.tracks()
            .iter()
            .filter_map(|track| track.uri().cloned())
            .collect()
    }

    /// Write the playlist back to its file.
    pub fn save(&mut self, dry_run: bool) -> Result<LocalSyncResult> {
        match self {
            LocalPlaylist::M3u(playlist) => playlist.save(dry_run),
            LocalPlaylist::Auto(playlist) => playlist.save(dry_run),
        }
    }
}

/// Reverse the stem replacement applied at load time so paths in saved
/// files keep pointing at the folder the file originally referenced.
fn prepare_paths_for_output<'a>(
    filter: &TrackFilter,
    paths: impl IntoIterator<Item = &'a Utf8Path>,
) -> Vec<String> {
    paths
        .into_iter()
        .map(|path| {
            let path = path.as_str();
            match (&filter.library_folder, &filter.original_folder) {
                (Some(library), Some(original)) => {
                    match crate::processor::filter::strip_prefix_ignore_case(path, library.as_str())
                    {
                        Some(tail) => {
                            let replaced = format!("{original}{tail}");
                            if original.as_str().contains('\\') {
                                replaced.replace('/', "\\")
                            } else {
                                replaced.replace('\\', "/")
                            }
                        }
                        None => path.to_string(),
                    }
                }
                _ => path.to_string(),
            }
        })
        .collect()
}

fn result_from_paths(start: &HashSet<String>, final_paths: &HashSet<String>) -> LocalSyncResult {
    LocalSyncResult {
        start: start.len(),
        added: final_paths.difference(start).count(),
        removed: start.difference(final_paths).count(),
        unchanged: start.intersection(final_paths).count(),
        difference: final_paths.len() as i64 - start.len() as i64,
        final_count: final_paths.len(),
    }
}
