//! The local library: all tracks under a folder, plus its playlists.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use color_eyre::Result;
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::error::MusifyError;
use crate::field::{Field, HasFields, TagValue};
use crate::local::playlist::{LocalPlaylist, LocalSyncResult};
use crate::local::track::LocalTrack;
use crate::local::{TrackCollection, grouped_collections};
use crate::progress::Progress;
use crate::remote::Uri;
use crate::report;
use crate::scan::TRACK_EXTENSIONS;

pub struct LocalLibrary {
    pub library_folder: Utf8PathBuf,
    pub playlist_folder: Utf8PathBuf,
    /// Stems of the same library on other machines, replaced in loaded
    /// playlist paths.
    pub other_folders: Vec<Utf8PathBuf>,
    pub tracks: Vec<LocalTrack>,
    pub playlists: Vec<LocalPlaylist>,
    /// Paths that failed to load during the last scan.
    pub errors: Vec<Utf8PathBuf>,
}

impl LocalLibrary {
    pub fn new(library_folder: Utf8PathBuf, playlist_folder: Option<Utf8PathBuf>) -> Self {
        let playlist_folder = playlist_folder.unwrap_or_else(|| library_folder.join("playlists"));
        LocalLibrary {
            library_folder,
            playlist_folder,
            other_folders: Vec::new(),
            tracks: Vec::new(),
            playlists: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub async fn load(
        &mut self,
        tracks: bool,
        playlists: bool,
        progress: &dyn Progress,
    ) -> Result<()> {
        if tracks {
            self.load_tracks(progress).await?;
        }
        if playlists {
            self.load_playlists()?;
        }
        Ok(())
    }

    /// Scan the library folder for supported files. A file that fails to
    /// read is recorded in `errors` and the scan continues.
    pub async fn load_tracks(&mut self, progress: &dyn Progress) -> Result<()> {
        let mut paths: Vec<Utf8PathBuf> = walkdir::WalkDir::new(&self.library_folder)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| TRACK_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            })
            .collect();
        paths.sort_unstable();

        self.tracks.clear();
        self.errors.clear();
        progress.start(paths.len() as u64);
        for path in paths {
            match LocalTrack::load(path.clone()).await {
                Ok(track) => self.tracks.push(track),
                Err(error) => {
                    debug!(%path, %error, "failed to load track");
                    self.errors.push(path);
                }
            }
            progress.advance(1);
        }
        progress.finish();

        info!(
            "library scan complete: {} tracks loaded - {} errors",
            self.tracks.len(),
            self.errors.len()
        );
        if !self.errors.is_empty() {
            warn!(
                "could not load: {}",
                self.errors.iter().map(|p| p.as_str()).join(", ")
            );
        }
        Ok(())
    }

    /// Load every recognised playlist file from the playlist folder.
    pub fn load_playlists(&mut self) -> Result<()> {
        self.playlists.clear();
        if !self.playlist_folder.exists() {
            warn!(folder = %self.playlist_folder, "playlist folder does not exist");
            return Ok(());
        }

        let mut paths: Vec<Utf8PathBuf> = self
            .playlist_folder
            .read_dir_utf8()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.into_path())
            .collect();
        paths.sort_unstable();

        for path in paths {
            let loaded = LocalPlaylist::load(
                &path,
                &self.tracks,
                Some(&self.library_folder),
                &self.other_folders,
                false,
            );
            match loaded {
                Some(Ok(playlist)) => self.playlists.push(playlist),
                Some(Err(error)) => warn!(%path, %error, "failed to load playlist"),
                None => {}
            }
        }

        info!("loaded {} playlists", self.playlists.len());
        Ok(())
    }

    pub fn playlist(&self, name: &str) -> Option<&LocalPlaylist> {
        self.playlists.iter().find(|playlist| playlist.name() == name)
    }

    /// Folder views over all tracks.
    pub fn folders(&self) -> Result<Vec<TrackCollection>, MusifyError> {
        grouped_collections(&self.tracks, Field::Folder)
    }

    pub fn albums(&self) -> Result<Vec<TrackCollection>, MusifyError> {
        grouped_collections(&self.tracks, Field::Album)
    }

    pub fn artists(&self) -> Result<Vec<TrackCollection>, MusifyError> {
        grouped_collections(&self.tracks, Field::Artist)
    }

    pub fn genres(&self) -> Result<Vec<TrackCollection>, MusifyError> {
        grouped_collections(&self.tracks, Field::Genres)
    }

    /// Deep-copied playlists, filtered by name and with items dropped when
    /// one of their string tags contains any of the given values.
    pub fn get_filtered_playlists(
        &self,
        include: Option<&[String]>,
        exclude: Option<&[String]>,
        filter_tags: &[(Field, Vec<String>)],
    ) -> Vec<LocalPlaylist> {
        let mut filtered = Vec::new();
        for playlist in &self.playlists {
            let name = playlist.name();
            if include.is_some_and(|names| !names.iter().any(|n| n == name)) {
                continue;
            }
            if exclude.is_some_and(|names| names.iter().any(|n| n == name)) {
                continue;
            }

            let mut copy = playlist.clone();
            let before = copy.tracks().len();
            copy.tracks_mut()
                .retain(|track| !matches_filter_tags(track, filter_tags));
            debug!(
                playlist = %name,
                dropped = before - copy.tracks().len(),
                "filtered playlist"
            );
            filtered.push(copy);
        }
        filtered
    }

    /// Merge the given playlists into this library: existing playlists
    /// gain the tracks they are missing, unknown playlists are added.
    pub fn merge_playlists(&mut self, playlists: &[LocalPlaylist]) {
        for incoming in playlists {
            match self
                .playlists
                .iter_mut()
                .find(|existing| existing.name() == incoming.name())
            {
                Some(existing) => {
                    let known: Vec<LocalTrack> = existing.tracks().to_vec();
                    for track in incoming.tracks() {
                        if !known.contains(track) {
                            existing.tracks_mut().push(track.clone());
                        }
                    }
                }
                None => self.playlists.push(incoming.clone()),
            }
        }
    }

    /// Snapshot of every playlist as a name-to-paths map.
    pub fn backup_playlists(&self) -> BTreeMap<String, Vec<String>> {
        self.playlists
            .iter()
            .map(|playlist| {
                let paths = playlist
                    .tracks()
                    .iter()
                    .map(|track| track.path.to_string())
                    .collect();
                (playlist.name().to_string(), paths)
            })
            .collect()
    }

    /// Reset playlist contents from a backup, resolving paths against the
    /// loaded tracks. Unknown paths are dropped.
    pub fn restore_playlists(&mut self, backup: &BTreeMap<String, Vec<String>>) {
        for (name, paths) in backup {
            let tracks: Vec<LocalTrack> = paths
                .iter()
                .filter_map(|path| {
                    self.tracks
                        .iter()
                        .find(|track| track.path.as_str().eq_ignore_ascii_case(path))
                        .cloned()
                })
                .collect();
            match self.playlists.iter_mut().find(|p| p.name() == name) {
                Some(playlist) => *playlist.tracks_mut() = tracks,
                None => debug!(playlist = %name, "backup names a playlist that is not loaded"),
            }
        }
    }

    /// Snapshot of every track's stored URI tag, keyed by path.
    pub fn backup_uris(&self) -> BTreeMap<String, Option<String>> {
        self.tracks
            .iter()
            .map(|track| {
                (
                    track.path.to_string(),
                    track.uri_state().to_tag().map(str::to_string),
                )
            })
            .collect()
    }

    /// Re-apply URI tags from a backup. Paths missing from the backup are
    /// left untouched.
    pub fn restore_uris(&mut self, backup: &BTreeMap<String, Option<String>>) {
        for track in &mut self.tracks {
            if let Some(stored) = backup.get(track.path.as_str()) {
                let state = match stored {
                    Some(tag) => crate::item::UriState::from_tag(tag),
                    None => crate::item::UriState::Missing,
                };
                track.set_uri(state);
            }
        }
    }

    /// Write every playlist back to disk.
    pub fn save_playlists(&mut self, dry_run: bool) -> Result<Vec<(String, LocalSyncResult)>> {
        let mut results = Vec::new();
        for playlist in &mut self.playlists {
            let result = playlist.save(dry_run)?;
            results.push((playlist.name().to_string(), result));
        }
        report::log_playlist_saves(&results);
        Ok(results)
    }

    /// Playlist contents as URI lists, the input to a remote library sync.
    pub fn playlist_uris(&self) -> Vec<(String, Vec<Uri>)> {
        self.playlists
            .iter()
            .map(|playlist| (playlist.name().to_string(), playlist.uris()))
            .collect()
    }

    pub fn log_library(&self) {
        let counts: Vec<(String, usize)> = self
            .playlists
            .iter()
            .map(|playlist| (playlist.name().to_string(), playlist.tracks().len()))
            .collect();
        report::log_name_counts(
            &format!("{} tracks in {}", self.tracks.len(), self.library_folder),
            &counts,
        );
    }
}

fn matches_filter_tags(track: &LocalTrack, filter_tags: &[(Field, Vec<String>)]) -> bool {
    for (field, values) in filter_tags {
        let haystacks: Vec<String> = match track.field(*field) {
            TagValue::Str(value) => vec![value],
            TagValue::StrList(list) => list,
            _ => continue,
        };
        let hit = haystacks.iter().any(|haystack| {
            let haystack = haystack.trim().to_lowercase();
            values
                .iter()
                .any(|value| haystack.contains(&value.trim().to_lowercase()))
        });
        if hit {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests;
