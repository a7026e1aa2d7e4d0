//! Plain-text playlists: one path per line, UTF-8, no BOM.

use std::collections::{HashMap, HashSet};
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::{Result, Section, eyre::Context};

use crate::local::playlist::{LocalSyncResult, prepare_paths_for_output, result_from_paths};
use crate::local::track::LocalTrack;
use crate::processor::filter::TrackFilter;

#[derive(Debug, Clone)]
pub struct M3uPlaylist {
    pub path: Utf8PathBuf,
    pub name: String,
    pub tracks: Vec<LocalTrack>,
    filter: TrackFilter,
    /// Lowercased track paths as last loaded from / saved to disk.
    original_paths: HashSet<String>,
}

impl M3uPlaylist {
    /// Load from an existing file, resolving each listed path against the
    /// ``universe`` of known tracks. A missing file yields an empty playlist
    /// that will be created on the first save.
    pub fn load(
        path: &Utf8Path,
        universe: &[LocalTrack],
        library_folder: Option<&Utf8Path>,
        other_folders: &[Utf8PathBuf],
        check_existence: bool,
    ) -> Result<Self> {
        let listed: Vec<String> = if path.exists() {
            fs::read_to_string(path)
                .wrap_err("Failed to read playlist from disk")
                .with_note(|| format!("path: {path}"))?
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        let filter = TrackFilter::new(
            Vec::new(),
            true,
            listed,
            Vec::new(),
            library_folder.map(Utf8Path::to_path_buf),
            other_folders,
            check_existence,
        );

        // keep file order, not universe order
        let by_path: HashMap<String, &LocalTrack> = universe
            .iter()
            .map(|track| (track.path.as_str().to_lowercase(), track))
            .collect();
        let tracks: Vec<LocalTrack> = filter
            .include_paths
            .iter()
            .filter_map(|path| by_path.get(path).copied().cloned())
            .collect();

        let original_paths = if path.exists() {
            tracks
                .iter()
                .map(|track| track.path.as_str().to_lowercase())
                .collect()
        } else {
            HashSet::new()
        };

        Ok(M3uPlaylist {
            path: path.to_path_buf(),
            name: playlist_name(path),
            tracks,
            filter,
            original_paths,
        })
    }

    /// Build a new playlist, to be written on the first save.
    pub fn from_tracks(path: &Utf8Path, tracks: Vec<LocalTrack>) -> Self {
        M3uPlaylist {
            path: path.to_path_buf(),
            name: playlist_name(path),
            tracks,
            filter: TrackFilter::default(),
            original_paths: HashSet::new(),
        }
    }

    /// Rewrite the file to reflect the current track list.
    pub fn save(&mut self, dry_run: bool) -> Result<LocalSyncResult> {
        let final_paths: HashSet<String> = self
            .tracks
            .iter()
            .map(|track| track.path.as_str().to_lowercase())
            .collect();

        if !dry_run {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)
                    .wrap_err("Could not create playlist folder")
                    .with_note(|| format!("path: {parent}"))?;
            }
            let lines = prepare_paths_for_output(
                &self.filter,
                self.tracks.iter().map(|track| track.path.as_path()),
            );
            let mut content = lines.join("\n");
            if !content.is_empty() {
                content.push('\n');
            }
            fs::write(&self.path, content)
                .wrap_err("Failed to write playlist to disk")
                .with_note(|| format!("path: {}", self.path))?;
        }

        let result = result_from_paths(&self.original_paths, &final_paths);
        self.original_paths = final_paths;
        Ok(result)
    }
}

fn playlist_name(path: &Utf8Path) -> String {
    path.file_stem().unwrap_or("unnamed").to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::local::track::testing::track;

    fn universe() -> Vec<LocalTrack> {
        vec![
            track("/lib/a.mp3", "A", "X", "Y"),
            track("/lib/b.mp3", "B", "X", "Y"),
            track("/lib/c.mp3", "C", "X", "Y"),
        ]
    }

    #[test]
    fn loads_tracks_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("mix.m3u")).unwrap();
        fs::write(&path, "/lib/c.mp3\n/lib/a.mp3\n").unwrap();

        let playlist = M3uPlaylist::load(&path, &universe(), None, &[], false).unwrap();
        assert_eq!(playlist.name, "mix");
        let titles: Vec<&str> = playlist.tracks.iter().map(|t| t.name()).collect();
        assert_eq!(titles, vec!["C", "A"]);
    }

    #[test]
    fn save_round_trips_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("mix.m3u")).unwrap();

        let mut playlist = M3uPlaylist::from_tracks(&path, universe());
        let result = playlist.save(false).unwrap();
        assert_eq!(result.start, 0);
        assert_eq!(result.added, 3);
        assert_eq!(result.final_count, 3);

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "/lib/a.mp3\n/lib/b.mp3\n/lib/c.mp3\n");

        let reloaded = M3uPlaylist::load(&path, &universe(), None, &[], false).unwrap();
        assert_eq!(reloaded.tracks.len(), 3);
    }

    #[test]
    fn second_save_reports_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("mix.m3u")).unwrap();

        let mut playlist = M3uPlaylist::from_tracks(&path, universe());
        playlist.save(false).unwrap();
        let again = playlist.save(false).unwrap();

        assert_eq!(again.added, 0);
        assert_eq!(again.removed, 0);
        assert_eq!(again.unchanged, 3);
        assert_eq!(again.difference, 0);
    }

    #[test]
    fn foreign_stems_replaced_on_load_and_restored_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("mix.m3u")).unwrap();
        fs::write(&path, "D:\\Music\\a.mp3\n").unwrap();

        let library_folder = Utf8PathBuf::from("/lib");
        let other_folders = vec![Utf8PathBuf::from("D:\\Music")];
        let mut playlist = M3uPlaylist::load(
            &path,
            &universe(),
            Some(&library_folder),
            &other_folders,
            false,
        )
        .unwrap();

        let titles: Vec<&str> = playlist.tracks.iter().map(|t| t.name()).collect();
        assert_eq!(titles, vec!["A"]);

        // saving writes the playlist back against its original stem
        playlist.save(false).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "D:\\Music\\a.mp3\n");
    }

    #[test]
    fn dry_run_does_not_touch_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("mix.m3u")).unwrap();

        let mut playlist = M3uPlaylist::from_tracks(&path, universe());
        let result = playlist.save(true).unwrap();
        assert_eq!(result.added, 3);
        assert!(!path.exists());
    }
}
