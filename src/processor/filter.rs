//! Combines comparer predicates with include/exclude path lists to select
//! tracks for an auto-playlist.

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::MusifyError;
use crate::field::{Field, HasFields, TagValue};
use crate::processor::compare::Comparer;

/// Selects tracks from a universe by comparer rules and explicit path
/// exceptions.
///
/// Paths are sanitized on construction: stems belonging to any of the
/// `other_folders` are replaced with the library folder, separators are
/// normalized to the library's convention, and comparisons are
/// case-insensitive. A path in both lists is dropped from the includes.
#[derive(Debug, Clone, Default)]
pub struct TrackFilter {
    pub comparers: Vec<Comparer>,
    /// Require all comparers to match (`true`) or any one of them (`false`).
    pub match_all: bool,
    /// Sanitized, lowercased paths always included.
    pub include_paths: Vec<String>,
    /// Sanitized, lowercased paths always excluded.
    pub exclude_paths: Vec<String>,
    pub library_folder: Option<Utf8PathBuf>,
    /// The foreign library stem found in the loaded paths, if any.
    pub original_folder: Option<Utf8PathBuf>,
}

impl TrackFilter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        comparers: Vec<Comparer>,
        match_all: bool,
        include_paths: Vec<String>,
        exclude_paths: Vec<String>,
        library_folder: Option<Utf8PathBuf>,
        other_folders: &[Utf8PathBuf],
        check_existence: bool,
    ) -> Self {
        let mut filter = TrackFilter {
            comparers,
            match_all,
            include_paths,
            exclude_paths,
            library_folder: library_folder.map(|folder| strip_trailing_sep(&folder)),
            original_folder: None,
        };
        filter.sanitize_paths(other_folders, check_existence);
        filter
    }

    /// Sanitize the stored include/exclude paths. Excludes win: a path in
    /// both lists is removed from the includes.
    pub fn sanitize_paths(&mut self, other_folders: &[Utf8PathBuf], check_existence: bool) {
        if self.library_folder.is_some() && self.original_folder.is_none() {
            self.original_folder = self.find_other_folder_stem(other_folders);
        }

        let exclude: Vec<String> = self
            .exclude_paths
            .iter()
            .filter_map(|path| self.sanitize_path(path, check_existence))
            .map(|path| path.to_lowercase())
            .collect();

        let include: Vec<String> = self
            .include_paths
            .iter()
            .filter_map(|path| self.sanitize_path(path, check_existence))
            .map(|path| path.to_lowercase())
            .filter(|path| !exclude.contains(path))
            .collect();

        self.exclude_paths = exclude;
        self.include_paths = include;
    }

    /// The first `other_folders` stem that prefixes any include/exclude path.
    fn find_other_folder_stem(&self, other_folders: &[Utf8PathBuf]) -> Option<Utf8PathBuf> {
        let stems: Vec<Utf8PathBuf> = other_folders.iter().map(|f| strip_trailing_sep(f)).collect();
        self.include_paths
            .iter()
            .chain(&self.exclude_paths)
            .find_map(|path| {
                let path = path.to_lowercase();
                stems
                    .iter()
                    .find(|stem| path.starts_with(&stem.as_str().to_lowercase()))
                    .cloned()
            })
    }

    /// Replace a foreign library stem, normalize separators, and optionally
    /// reject paths that do not exist on disk.
    pub fn sanitize_path(&self, path: &str, check_existence: bool) -> Option<String> {
        if path.is_empty() {
            return None;
        }

        let mut path = path.to_string();
        if let Some(library_folder) = &self.library_folder {
            if let Some(original) = &self.original_folder
                && let Some(tail) = strip_prefix_ignore_case(&path, original.as_str())
            {
                path = format!("{library_folder}{tail}");
            }
            path = self.correct_path_separator(&path);
        }

        if !check_existence || Utf8Path::new(&path).exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Align separators with the separator the library folder uses.
    pub fn correct_path_separator(&self, path: &str) -> String {
        match &self.library_folder {
            Some(folder) if folder.as_str().contains('/') => path.replace('\\', "/"),
            Some(_) => path.replace('/', "\\"),
            None => path.to_string(),
        }
    }

    /// Evaluate the filter over ``universe``, returning matching tracks in
    /// universe order: tracks passing the comparers or named by the
    /// includes, minus the excludes.
    pub fn evaluate<T: HasFields + Clone>(
        &self,
        universe: &[T],
        reference: Option<&T>,
    ) -> Result<Vec<T>, MusifyError> {
        let mut result = Vec::new();
        for track in universe {
            let path = track_path(track);
            if self.exclude_paths.contains(&path) {
                continue;
            }
            if self.include_paths.contains(&path) || self.compared(track, reference)? {
                result.push(track.clone());
            }
        }
        Ok(result)
    }

    /// Whether the comparers alone admit ``track``.
    pub fn compared<T: HasFields>(
        &self,
        track: &T,
        reference: Option<&T>,
    ) -> Result<bool, MusifyError> {
        if self.comparers.is_empty() {
            return Ok(false);
        }

        let mut all = true;
        let mut any = false;
        for comparer in &self.comparers {
            let matched = if comparer.needs_reference() {
                comparer.compare(track, reference)?
            } else {
                comparer.compare(track, None)?
            };
            all &= matched;
            any |= matched;
        }
        Ok(if self.match_all { all } else { any })
    }

    /// Lowercased sanitized include paths as a set, for limiter ignore lists.
    pub fn include_set(&self) -> HashSet<String> {
        self.include_paths.iter().cloned().collect()
    }
}

fn track_path<T: HasFields>(track: &T) -> String {
    match track.field(Field::Path) {
        TagValue::Str(path) => path.to_lowercase(),
        _ => String::new(),
    }
}

/// ASCII-case-insensitive prefix strip, byte-boundary safe.
pub(crate) fn strip_prefix_ignore_case<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if path.len() >= prefix.len()
        && path.is_char_boundary(prefix.len())
        && path[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&path[prefix.len()..])
    } else {
        None
    }
}

fn strip_trailing_sep(path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(path.as_str().trim_end_matches(['/', '\\']))
}
