//! Tag normalizer: reduces raw tag strings to comparable values.
//!
//! The matcher never looks at raw tags; it only consumes the [`CleanTags`]
//! produced here. Cleaning is deterministic, and callers must not feed
//! cleaned values back through the pipeline.

use std::sync::LazyLock;

use regex::Regex;

use crate::item::{Matchable, TAG_SEP};

/// Words removed from every string tag.
const REMOVE_ALL: &[&str] = &["the", "a", "&", "and"];

static BRACKETED_ROUND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static BRACKETED_SQUARE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static NON_WORD_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w']+").unwrap());

/// Per-field cleaning rules: extra words to remove, split words where only
/// the left side is kept, and an optional preprocess step.
struct CleanTagConfig {
    remove: &'static [&'static str],
    split: &'static [&'static str],
    preprocess: Option<fn(&str) -> &str>,
}

const TITLE_CONFIG: CleanTagConfig = CleanTagConfig {
    remove: &["part"],
    split: &["featuring", "feat.", "ft.", "/"],
    preprocess: None,
};

const ARTIST_CONFIG: CleanTagConfig = CleanTagConfig {
    remove: &[],
    split: &["featuring", "feat.", "ft.", "vs"],
    preprocess: None,
};

const ALBUM_CONFIG: CleanTagConfig = CleanTagConfig {
    remove: &["ep"],
    split: &[],
    // albums often carry " - remaster/deluxe/..." suffixes
    preprocess: Some(|value| value.split('-').next().unwrap_or(value)),
};

/// Normalized tags with known fields, derived from an item's raw tags and
/// regenerable at any time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanTags {
    pub name: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub length: Option<f64>,
    pub year: Option<i32>,
}

fn process(value: &str, config: &CleanTagConfig) -> String {
    let value = match config.preprocess {
        Some(preprocess) => preprocess(value),
        None => value,
    };

    let value = BRACKETED_ROUND.replace_all(value, "");
    let value = BRACKETED_SQUARE.replace_all(&value, "");
    let mut value = value.to_lowercase();

    for word in REMOVE_ALL.iter().chain(config.remove) {
        value = remove_word(&value, word);
    }

    for word in config.split {
        if let Some((left, _)) = value.split_once(word) {
            value = left.trim_end().to_string();
        }
    }

    NON_WORD_RUN.replace_all(&value, " ").trim().to_string()
}

/// Remove whitespace-bounded occurrences of ``word``, leaving a single space.
fn remove_word(value: &str, word: &str) -> String {
    let word = regex::escape(word);
    let pattern = format!(r"\s{word}\s|^{word}\s|\s{word}$");
    // the word lists are tiny constants, so compiling here is fine
    Regex::new(&pattern)
        .expect("escaped stop word is a valid pattern")
        .replace_all(value, " ")
        .into_owned()
}

/// Produce [`CleanTags`] for any item.
///
/// `name` is set to the cleaned value of whichever string field matches the
/// item's display name (a track's title, a collection's album name), so that
/// name-based scoring sees the same cleaning as the field itself.
///
/// Multi-artist strings are cleaned per artist so the [`TAG_SEP`] separator
/// survives for the matcher's per-artist scoring.
pub fn clean_tags(item: &dyn Matchable) -> CleanTags {
    let name = item.name();
    let mut tags = CleanTags {
        length: item.length(),
        year: item.year(),
        ..Default::default()
    };

    if let Some(raw) = item.title().filter(|raw| !raw.is_empty()) {
        tags.title = process(raw, &TITLE_CONFIG);
        if raw == name {
            tags.name = tags.title.clone();
        }
    }
    if let Some(raw) = item.artist().filter(|raw| !raw.is_empty()) {
        tags.artist = raw
            .split(TAG_SEP)
            .map(|artist| process(artist, &ARTIST_CONFIG))
            .filter(|artist| !artist.is_empty())
            .collect::<Vec<_>>()
            .join(TAG_SEP);
        if raw == name {
            tags.name = tags.artist.clone();
        }
    }
    if let Some(raw) = item.album().filter(|raw| !raw.is_empty()) {
        tags.album = process(raw, &ALBUM_CONFIG);
        if raw == name {
            tags.name = tags.album.clone();
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::remote::Uri;

    struct Fake {
        name: String,
        title: Option<String>,
        artist: Option<String>,
        album: Option<String>,
    }

    impl Fake {
        fn track(title: &str, artist: &str, album: &str) -> Self {
            Fake {
                name: title.to_string(),
                title: Some(title.to_string()),
                artist: Some(artist.to_string()),
                album: Some(album.to_string()),
            }
        }
    }

    impl Matchable for Fake {
        fn name(&self) -> &str {
            &self.name
        }
        fn title(&self) -> Option<&str> {
            self.title.as_deref()
        }
        fn artist(&self) -> Option<&str> {
            self.artist.as_deref()
        }
        fn album(&self) -> Option<&str> {
            self.album.as_deref()
        }
        fn length(&self) -> Option<f64> {
            Some(210.0)
        }
        fn year(&self) -> Option<i32> {
            Some(2011)
        }
        fn uri(&self) -> Option<&Uri> {
            None
        }
    }

    #[test]
    fn strips_brackets_and_stop_words() {
        let track = Fake::track("The Love Song (Remastered 2011)", "A Band & Friends", "Songs");
        let tags = clean_tags(&track);
        assert_eq!(tags.title, "love song");
        assert_eq!(tags.name, "love song");
        assert_eq!(tags.artist, "band friends");
    }

    #[test]
    fn splits_title_on_featuring() {
        let track = Fake::track("Money feat. Somebody Else", "Artist", "Album");
        assert_eq!(clean_tags(&track).title, "money");
    }

    #[test]
    fn artist_splits_on_vs() {
        let track = Fake::track("T", "Alpha vs Beta", "Album");
        assert_eq!(clean_tags(&track).artist, "alpha");
    }

    #[test]
    fn album_keeps_text_before_dash_and_drops_ep() {
        let track = Fake::track("T", "X", "First Light - 2004 Deluxe Edition");
        assert_eq!(clean_tags(&track).album, "first light");

        let track = Fake::track("T", "X", "Close Cover EP");
        assert_eq!(clean_tags(&track).album, "close cover");
    }

    #[test]
    fn name_empty_when_no_field_matches_it() {
        let mut track = Fake::track("Some Other Name", "X", "Y");
        track.title = Some("Different".to_string());
        track.name = "Some Other Name".to_string();
        let tags = clean_tags(&track);
        assert_eq!(tags.name, "");
        assert_eq!(tags.title, "different");
    }

    #[test]
    fn multi_artist_separator_survives_cleaning() {
        let track = Fake::track("T", "The Alpha; Gamma (UK)", "Album");
        assert_eq!(clean_tags(&track).artist, "alpha; gamma");
    }

    #[test]
    fn numbers_copied_through() {
        let tags = clean_tags(&Fake::track("T", "X", "Y"));
        assert_eq!(tags.length, Some(210.0));
        assert_eq!(tags.year, Some(2011));
    }

    #[test]
    fn cleaning_is_deterministic() {
        let track = Fake::track("Gimme! Gimme! Gimme! (A Man After Midnight)", "ABBA", "Voulez-Vous");
        assert_eq!(clean_tags(&track), clean_tags(&track));
    }
}
