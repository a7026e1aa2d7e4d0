//! Fuzzy scoring of one item against N candidates.
//!
//! Each per-field score lands in `[0, 1]`; a candidate's overall score is the
//! arithmetic mean over the requested fields. Matching stops early once a
//! candidate reaches `max_score`, and only a best score strictly above
//! `min_score` produces a match.

use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::debug;

use crate::clean::{CleanTags, clean_tags};
use crate::item::{Matchable, MatchableCollection, TAG_SEP};
use crate::util::limit_value;

/// Words that mark a candidate as karaoke. Candidates carrying one of these
/// in name, artist or album score 0 unless `allow_karaoke` is set.
pub const KARAOKE_TAGS: &[&str] = &["karaoke", "backing", "instrumental"];

/// Words that reduce the name score when present in the candidate but not in
/// the source.
const REDUCE_ON: &[&str] = &["live", "demo", "acoustic", "karaoke", "backing", "instrumental"];
const REDUCE_FACTOR: f64 = 0.5;

/// The fields `score_match` can be asked to score on. Passing
/// [`MatchField::all`] is the "match on everything" sentinel.
#[derive(Debug, Display, EnumIter, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum MatchField {
    Title,
    Artist,
    Album,
    Length,
    Year,
}

impl MatchField {
    pub fn all() -> Vec<MatchField> {
        MatchField::iter().collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    /// When false, candidates identified as karaoke are disqualified.
    pub allow_karaoke: bool,
    /// A difference of this many years scores 0 on the year field.
    pub year_range: i32,
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher {
            allow_karaoke: false,
            year_range: 10,
        }
    }
}

impl Matcher {
    pub fn new(allow_karaoke: bool) -> Self {
        Matcher {
            allow_karaoke,
            ..Default::default()
        }
    }

    /// Score ``source`` against each candidate and return the index of the
    /// best one, or `None` when nothing scored above ``min_score``.
    ///
    /// Ties keep the first candidate seen; iteration stops once a candidate
    /// reaches ``max_score``.
    pub fn score_match<S, C>(
        &self,
        source: &S,
        results: &[C],
        min_score: f64,
        max_score: f64,
        match_on: &[MatchField],
    ) -> Option<usize>
    where
        S: Matchable,
        C: Matchable,
    {
        let min_score = limit_value(min_score, 0.01, 1.0);
        let max_score = limit_value(max_score, 0.01, 1.0).max(min_score);

        let source_clean = clean_tags(source);
        let (best_score, best) = self.best_of(source, &source_clean, results, max_score, match_on);

        if best_score > min_score {
            if let Some(idx) = best {
                debug!(
                    source = source.name(),
                    uri = ?results[idx].uri(),
                    score = best_score,
                    "< matched"
                );
            }
            best
        } else {
            debug!(source = source.name(), score = best_score, "no match");
            None
        }
    }

    /// Collection-to-collection variant: adds an `items` score, the mean over
    /// source items of each item's best score against the candidate's items.
    pub fn score_match_collections<S, C>(
        &self,
        source: &S,
        results: &[C],
        min_score: f64,
        max_score: f64,
        match_on: &[MatchField],
    ) -> Option<usize>
    where
        S: MatchableCollection,
        C: MatchableCollection,
    {
        let min_score = limit_value(min_score, 0.01, 1.0);
        let max_score = limit_value(max_score, 0.01, 1.0).max(min_score);

        let source_clean = clean_tags(source);
        let source_items = source.items();

        let mut best_score = 0.0;
        let mut best = None;
        for (idx, candidate) in results.iter().enumerate() {
            let candidate_clean = clean_tags(candidate);
            let Some(mut scores) =
                self.field_scores(source, &source_clean, candidate, &candidate_clean, match_on)
            else {
                continue;
            };

            if !source_items.is_empty() && !candidate.items().is_empty() {
                let mut items_score = 0.0;
                for item in source_items {
                    let item_clean = clean_tags(item);
                    let (score, _) = self.best_of(item, &item_clean, candidate.items(), max_score, match_on);
                    items_score += score / source_items.len() as f64;
                }
                scores.push(items_score);
            }

            if scores.is_empty() {
                continue;
            }
            let score = scores.iter().sum::<f64>() / scores.len() as f64;
            debug!(source = source.name(), uri = ?candidate.uri(), score, best_score, "> testing");

            if score > best_score {
                best_score = score;
                best = Some(idx);
            }
            if best_score >= max_score {
                break;
            }
        }

        if best_score > min_score { best } else { None }
    }

    /// Best score and index over ``results``, no minimum applied.
    fn best_of<C: Matchable>(
        &self,
        source: &dyn Matchable,
        source_clean: &CleanTags,
        results: &[C],
        max_score: f64,
        match_on: &[MatchField],
    ) -> (f64, Option<usize>) {
        if results.is_empty() {
            debug!(source = source.name(), "no results given, skipping");
            return (0.0, None);
        }

        let mut best_score = 0.0;
        let mut best = None;
        for (idx, candidate) in results.iter().enumerate() {
            let candidate_clean = clean_tags(candidate);
            let Some(scores) =
                self.field_scores(source, source_clean, candidate, &candidate_clean, match_on)
            else {
                continue;
            };
            if scores.is_empty() {
                continue;
            }

            let score = scores.iter().sum::<f64>() / scores.len() as f64;
            debug!(source = source.name(), uri = ?candidate.uri(), score, best_score, "> testing");

            if score > best_score {
                best_score = score;
                best = Some(idx);
            }
            if best_score >= max_score {
                break;
            }
        }
        (best_score, best)
    }

    /// The per-field scores for one candidate, `None` when the candidate is
    /// disqualified by the karaoke filter.
    fn field_scores(
        &self,
        source: &dyn Matchable,
        source_clean: &CleanTags,
        candidate: &dyn Matchable,
        candidate_clean: &CleanTags,
        match_on: &[MatchField],
    ) -> Option<Vec<f64>> {
        if !self.allow_karaoke && self.is_karaoke(candidate) {
            return None;
        }

        let scores = match_on
            .iter()
            .map(|field| match field {
                MatchField::Title => self.match_name(source, source_clean, candidate, candidate_clean),
                MatchField::Artist => self.match_artist(source_clean, candidate_clean),
                MatchField::Album => self.match_album(source_clean, candidate_clean),
                MatchField::Length => self.match_length(source_clean, candidate_clean),
                MatchField::Year => self.match_year(source_clean, candidate_clean),
            })
            .collect();
        Some(scores)
    }

    /// True when any karaoke word appears in the candidate's name, artist or
    /// album.
    fn is_karaoke(&self, candidate: &dyn Matchable) -> bool {
        let is_karaoke_value = |value: &str| {
            let value = value.to_lowercase();
            let words: Vec<&str> = value.split_whitespace().collect();
            KARAOKE_TAGS.iter().any(|tag| words.contains(tag))
        };

        is_karaoke_value(candidate.name())
            || candidate.artist().is_some_and(is_karaoke_value)
            || candidate.album().is_some_and(is_karaoke_value)
    }

    /// Fraction of cleaned source name tokens found in the cleaned candidate
    /// name, reduced by [`REDUCE_FACTOR`] when a reduction keyword appears in
    /// the candidate's raw name only.
    fn match_name(
        &self,
        source: &dyn Matchable,
        source_clean: &CleanTags,
        candidate: &dyn Matchable,
        candidate_clean: &CleanTags,
    ) -> f64 {
        let source_val = &source_clean.name;
        let candidate_val = &candidate_clean.name;
        if source_val.is_empty() || candidate_val.is_empty() {
            return 0.0;
        }

        let words: Vec<&str> = source_val.split_whitespace().collect();
        let hits = words.iter().filter(|word| candidate_val.contains(*word)).count();
        let mut score = hits as f64 / words.len() as f64;

        let source_raw = source.name().to_lowercase();
        let candidate_raw = candidate.name().to_lowercase();
        if REDUCE_ON
            .iter()
            .any(|word| candidate_raw.contains(word) && !source_raw.contains(word))
        {
            score = (score - REDUCE_FACTOR).max(0.0);
        }
        score
    }

    /// Token overlap per candidate artist, the k-th artist's contribution
    /// scaled by `1/k`.
    fn match_artist(&self, source_clean: &CleanTags, candidate_clean: &CleanTags) -> f64 {
        if source_clean.artist.is_empty() || candidate_clean.artist.is_empty() {
            return 0.0;
        }

        let artists_source = source_clean.artist.replace(TAG_SEP, " ");
        let source_word_count = artists_source.split_whitespace().count();
        if source_word_count == 0 {
            return 0.0;
        }

        let mut score = 0.0;
        for (k, artist) in candidate_clean.artist.split(TAG_SEP).enumerate() {
            let hits = artist
                .split_whitespace()
                .filter(|word| artists_source.contains(*word))
                .count();
            score += (hits as f64 / source_word_count as f64) * (1.0 / (k + 1) as f64);
        }
        score
    }

    fn match_album(&self, source_clean: &CleanTags, candidate_clean: &CleanTags) -> f64 {
        if source_clean.album.is_empty() || candidate_clean.album.is_empty() {
            return 0.0;
        }

        let words: Vec<&str> = source_clean.album.split_whitespace().collect();
        let hits = words
            .iter()
            .filter(|word| candidate_clean.album.contains(*word))
            .count();
        hits as f64 / words.len() as f64
    }

    fn match_length(&self, source_clean: &CleanTags, candidate_clean: &CleanTags) -> f64 {
        let (Some(source), Some(candidate)) = (source_clean.length, candidate_clean.length) else {
            return 0.0;
        };
        if source <= 0.0 {
            return 0.0;
        }
        (source - (source - candidate).abs()).max(0.0) / source
    }

    fn match_year(&self, source_clean: &CleanTags, candidate_clean: &CleanTags) -> f64 {
        let (Some(source), Some(candidate)) = (source_clean.year, candidate_clean.year) else {
            return 0.0;
        };
        let range = self.year_range as f64;
        (range - (source - candidate).abs() as f64).max(0.0) / range
    }
}

#[cfg(test)]
mod tests;
