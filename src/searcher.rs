//! Finds remote matches for unmatched local items by driving the remote
//! query endpoint and scoring the candidates.

use serde_json::Value;
use tracing::{debug, warn};

use crate::clean::{CleanTags, clean_tags};
use crate::item::{Matchable, UriState};
use crate::local::TrackCollection;
use crate::matcher::{MatchField, Matcher};
use crate::progress::Progress;
use crate::remote::api::RemoteApi;
use crate::remote::id::ObjectKind;
use crate::remote::track::{RemoteAlbum, RemoteTrack};
use crate::report;

/// The cleaned-tag keys a search query is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    Name,
    Artist,
    Album,
}

impl QueryField {
    fn value<'a>(&self, clean: &'a CleanTags) -> &'a str {
        match self {
            QueryField::Name => &clean.name,
            QueryField::Artist => &clean.artist,
            QueryField::Album => &clean.album,
        }
    }
}

/// Settings for one kind of search: three query tiers tried in order, the
/// fields to match candidates on, and the scoring thresholds.
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub search_fields: [&'static [QueryField]; 3],
    pub match_fields: &'static [MatchField],
    pub result_count: usize,
    pub min_score: f64,
    pub max_score: f64,
}

pub const ITEM_SETTINGS: SearchSettings = SearchSettings {
    search_fields: [
        &[QueryField::Name, QueryField::Artist],
        &[QueryField::Name, QueryField::Album],
        &[QueryField::Name],
    ],
    match_fields: &[
        MatchField::Title,
        MatchField::Artist,
        MatchField::Album,
        MatchField::Length,
    ],
    result_count: 10,
    min_score: 0.1,
    max_score: 0.8,
};

pub const ALBUM_SETTINGS: SearchSettings = SearchSettings {
    search_fields: [&[QueryField::Name, QueryField::Artist], &[QueryField::Name], &[]],
    match_fields: &[MatchField::Artist, MatchField::Album, MatchField::Length],
    result_count: 5,
    min_score: 0.1,
    max_score: 0.7,
};

/// Per-collection outcome, by item name. `skipped` holds the items that
/// already had a URI state on entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub matched: Vec<String>,
    pub unmatched: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct Searcher<'a> {
    pub api: &'a dyn RemoteApi,
    pub matcher: Matcher,
    pub use_cache: bool,
}

impl<'a> Searcher<'a> {
    pub fn new(api: &'a dyn RemoteApi) -> Self {
        Searcher {
            api,
            matcher: Matcher::default(),
            use_cache: true,
        }
    }

    /// Search for remote matches across ``collections``, assigning URIs to
    /// matched items in place.
    pub async fn search(
        &self,
        collections: &mut [TrackCollection],
        progress: &dyn Progress,
    ) -> Vec<(String, SearchResult)> {
        debug!("searching items: start");
        let nothing_to_do = collections
            .iter()
            .all(|c| c.tracks().iter().all(|t| t.has_uri().is_some()));
        if nothing_to_do {
            debug!("no items to search");
            return Vec::new();
        }

        progress.start(collections.len() as u64);
        let mut results = Vec::new();
        for collection in collections.iter_mut() {
            let entry_states: Vec<Option<bool>> =
                collection.tracks().iter().map(|t| t.has_uri()).collect();
            let skipped: Vec<String> = collection
                .tracks()
                .iter()
                .filter(|t| t.has_uri().is_some())
                .map(|t| t.name().to_string())
                .collect();

            if entry_states.iter().any(|state| state.is_none()) {
                if collection.compilation() == Some(false) {
                    debug!(collection = %collection.name, "searching with the album algorithm");
                    self.search_album(collection).await;
                    if collection.tracks().iter().any(|t| t.has_uri().is_none()) {
                        self.search_items(collection).await;
                    }
                } else {
                    debug!(collection = %collection.name, "searching with the item algorithm");
                    self.search_items(collection).await;
                }
            } else {
                debug!(collection = %collection.name, "skipping search, no tracks to match");
            }

            let mut result = SearchResult {
                skipped,
                ..Default::default()
            };
            for (track, entry) in collection.tracks().iter().zip(&entry_states) {
                match (entry, track.has_uri()) {
                    (None, Some(true)) => result.matched.push(track.name().to_string()),
                    (None, None) => result.unmatched.push(track.name().to_string()),
                    _ => {}
                }
            }
            results.push((collection.name.clone(), result));
            progress.advance(1);
        }
        progress.finish();

        report::log_search_results(&results);
        debug!("searching items: done");
        results
    }

    /// Three-tier query fallback; `None` when every tier came back empty or
    /// the API failed.
    async fn get_results(
        &self,
        item: &dyn Matchable,
        kind: ObjectKind,
        settings: &SearchSettings,
    ) -> Option<Vec<Value>> {
        let clean = clean_tags(item);
        for fields in settings.search_fields {
            if fields.is_empty() {
                continue;
            }
            let query = build_query(&clean, fields);
            if query.is_empty() {
                continue;
            }

            match self
                .api
                .query(&query, kind, settings.result_count, self.use_cache)
                .await
            {
                Ok(results) if !results.is_empty() => {
                    debug!(item = item.name(), %query, hits = results.len(), "query hit");
                    return Some(results);
                }
                Ok(_) => debug!(item = item.name(), %query, "query empty, trying next tier"),
                Err(error) => {
                    // the item stays unmatched, the search moves on
                    warn!(item = item.name(), %error, "api error while fetching candidates");
                    return None;
                }
            }
        }
        debug!(item = item.name(), "match failed: no results");
        None
    }

    /// Search and score each unmatched item on its own.
    async fn search_items(&self, collection: &mut TrackCollection) {
        let settings = &ITEM_SETTINGS;
        for idx in 0..collection.len() {
            if collection.tracks()[idx].has_uri().is_some() {
                continue;
            }

            let Some(responses) = self
                .get_results(&collection.tracks()[idx], ObjectKind::Track, settings)
                .await
            else {
                continue;
            };
            let candidates: Vec<RemoteTrack> = responses
                .into_iter()
                .filter_map(|response| RemoteTrack::from_response(response).ok())
                .collect();

            let best = self.matcher.score_match(
                &collection.tracks()[idx],
                &candidates,
                settings.min_score,
                settings.max_score,
                settings.match_fields,
            );
            if let Some(best) = best {
                let uri = candidates[best].uri.clone();
                collection.tracks_mut()[idx].set_uri(UriState::Valid(uri));
            }
        }
    }

    /// Match the collection against whole albums first, then its items
    /// against the matched album's tracks on title alone.
    async fn search_album(&self, collection: &mut TrackCollection) {
        let settings = &ALBUM_SETTINGS;
        let Some(responses) = self.get_results(collection, ObjectKind::Album, settings).await
        else {
            return;
        };

        let mut albums = Vec::new();
        for response in responses {
            let Ok(mut album) = RemoteAlbum::from_response(response) else {
                continue;
            };
            match album.reload(self.api, self.use_cache).await {
                Ok(()) => albums.push(album),
                Err(error) => {
                    warn!(album = %album.name, %error, "could not load album tracks");
                }
            }
        }
        // prefer albums whose track count is closest to ours
        albums.sort_by_key(|album| album.track_total.abs_diff(collection.len()));

        let Some(best) = self.matcher.score_match_collections(
            collection,
            &albums,
            settings.min_score,
            settings.max_score,
            settings.match_fields,
        ) else {
            return;
        };
        let album = &albums[best];

        for idx in 0..collection.len() {
            if collection.tracks()[idx].has_uri().is_some() {
                continue;
            }
            let matched = self.matcher.score_match(
                &collection.tracks()[idx],
                &album.tracks,
                0.1,
                0.8,
                &[MatchField::Title],
            );
            if let Some(matched) = matched {
                let uri = album.tracks[matched].uri.clone();
                collection.tracks_mut()[idx].set_uri(UriState::Valid(uri));
            }
        }
    }
}

/// Join the chosen cleaned values, skipping blanks and duplicates.
fn build_query(clean: &CleanTags, fields: &[QueryField]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for field in fields {
        let value = field.value(clean);
        if !value.is_empty() && !parts.contains(&value) {
            parts.push(value);
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests;
