use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use super::*;
use crate::field::Field;
use crate::local::track::testing::{track, track_with_uri};
use crate::progress::NoProgress;
use crate::remote::testing::MockApi;

const TRACK_URI: &str = "spotify:track:6rqhFgbbKwnb9MLmUQDhG6";

fn track_response(uri: &str, name: &str, artist: &str, album: &str, length_ms: u64) -> Value {
    json!({
        "uri": uri,
        "name": name,
        "artists": [{"name": artist}],
        "album": {"name": album},
        "duration_ms": length_ms,
    })
}

fn collection_of(tracks: Vec<crate::local::track::LocalTrack>) -> TrackCollection {
    TrackCollection::from_tracks("test", tracks)
}

#[tokio::test]
async fn matches_item_via_first_query_tier() {
    let api = MockApi::new();
    api.stub_query(
        "love song artist",
        vec![track_response(TRACK_URI, "Love Song", "Artist", "Album", 180_000)],
    );

    let mut collections = vec![collection_of(vec![track(
        "/lib/a.mp3",
        "Love Song",
        "Artist",
        "Album",
    )])];
    let searcher = Searcher::new(&api);
    let results = searcher.search(&mut collections, &NoProgress).await;

    assert_eq!(collections[0].tracks()[0].has_uri(), Some(true));
    assert_eq!(collections[0].tracks()[0].uri().unwrap().as_str(), TRACK_URI);
    assert_eq!(results[0].1.matched, vec!["Love Song".to_string()]);
    assert!(results[0].1.unmatched.is_empty());
}

#[tokio::test]
async fn falls_back_through_query_tiers() {
    let api = MockApi::new();
    // only the third tier (name alone) returns anything
    api.stub_query(
        "love song",
        vec![track_response(TRACK_URI, "Love Song", "Artist", "Album", 180_000)],
    );

    let mut collections = vec![collection_of(vec![track(
        "/lib/a.mp3",
        "Love Song",
        "Artist",
        "Album",
    )])];
    Searcher::new(&api).search(&mut collections, &NoProgress).await;

    assert_eq!(collections[0].tracks()[0].has_uri(), Some(true));
}

#[tokio::test]
async fn unmatched_when_all_tiers_are_empty() {
    let api = MockApi::new();
    let mut collections = vec![collection_of(vec![track(
        "/lib/a.mp3",
        "Love Song",
        "Artist",
        "Album",
    )])];
    let results = Searcher::new(&api).search(&mut collections, &NoProgress).await;

    assert_eq!(collections[0].tracks()[0].has_uri(), None);
    assert_eq!(results[0].1.unmatched, vec!["Love Song".to_string()]);
}

#[tokio::test]
async fn resolved_items_are_skipped() {
    let api = MockApi::new();
    api.stub_query(
        "new song artist",
        vec![track_response(TRACK_URI, "New Song", "Artist", "Album", 180_000)],
    );

    let already = track_with_uri("/lib/done.mp3", "Done", "spotify:track:7rqhFgbbKwnb9MLmUQDhG6");
    let missing = track("/lib/new.mp3", "New Song", "Artist", "Album");
    let mut collections = vec![collection_of(vec![already, missing])];
    let results = Searcher::new(&api).search(&mut collections, &NoProgress).await;

    let (_, result) = &results[0];
    assert_eq!(result.skipped, vec!["Done".to_string()]);
    assert_eq!(result.matched, vec!["New Song".to_string()]);
}

#[tokio::test]
async fn low_scoring_candidates_do_not_match() {
    let api = MockApi::new();
    api.stub_query(
        "love song artist",
        vec![track_response(
            TRACK_URI,
            "Completely Different",
            "Someone Else",
            "Nothing",
            10_000,
        )],
    );

    let mut collections = vec![collection_of(vec![track(
        "/lib/a.mp3",
        "Love Song",
        "Artist",
        "Album",
    )])];
    Searcher::new(&api).search(&mut collections, &NoProgress).await;

    assert_eq!(collections[0].tracks()[0].has_uri(), None);
}

#[tokio::test]
async fn albums_search_as_a_unit_then_by_title() {
    let api = MockApi::new();
    let album_uri = "spotify:album:1rqhFgbbKwnb9MLmUQDhG6";
    let one_uri = "spotify:track:2rqhFgbbKwnb9MLmUQDhG6";
    let two_uri = "spotify:track:3rqhFgbbKwnb9MLmUQDhG6";

    let full_album = json!({
        "uri": album_uri,
        "name": "First Light",
        "artists": [{"name": "Band"}],
        "release_date": "2004",
        "album_type": "album",
        "total_tracks": 2,
        "tracks": {"items": [
            track_response(one_uri, "One", "Band", "First Light", 180_000),
            track_response(two_uri, "Two", "Band", "First Light", 180_000),
        ], "total": 2},
    });
    // the search result is a partial album; the full track list arrives on
    // reload
    let partial = json!({
        "uri": album_uri,
        "name": "First Light",
        "artists": [{"name": "Band"}],
        "release_date": "2004",
        "album_type": "album",
        "total_tracks": 2,
    });
    api.register_item(full_album);
    api.stub_query("first light band", vec![partial]);

    let tracks = vec![
        track("/lib/al/1.mp3", "One", "Band", "First Light"),
        track("/lib/al/2.mp3", "Two", "Band", "First Light"),
    ];
    let mut collection = TrackCollection::grouped(Field::Album, "First Light", tracks).unwrap();
    assert_eq!(collection.compilation(), Some(false));

    let mut collections = vec![collection.clone()];
    Searcher::new(&api).search(&mut collections, &NoProgress).await;
    collection = collections.pop().unwrap();

    assert_eq!(collection.tracks()[0].uri().unwrap().as_str(), one_uri);
    assert_eq!(collection.tracks()[1].uri().unwrap().as_str(), two_uri);
}

#[test]
fn query_skips_blank_and_duplicate_values() {
    let clean = CleanTags {
        name: "love song".to_string(),
        title: "love song".to_string(),
        artist: String::new(),
        album: "love song".to_string(),
        length: None,
        year: None,
    };
    assert_eq!(
        build_query(&clean, &[QueryField::Name, QueryField::Artist]),
        "love song"
    );
    assert_eq!(
        build_query(&clean, &[QueryField::Name, QueryField::Album]),
        "love song"
    );
}
