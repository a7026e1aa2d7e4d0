use pretty_assertions::assert_eq;

use super::*;
use crate::remote::Uri;

#[derive(Debug, Clone, Default)]
struct FakeTrack {
    name: String,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    length: Option<f64>,
    year: Option<i32>,
    uri: Option<Uri>,
}

impl FakeTrack {
    fn new(title: &str) -> Self {
        FakeTrack {
            name: title.to_string(),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn artist(mut self, artist: &str) -> Self {
        self.artist = Some(artist.to_string());
        self
    }

    fn album(mut self, album: &str) -> Self {
        self.album = Some(album.to_string());
        self
    }

    fn length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}

impl Matchable for FakeTrack {
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
        self.length
    }
    fn year(&self) -> Option<i32> {
        self.year
    }
    fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }
}

struct FakeAlbum {
    name: String,
    artist: Option<String>,
    year: Option<i32>,
    tracks: Vec<FakeTrack>,
}

impl Matchable for FakeAlbum {
    fn name(&self) -> &str {
        &self.name
    }
    fn title(&self) -> Option<&str> {
        None
    }
    fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }
    fn album(&self) -> Option<&str> {
        Some(&self.name)
    }
    fn length(&self) -> Option<f64> {
        let lengths: Vec<f64> = self.tracks.iter().filter_map(|t| t.length).collect();
        (!lengths.is_empty()).then(|| lengths.iter().sum())
    }
    fn year(&self) -> Option<i32> {
        self.year
    }
    fn uri(&self) -> Option<&Uri> {
        None
    }
}

impl MatchableCollection for FakeAlbum {
    type Item = FakeTrack;

    fn items(&self) -> &[FakeTrack] {
        &self.tracks
    }
}

#[test]
fn empty_candidates_return_none() {
    let matcher = Matcher::default();
    let source = FakeTrack::new("Love Song");
    let candidates: Vec<FakeTrack> = Vec::new();
    assert_eq!(
        matcher.score_match(&source, &candidates, 0.1, 0.8, &MatchField::all()),
        None
    );
}

#[test]
fn name_score_penalised_by_reduction_keyword() {
    // token overlap is 2/2 but "live" only appears in the candidate,
    // so the name score drops to exactly 0.5
    let matcher = Matcher::default();
    let source = FakeTrack::new("Love Song");
    let candidates = vec![FakeTrack::new("Love Song Live")];

    let hit = matcher.score_match(&source, &candidates, 0.49, 1.0, &[MatchField::Title]);
    assert_eq!(hit, Some(0));
    let miss = matcher.score_match(&source, &candidates, 0.5, 1.0, &[MatchField::Title]);
    assert_eq!(miss, None);
}

#[test]
fn artist_score_decays_per_candidate_artist() {
    // candidate artist 1 covers 1 of 2 source tokens (0.5 * 1/1),
    // artist 2 covers none (0 * 1/2): total 0.5
    let matcher = Matcher::default();
    let source = FakeTrack::new("T").artist("Alpha Beta");
    let candidates = vec![FakeTrack::new("X").artist("Alpha; Gamma")];

    let hit = matcher.score_match(&source, &candidates, 0.49, 1.0, &[MatchField::Artist]);
    assert_eq!(hit, Some(0));
    let miss = matcher.score_match(&source, &candidates, 0.5, 1.0, &[MatchField::Artist]);
    assert_eq!(miss, None);
}

#[test]
fn length_score_window() {
    // 120s vs 125s scores 115/120 = 0.9583..
    let matcher = Matcher::default();
    let source = FakeTrack::new("T").length(120.0);
    let candidates = vec![FakeTrack::new("T").length(125.0)];

    let hit = matcher.score_match(&source, &candidates, 0.95, 1.0, &[MatchField::Length]);
    assert_eq!(hit, Some(0));
    let miss = matcher.score_match(&source, &candidates, 0.96, 1.0, &[MatchField::Length]);
    assert_eq!(miss, None);
}

#[test]
fn year_score_window() {
    let matcher = Matcher::default();
    let source = FakeTrack::new("T").year(2010);
    let exact = vec![FakeTrack::new("T").year(2010)];
    let outside = vec![FakeTrack::new("T").year(1995)];

    assert_eq!(
        matcher.score_match(&source, &exact, 0.9, 1.0, &[MatchField::Year]),
        Some(0)
    );
    assert_eq!(
        matcher.score_match(&source, &outside, 0.01, 1.0, &[MatchField::Year]),
        None
    );
}

#[test]
fn ties_keep_first_seen() {
    let matcher = Matcher::default();
    let source = FakeTrack::new("Love Song");
    let candidates = vec![FakeTrack::new("Love Song"), FakeTrack::new("Love Song")];
    assert_eq!(
        matcher.score_match(&source, &candidates, 0.1, 1.0, &[MatchField::Title]),
        Some(0)
    );
}

#[test]
fn short_circuits_at_max_score() {
    // the first candidate already reaches max_score, so the better-scoring
    // second candidate is never considered
    let matcher = Matcher::default();
    let source = FakeTrack::new("Love Song").length(120.0);
    let candidates = vec![
        FakeTrack::new("Love Song").length(100.0),
        FakeTrack::new("Love Song").length(120.0),
    ];
    assert_eq!(
        matcher.score_match(&source, &candidates, 0.1, 0.8, &[MatchField::Title, MatchField::Length]),
        Some(0)
    );
}

#[test]
fn karaoke_candidates_disqualified() {
    let source = FakeTrack::new("Love Song").album("Greatest Hits");
    let candidates = vec![FakeTrack::new("Love Song").album("Karaoke Hits")];

    let strict = Matcher::default();
    assert_eq!(
        strict.score_match(&source, &candidates, 0.1, 1.0, &[MatchField::Title]),
        None
    );

    // allow_karaoke lets the candidate through
    let lenient = Matcher::new(true);
    assert_eq!(
        lenient.score_match(&source, &candidates, 0.4, 1.0, &[MatchField::Title]),
        Some(0)
    );
}

#[test]
fn karaoke_checks_artist_and_name_too() {
    let matcher = Matcher::default();
    let source = FakeTrack::new("Love Song").artist("Band");
    let by_artist = vec![FakeTrack::new("Love Song").artist("Backing Ensemble")];
    assert_eq!(
        matcher.score_match(&source, &by_artist, 0.1, 1.0, &[MatchField::Title]),
        None
    );
}

#[test]
fn collections_score_their_items() {
    let matcher = Matcher::default();
    let tracks = vec![
        FakeTrack::new("One").length(100.0),
        FakeTrack::new("Two").length(200.0),
    ];
    let source = FakeAlbum {
        name: "First Light".to_string(),
        artist: Some("Band".to_string()),
        year: Some(2004),
        tracks: tracks.clone(),
    };
    let good = FakeAlbum {
        name: "First Light".to_string(),
        artist: Some("Band".to_string()),
        year: Some(2004),
        tracks,
    };
    let bad = FakeAlbum {
        name: "Unrelated".to_string(),
        artist: Some("Others".to_string()),
        year: Some(1971),
        tracks: vec![FakeTrack::new("Three").length(50.0)],
    };

    let candidates = vec![bad, good];
    assert_eq!(
        matcher.score_match_collections(
            &source,
            &candidates,
            0.1,
            0.8,
            &[MatchField::Artist, MatchField::Album, MatchField::Length],
        ),
        Some(1)
    );
}
