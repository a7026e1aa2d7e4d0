use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;

use super::*;
use crate::local::playlist::m3u::M3uPlaylist;
use crate::local::track::testing::track;

fn library() -> LocalLibrary {
    let mut library = LocalLibrary::new(Utf8PathBuf::from("/lib"), None);
    library.tracks = vec![
        track("/lib/rock/a.mp3", "A", "Alpha", "First"),
        track("/lib/rock/b.mp3", "B", "Alpha", "First"),
        track("/lib/pop/c.mp3", "C", "Beta", "Second"),
    ];
    library.tracks[0].tags.genres = vec!["rock".to_string()];
    library.tracks[1].tags.genres = vec!["rock".to_string(), "indie".to_string()];
    library.tracks[2].tags.genres = vec!["pop".to_string()];
    library
}

fn playlist_of(library: &LocalLibrary, name: &str, titles: &[&str]) -> LocalPlaylist {
    let tracks = library
        .tracks
        .iter()
        .filter(|track| titles.contains(&track.name()))
        .cloned()
        .collect();
    LocalPlaylist::M3u(M3uPlaylist::from_tracks(
        &Utf8PathBuf::from(format!("/lib/playlists/{name}.m3u")),
        tracks,
    ))
}

#[test]
fn album_views_hold_exactly_their_tracks() {
    let library = library();
    let albums = library.albums().unwrap();

    assert_eq!(albums.len(), 2);
    let first = albums.iter().find(|a| a.name == "First").unwrap();
    assert_eq!(first.len(), 2);
    for track in first.tracks() {
        assert_eq!(track.tags.album.as_deref(), Some("First"));
    }
}

#[test]
fn genre_views_follow_list_membership() {
    let library = library();
    let genres = library.genres().unwrap();

    let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["indie", "pop", "rock"]);
    let rock = genres.iter().find(|g| g.name == "rock").unwrap();
    assert_eq!(rock.len(), 2);
}

#[test]
fn filtered_playlists_drop_matching_tags() {
    let mut library = library();
    library.playlists = vec![
        playlist_of(&library, "mixed", &["A", "C"]),
        playlist_of(&library, "other", &["B"]),
    ];

    let include = vec!["mixed".to_string()];
    let filters = vec![(Field::Genres, vec!["pop".to_string()])];
    let filtered = library.get_filtered_playlists(Some(&include), None, &filters);

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name(), "mixed");
    let titles: Vec<&str> = filtered[0].tracks().iter().map(|t| t.name()).collect();
    // C carries the pop genre and is dropped
    assert_eq!(titles, vec!["A"]);
    // the library's own playlist is untouched
    assert_eq!(library.playlists[0].tracks().len(), 2);
}

#[test]
fn exclude_filters_playlists_by_name() {
    let mut library = library();
    library.playlists = vec![
        playlist_of(&library, "mixed", &["A"]),
        playlist_of(&library, "other", &["B"]),
    ];

    let exclude = vec!["other".to_string()];
    let filtered = library.get_filtered_playlists(None, Some(&exclude), &[]);
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name(), "mixed");
}

#[test]
fn backup_then_restore_round_trips() {
    let mut library = library();
    library.playlists = vec![playlist_of(&library, "mixed", &["A", "C"])];

    let backup = library.backup_playlists();
    library.playlists[0].tracks_mut().clear();
    library.restore_playlists(&backup);

    assert_eq!(library.backup_playlists(), backup);
    assert_eq!(library.playlists[0].tracks().len(), 2);
}

#[test]
fn uri_backup_restores_tag_state() {
    use crate::item::UriState;
    use crate::remote::Uri;

    let mut library = library();
    library.tracks[0].set_uri(UriState::Valid(Uri(
        "spotify:track:6rqhFgbbKwnb9MLmUQDhG6".to_string(),
    )));
    library.tracks[1].set_uri(UriState::Unavailable);

    let backup = library.backup_uris();
    library.tracks[0].set_uri(UriState::Missing);
    library.tracks[1].set_uri(UriState::Missing);

    library.restore_uris(&backup);
    assert_eq!(library.tracks[0].has_uri(), Some(true));
    assert_eq!(library.tracks[1].has_uri(), Some(false));
    assert_eq!(library.tracks[2].has_uri(), None);
}

#[test]
fn merge_extends_existing_and_adds_new_playlists() {
    let mut library = library();
    library.playlists = vec![playlist_of(&library, "mixed", &["A"])];

    let incoming = vec![
        playlist_of(&library, "mixed", &["A", "B"]),
        playlist_of(&library, "fresh", &["C"]),
    ];
    library.merge_playlists(&incoming);

    assert_eq!(library.playlists.len(), 2);
    assert_eq!(library.playlists[0].tracks().len(), 2);
    assert_eq!(library.playlist("fresh").unwrap().tracks().len(), 1);
}
