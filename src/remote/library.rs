//! The authorised user's remote library: their playlists and the tracks on
//! them.

use std::collections::{BTreeMap, HashSet};

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::remote::api::RemoteApi;
use crate::remote::id::{ObjectKind, Uri};
use crate::remote::playlist::{RemotePlaylist, SyncMode, SyncResult};
use crate::remote::track::RemoteTrack;
use crate::report;

pub struct RemoteLibrary<'a> {
    api: &'a dyn RemoteApi,
    pub playlists: Vec<RemotePlaylist>,
    pub tracks: Vec<RemoteTrack>,
}

impl<'a> RemoteLibrary<'a> {
    pub fn new(api: &'a dyn RemoteApi) -> Self {
        RemoteLibrary {
            api,
            playlists: Vec::new(),
            tracks: Vec::new(),
        }
    }

    /// Load the user's playlists with their full track lists. Playlists are
    /// fetched concurrently; results keep the listing order.
    pub async fn load(&mut self, use_cache: bool) -> Result<(), ApiError> {
        debug!("loading remote library: start");
        let listed = self
            .api
            .get_user_items(None, ObjectKind::Playlist, 50, use_cache)
            .await?;

        let api = self.api;
        let fetches = listed.iter().filter_map(|response| {
            let target = response["href"]
                .as_str()
                .or(response["uri"].as_str())?
                .to_string();
            Some(async move { RemotePlaylist::fetch(api, &target, use_cache).await })
        });
        self.playlists = try_join_all(fetches).await?;

        self.tracks.clear();
        let mut seen = HashSet::new();
        for playlist in &self.playlists {
            for track in &playlist.tracks {
                if seen.insert(track.uri.clone()) {
                    self.tracks.push(track.clone());
                }
            }
        }

        info!(
            "loaded remote library: {} playlists - {} unique tracks",
            self.playlists.len(),
            self.tracks.len()
        );
        let counts: Vec<(String, usize)> = self
            .playlists
            .iter()
            .map(|playlist| (playlist.name.clone(), playlist.tracks.len()))
            .collect();
        report::log_name_counts("remote playlists:", &counts);
        debug!("loading remote library: done");
        Ok(())
    }

    pub fn playlist(&self, name: &str) -> Option<&RemotePlaylist> {
        self.playlists.iter().find(|playlist| playlist.name == name)
    }

    /// Add the given tracks to the library's flat track list, skipping URIs
    /// already present.
    pub fn extend(&mut self, tracks: impl IntoIterator<Item = RemoteTrack>) {
        let mut seen: HashSet<Uri> = self.tracks.iter().map(|t| t.uri.clone()).collect();
        for track in tracks {
            if seen.insert(track.uri.clone()) {
                self.tracks.push(track);
            }
        }
    }

    /// Snapshot of every playlist as a name-to-URIs map.
    pub fn backup_playlists(&self) -> BTreeMap<String, Vec<String>> {
        self.playlists
            .iter()
            .map(|playlist| {
                let uris = playlist
                    .tracks
                    .iter()
                    .map(|track| track.uri.0.clone())
                    .collect();
                (playlist.name.clone(), uris)
            })
            .collect()
    }

    /// Recreate playlists from a backup: missing playlists are created,
    /// existing ones are refreshed to exactly the backed-up contents.
    pub async fn restore_playlists(
        &mut self,
        backup: &BTreeMap<String, Vec<String>>,
        dry_run: bool,
    ) -> Result<Vec<(String, SyncResult)>, ApiError> {
        let playlists: Vec<(String, Vec<Uri>)> = backup
            .iter()
            .map(|(name, uris)| {
                (name.clone(), uris.iter().map(|uri| Uri(uri.clone())).collect())
            })
            .collect();
        self.sync(&playlists, SyncMode::Refresh, true, dry_run).await
    }

    /// Synchronise the given name-to-items map against the remote
    /// playlists. A name with no remote counterpart is created first.
    pub async fn sync(
        &mut self,
        playlists: &[(String, Vec<Uri>)],
        mode: SyncMode,
        reload: bool,
        dry_run: bool,
    ) -> Result<Vec<(String, SyncResult)>, ApiError> {
        debug!(count = playlists.len(), %mode, dry_run, "syncing playlists: start");

        let mut results = Vec::new();
        for (name, uris) in playlists {
            let playlist = match self.playlists.iter_mut().find(|p| p.name == *name) {
                Some(existing) => existing,
                None => {
                    debug!(playlist = %name, "creating missing remote playlist");
                    let created = RemotePlaylist::create(self.api, name).await?;
                    self.playlists.push(created);
                    self.playlists.last_mut().expect("playlist was just added")
                }
            };
            let result = playlist.sync(self.api, uris, mode, reload, dry_run).await?;
            results.push((name.clone(), result));
        }

        report::log_sync_results(&results);
        debug!("syncing playlists: done");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::remote::testing::MockApi;

    fn uri(n: u32) -> Uri {
        Uri(format!("spotify:track:{n:022}"))
    }

    #[tokio::test]
    async fn loads_user_playlists_with_tracks() {
        let api = MockApi::new();
        let url = api.create_playlist("road trip", false, false).await.unwrap();
        api.add_to_playlist(&url, &[uri(1), uri(2)], false).await.unwrap();

        let mut library = RemoteLibrary::new(&api);
        library.load(false).await.unwrap();

        assert_eq!(library.playlists.len(), 1);
        assert_eq!(library.playlist("road trip").unwrap().tracks.len(), 2);
        assert_eq!(library.tracks.len(), 2);
    }

    #[tokio::test]
    async fn sync_creates_missing_playlists_first() {
        let api = MockApi::new();
        let mut library = RemoteLibrary::new(&api);
        library.load(false).await.unwrap();

        let results = library
            .sync(
                &[("brand new".to_string(), vec![uri(1)])],
                SyncMode::Sync,
                true,
                false,
            )
            .await
            .unwrap();

        assert_eq!(results[0].1.added, 1);
        assert!(api.playlist_names().contains(&"brand new".to_string()));
        let url = api.get_playlist_url("brand new").await.unwrap();
        assert_eq!(api.playlist_uris(&url), vec![uri(1)]);
    }

    #[tokio::test]
    async fn backup_restore_backup_is_stable() {
        let api = MockApi::new();
        let url = api.create_playlist("mix", false, false).await.unwrap();
        api.add_to_playlist(&url, &[uri(1), uri(2)], false).await.unwrap();

        let mut library = RemoteLibrary::new(&api);
        library.load(false).await.unwrap();
        let backup = library.backup_playlists();

        // damage the remote state, then restore
        api.clear_from_playlist(&url, None).await.unwrap();
        library.load(false).await.unwrap();
        library.restore_playlists(&backup, false).await.unwrap();

        library.load(false).await.unwrap();
        assert_eq!(library.backup_playlists(), backup);
    }

    #[tokio::test]
    async fn extend_skips_known_uris() {
        let api = MockApi::new();
        let mut library = RemoteLibrary::new(&api);

        let track = |n: u32| {
            RemoteTrack::from_response(serde_json::json!({"uri": uri(n).0, "name": "t"})).unwrap()
        };
        library.extend([track(1), track(2)]);
        library.extend([track(2), track(3)]);
        assert_eq!(library.tracks.len(), 3);
    }
}
