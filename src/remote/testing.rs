//! In-memory [`RemoteApi`] used by searcher/checker/sync tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::remote::api::RemoteApi;
use crate::remote::id::{ObjectKind, Uri};

#[derive(Debug, Default)]
pub struct MockPlaylist {
    pub name: String,
    pub uris: Vec<Uri>,
}

#[derive(Debug, Default)]
struct MockState {
    /// url -> playlist
    playlists: HashMap<String, MockPlaylist>,
    /// query string -> canned responses
    queries: HashMap<String, Vec<Value>>,
    /// uri -> full response, used to flesh out playlist items
    items: HashMap<String, Value>,
    next_id: usize,
}

#[derive(Debug, Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        MockApi::default()
    }

    /// Register a canned response list for a search query.
    pub fn stub_query(&self, query: &str, responses: Vec<Value>) {
        self.state
            .lock()
            .unwrap()
            .queries
            .insert(query.to_string(), responses);
    }

    /// Register full metadata for an item so playlist fetches can embed it.
    pub fn register_item(&self, response: Value) {
        let uri = response["uri"].as_str().expect("stub item needs a uri").to_string();
        self.state.lock().unwrap().items.insert(uri, response);
    }

    /// Mutate a playlist behind the API's back, as a user editing it would.
    pub fn edit_playlist(&self, url: &str, edit: impl FnOnce(&mut MockPlaylist)) {
        let mut state = self.state.lock().unwrap();
        let playlist = state.playlists.get_mut(url).expect("no such playlist");
        edit(playlist);
    }

    pub fn playlist_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.playlists.values().map(|p| p.name.clone()).collect()
    }

    pub fn playlist_uris(&self, url: &str) -> Vec<Uri> {
        let state = self.state.lock().unwrap();
        state.playlists[url].uris.clone()
    }

    pub fn playlist_count(&self) -> usize {
        self.state.lock().unwrap().playlists.len()
    }

    fn playlist_response(state: &MockState, url: &str) -> Option<Value> {
        let playlist = state.playlists.get(url)?;
        let id = url.rsplit('/').next().unwrap_or_default();
        let items: Vec<Value> = playlist
            .uris
            .iter()
            .map(|uri| {
                let track = state
                    .items
                    .get(&uri.0)
                    .cloned()
                    .unwrap_or_else(|| json!({"uri": uri.0.clone(), "name": uri.0.clone()}));
                json!({"added_at": "2023-01-01T00:00:00Z", "track": track})
            })
            .collect();
        Some(json!({
            "uri": format!("spotify:playlist:{id}"),
            "href": url,
            "name": playlist.name,
            "description": "",
            "owner": {"display_name": "tester"},
            "followers": {"total": 0},
            "images": [],
            "tracks": {"items": items, "total": items.len()},
        }))
    }

    fn resolve_url(state: &MockState, playlist: &str) -> Result<String, ApiError> {
        if state.playlists.contains_key(playlist) {
            return Ok(playlist.to_string());
        }
        state
            .playlists
            .iter()
            .find(|(_, p)| p.name == playlist)
            .map(|(url, _)| url.clone())
            .ok_or_else(|| ApiError::NotFound(playlist.to_string()))
    }
}

#[async_trait]
impl RemoteApi for MockApi {
    async fn query(
        &self,
        query: &str,
        _kind: ObjectKind,
        limit: usize,
        _use_cache: bool,
    ) -> Result<Vec<Value>, ApiError> {
        let state = self.state.lock().unwrap();
        let mut results = state.queries.get(query).cloned().unwrap_or_default();
        results.truncate(limit);
        Ok(results)
    }

    async fn get_items(
        &self,
        values: &[String],
        kind: ObjectKind,
        _limit: usize,
        _extend: bool,
        _use_cache: bool,
    ) -> Result<Vec<Value>, ApiError> {
        let state = self.state.lock().unwrap();
        values
            .iter()
            .map(|value| match kind {
                ObjectKind::Playlist => {
                    let url = Self::resolve_url(&state, value)?;
                    Self::playlist_response(&state, &url)
                        .ok_or_else(|| ApiError::NotFound(value.clone()))
                }
                _ => state
                    .items
                    .get(value)
                    .cloned()
                    .ok_or_else(|| ApiError::NotFound(value.clone())),
            })
            .collect()
    }

    async fn get_user_items(
        &self,
        _user: Option<&str>,
        kind: ObjectKind,
        _limit: usize,
        _use_cache: bool,
    ) -> Result<Vec<Value>, ApiError> {
        if kind != ObjectKind::Playlist {
            return Ok(Vec::new());
        }
        let state = self.state.lock().unwrap();
        let mut urls: Vec<&String> = state.playlists.keys().collect();
        urls.sort();
        Ok(urls
            .into_iter()
            .filter_map(|url| Self::playlist_response(&state, url))
            .collect())
    }

    async fn get_tracks(
        &self,
        values: &[String],
        _features: bool,
        _limit: usize,
        _use_cache: bool,
    ) -> Result<Vec<Value>, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(values
            .iter()
            .filter_map(|value| state.items.get(value).cloned())
            .collect())
    }

    async fn create_playlist(
        &self,
        name: &str,
        _public: bool,
        _collaborative: bool,
    ) -> Result<String, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let url = format!(
            "https://api.spotify.com/v1/playlists/{:022}",
            state.next_id
        );
        state.playlists.insert(
            url.clone(),
            MockPlaylist {
                name: name.to_string(),
                uris: Vec::new(),
            },
        );
        Ok(url)
    }

    async fn add_to_playlist(
        &self,
        playlist: &str,
        items: &[Uri],
        skip_dupes: bool,
    ) -> Result<usize, ApiError> {
        let mut state = self.state.lock().unwrap();
        let url = Self::resolve_url(&state, playlist)?;
        let playlist = state.playlists.get_mut(&url).expect("resolved url exists");

        let mut added = 0;
        for uri in items {
            if skip_dupes && playlist.uris.contains(uri) {
                continue;
            }
            playlist.uris.push(uri.clone());
            added += 1;
        }
        Ok(added)
    }

    async fn clear_from_playlist(
        &self,
        playlist: &str,
        items: Option<&[Uri]>,
    ) -> Result<usize, ApiError> {
        let mut state = self.state.lock().unwrap();
        let url = Self::resolve_url(&state, playlist)?;
        let playlist = state.playlists.get_mut(&url).expect("resolved url exists");

        let before = playlist.uris.len();
        match items {
            None => playlist.uris.clear(),
            Some(items) => playlist.uris.retain(|uri| !items.contains(uri)),
        }
        Ok(before - playlist.uris.len())
    }

    async fn delete_playlist(&self, playlist: &str) -> Result<String, ApiError> {
        let mut state = self.state.lock().unwrap();
        let url = Self::resolve_url(&state, playlist)?;
        state.playlists.remove(&url);
        Ok(url)
    }

    async fn get_playlist_url(&self, playlist: &str) -> Result<String, ApiError> {
        let state = self.state.lock().unwrap();
        Self::resolve_url(&state, playlist)
    }

    fn user_name(&self) -> &str {
        "tester"
    }
}
