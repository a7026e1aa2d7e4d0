//! Remote playlists and the three-mode sync engine.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use jiff::Timestamp;
use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::error::{ApiError, MusifyError};
use crate::remote::api::RemoteApi;
use crate::remote::id::{IdType, ObjectKind, Uri, convert};
use crate::remote::track::RemoteTrack;

/// How a sync reconciles the source items with the remote playlist.
///
/// * `New` — only add items missing from the remote playlist.
/// * `Refresh` — clear the remote playlist, then add everything.
/// * `Sync` — clear remote items not in the source, add missing ones.
#[derive(Debug, Display, EnumString, EnumIter, Clone, Copy, PartialEq, Eq, Default)]
#[strum(serialize_all = "lowercase")]
pub enum SyncMode {
    #[default]
    New,
    Refresh,
    Sync,
}

impl SyncMode {
    pub fn from_name(name: &str) -> Result<Self, MusifyError> {
        SyncMode::from_str(&name.to_lowercase()).map_err(|_| MusifyError::Rule {
            what: "sync mode",
            name: name.to_string(),
        })
    }
}

/// The outcome of one playlist sync. Counts are exact in dry runs too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    /// Tracks on the remote playlist before the sync.
    pub start: usize,
    pub added: usize,
    pub removed: usize,
    /// Tracks present both before and after.
    pub unchanged: usize,
    /// `final_count - start`.
    pub difference: i64,
    /// Tracks on the remote playlist after the sync.
    pub final_count: usize,
}

/// A user playlist on the remote service.
#[derive(Debug, Clone)]
pub struct RemotePlaylist {
    pub response: Value,
    pub uri: Uri,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_name: Option<String>,
    pub followers: Option<u64>,
    pub image_links: Vec<String>,
    pub tracks: Vec<RemoteTrack>,
    /// When each item was added, keyed by URI.
    pub date_added: HashMap<Uri, Timestamp>,
}

impl RemotePlaylist {
    pub fn from_response(response: Value) -> Result<Self, ApiError> {
        let uri = response["uri"]
            .as_str()
            .map(|uri| Uri(uri.to_string()))
            .ok_or_else(|| ApiError::InvalidResponse("playlist response has no uri".to_string()))?;
        let url = match response["href"].as_str() {
            Some(href) => href.to_string(),
            None => convert(&uri.0, Some(ObjectKind::Playlist), IdType::Url)
                .map_err(|_| ApiError::InvalidResponse(format!("unconvertible uri: {uri}")))?,
        };

        let name = response["name"].as_str().unwrap_or_default().to_string();
        let description = response["description"].as_str().map(str::to_string);
        let owner_name = response["owner"]["display_name"].as_str().map(str::to_string);
        let followers = response["followers"]["total"].as_u64();
        let image_links = response["images"]
            .as_array()
            .map(|images| {
                images
                    .iter()
                    .filter_map(|image| image["url"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut tracks = Vec::new();
        let mut date_added = HashMap::new();
        if let Some(items) = response["tracks"]["items"].as_array() {
            for item in items {
                // playlist items wrap the track with its added-at stamp
                let track = RemoteTrack::from_response(item["track"].clone())?;
                if let Some(added_at) = item["added_at"].as_str()
                    && let Ok(stamp) = added_at.parse::<Timestamp>()
                {
                    date_added.insert(track.uri.clone(), stamp);
                }
                tracks.push(track);
            }
        }

        Ok(RemotePlaylist {
            response,
            uri,
            url,
            name,
            description,
            owner_name,
            followers,
            image_links,
            tracks,
            date_added,
        })
    }

    /// Create an empty playlist for the current user and return its object.
    pub async fn create(api: &dyn RemoteApi, name: &str) -> Result<Self, ApiError> {
        let url = api.create_playlist(name, false, false).await?;
        Self::fetch(api, &url, false).await
    }

    /// Fetch a playlist by URL/URI/ID, with all pages of its tracks.
    pub async fn fetch(
        api: &dyn RemoteApi,
        playlist: &str,
        use_cache: bool,
    ) -> Result<Self, ApiError> {
        let responses = api
            .get_items(&[playlist.to_string()], ObjectKind::Playlist, 1, true, use_cache)
            .await?;
        let response = responses
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(playlist.to_string()))?;
        Self::from_response(response)
    }

    pub async fn reload(&mut self, api: &dyn RemoteApi, use_cache: bool) -> Result<(), ApiError> {
        *self = Self::fetch(api, &self.url.clone(), use_cache).await?;
        Ok(())
    }

    /// Unfollow/delete this playlist on the remote service.
    pub async fn delete(self, api: &dyn RemoteApi) -> Result<(), ApiError> {
        api.delete_playlist(&self.url).await?;
        Ok(())
    }

    pub fn track_uris(&self) -> Vec<Uri> {
        self.tracks.iter().map(|track| track.uri.clone()).collect()
    }

    /// Total duration of the playlist, when every track reports one.
    pub fn length(&self) -> Option<f64> {
        let lengths: Vec<f64> = self.tracks.iter().filter_map(|t| t.length).collect();
        (lengths.len() == self.tracks.len() && !lengths.is_empty()).then(|| lengths.iter().sum())
    }

    /// Synchronise the remote playlist with ``items``.
    ///
    /// Additions keep the order of their first appearance in ``items``.
    /// With ``dry_run`` nothing is written and the counts are computed
    /// locally; otherwise they reflect what the API reported.
    pub async fn sync(
        &mut self,
        api: &dyn RemoteApi,
        items: &[Uri],
        mode: SyncMode,
        reload: bool,
        dry_run: bool,
    ) -> Result<SyncResult, ApiError> {
        let uris_obj = dedup_preserving_order(items);
        let uris_remote = self.track_uris();
        let remote_set: HashSet<&Uri> = uris_remote.iter().collect();
        let obj_set: HashSet<&Uri> = uris_obj.iter().collect();
        let start = uris_remote.len();

        debug!(playlist = %self.name, %mode, source = uris_obj.len(), remote = start, "syncing");

        let (to_add, to_remove, unchanged): (Vec<Uri>, Option<Vec<Uri>>, usize) = match mode {
            SyncMode::New => {
                let add = uris_obj
                    .iter()
                    .filter(|uri| !remote_set.contains(uri))
                    .cloned()
                    .collect();
                (add, None, start)
            }
            SyncMode::Refresh => (uris_obj.clone(), Some(Vec::new()), 0),
            SyncMode::Sync => {
                let add = uris_obj
                    .iter()
                    .filter(|uri| !remote_set.contains(uri))
                    .cloned()
                    .collect();
                let remove: Vec<Uri> = uris_remote
                    .iter()
                    .filter(|uri| !obj_set.contains(uri))
                    .cloned()
                    .collect();
                let unchanged = uris_remote.len() - remove.len();
                (add, Some(remove), unchanged)
            }
        };

        let removed = match (&to_remove, dry_run) {
            (None, _) => 0,
            (Some(remove), true) => {
                if mode == SyncMode::Refresh {
                    start
                } else {
                    remove.len()
                }
            }
            (Some(remove), false) => {
                if mode == SyncMode::Refresh {
                    api.clear_from_playlist(&self.url, None).await?
                } else {
                    api.clear_from_playlist(&self.url, Some(remove.as_slice())).await?
                }
            }
        };

        let added = if dry_run {
            to_add.len()
        } else {
            api.add_to_playlist(&self.url, &to_add, mode != SyncMode::Refresh)
                .await?
        };

        let final_count = if !dry_run && reload {
            self.reload(api, false).await?;
            self.tracks.len()
        } else {
            start - removed + added
        };

        Ok(SyncResult {
            start,
            added,
            removed,
            unchanged,
            difference: final_count as i64 - start as i64,
            final_count,
        })
    }
}

fn dedup_preserving_order(items: &[Uri]) -> Vec<Uri> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|uri| seen.insert((*uri).clone()))
        .cloned()
        .collect()
}
