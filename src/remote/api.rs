//! The interface the core consumes for all remote-service I/O.
//!
//! Implementations own HTTP, auth and caching; the core passes an opaque
//! `use_cache` hint through and never retries. Playlist arguments accept a
//! URL, URI, ID or (where documented) a playlist name.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::remote::id::{ObjectKind, Uri};

#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Free-text search returning up to ``limit`` raw responses of ``kind``.
    async fn query(
        &self,
        query: &str,
        kind: ObjectKind,
        limit: usize,
        use_cache: bool,
    ) -> Result<Vec<Value>, ApiError>;

    /// Fetch full responses for the given URIs/URLs/IDs. With ``extend``,
    /// collection responses include all pages of their items, appended in
    /// ascending offset.
    async fn get_items(
        &self,
        values: &[String],
        kind: ObjectKind,
        limit: usize,
        extend: bool,
        use_cache: bool,
    ) -> Result<Vec<Value>, ApiError>;

    /// Fetch the current (or named) user's saved items of ``kind``.
    async fn get_user_items(
        &self,
        user: Option<&str>,
        kind: ObjectKind,
        limit: usize,
        use_cache: bool,
    ) -> Result<Vec<Value>, ApiError>;

    /// Optional enrichment: track responses, with audio features when
    /// ``features`` is set.
    async fn get_tracks(
        &self,
        values: &[String],
        features: bool,
        limit: usize,
        use_cache: bool,
    ) -> Result<Vec<Value>, ApiError>;

    /// Create a playlist for the current user; returns its API URL.
    async fn create_playlist(
        &self,
        name: &str,
        public: bool,
        collaborative: bool,
    ) -> Result<String, ApiError>;

    /// Returns the number of items actually added.
    async fn add_to_playlist(
        &self,
        playlist: &str,
        items: &[Uri],
        skip_dupes: bool,
    ) -> Result<usize, ApiError>;

    /// Remove the given items, or everything when ``items`` is `None`.
    /// Returns the number of items removed.
    async fn clear_from_playlist(
        &self,
        playlist: &str,
        items: Option<&[Uri]>,
    ) -> Result<usize, ApiError>;

    /// Unfollow/delete a playlist; returns its API URL.
    async fn delete_playlist(&self, playlist: &str) -> Result<String, ApiError>;

    /// Resolve a playlist URL/URI/ID or name to its API URL.
    async fn get_playlist_url(&self, playlist: &str) -> Result<String, ApiError>;

    /// The display name of the authorised user, for log lines.
    fn user_name(&self) -> &str {
        "unknown user"
    }
}
