//! The item-identity model shared by local and remote variants.
//!
//! Identity is the URI when present, the display name otherwise. Local items
//! additionally carry the tri-state URI tag described on [`UriState`].

use crate::remote::id::{self, ObjectKind, UNAVAILABLE_URI, Uri};

/// Separator used when a list of tags is represented as one string
/// (e.g. multiple artists on a single track).
pub const TAG_SEP: &str = "; ";

/// The state of a local item's stored URI tag.
///
/// * `Missing` — tag absent, the item has never been matched.
/// * `Unavailable` — tag holds the reserved sentinel: the item is known to
///   not exist on the remote service.
/// * `Valid` — tag parses as a URI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UriState {
    #[default]
    Missing,
    Unavailable,
    Valid(Uri),
}

impl UriState {
    /// Rebuild the state from a raw tag value.
    pub fn from_tag(value: &str) -> Self {
        let value = value.trim();
        if value == UNAVAILABLE_URI {
            UriState::Unavailable
        } else if id::validate_id_type(value, Some(ObjectKind::Track)) {
            match id::to_uri(value, ObjectKind::Track) {
                Ok(uri) => UriState::Valid(uri),
                Err(_) => UriState::Missing,
            }
        } else {
            UriState::Missing
        }
    }

    /// The tag value to persist, `None` when the tag should be absent.
    pub fn to_tag(&self) -> Option<&str> {
        match self {
            UriState::Missing => None,
            UriState::Unavailable => Some(UNAVAILABLE_URI),
            UriState::Valid(uri) => Some(uri.as_str()),
        }
    }

    /// The tri-state `has_uri` flag: `None` = never matched, `Some(false)` =
    /// known unavailable, `Some(true)` = valid URI present.
    pub fn has_uri(&self) -> Option<bool> {
        match self {
            UriState::Missing => None,
            UriState::Unavailable => Some(false),
            UriState::Valid(_) => Some(true),
        }
    }

    pub fn uri(&self) -> Option<&Uri> {
        match self {
            UriState::Valid(uri) => Some(uri),
            _ => None,
        }
    }
}

/// The tags the matcher reads. Implemented by tracks and by track
/// collections (albums, playlists); collections report `title = None` and
/// their summed/most-common values for the rest.
pub trait Matchable {
    /// Display name: a track's title, a collection's name.
    fn name(&self) -> &str;
    fn title(&self) -> Option<&str>;
    fn artist(&self) -> Option<&str>;
    fn album(&self) -> Option<&str>;
    /// Duration in seconds.
    fn length(&self) -> Option<f64>;
    fn year(&self) -> Option<i32>;
    fn uri(&self) -> Option<&Uri>;
}

/// A [`Matchable`] that also exposes its member items, letting the matcher
/// add the per-item score when comparing collection to collection.
pub trait MatchableCollection: Matchable {
    type Item: Matchable;

    fn items(&self) -> &[Self::Item];
}
