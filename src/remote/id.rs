//! Recognises the three shapes a remote identifier arrives in: full URI,
//! web/API URL, or bare ID. User input in the checker and stored URI tags
//! both go through here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::MusifyError;

/// A validated remote catalogue identifier, e.g. `spotify:track:6rqhFgbbKwnb9MLmUQDhG6`.
///
/// Two items are the same remote entity iff their URIs are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Uri(pub String);

impl Uri {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The reserved URI meaning "checked, known not to exist on the remote".
pub const UNAVAILABLE_URI: &str = "spotify:unavailable";

#[derive(Debug, Display, EnumString, EnumIter, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum ObjectKind {
    Track,
    Album,
    Playlist,
    Artist,
    User,
}

impl ObjectKind {
    /// Path segment used by the web API, e.g. `tracks` in `/v1/tracks/{id}`.
    pub fn api_path(self) -> &'static str {
        match self {
            ObjectKind::Track => "tracks",
            ObjectKind::Album => "albums",
            ObjectKind::Playlist => "playlists",
            ObjectKind::Artist => "artists",
            ObjectKind::User => "users",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    Uri,
    Url,
    Id,
}

/// A successfully parsed identifier. Bare IDs carry no kind of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteId {
    pub kind: Option<ObjectKind>,
    pub id: String,
    pub id_type: IdType,
}

peg::parser! {
grammar remote_id() for str {
    pub rule any_id() -> RemoteId
        = uri() / url() / bare_id()

    rule kind() -> ObjectKind
        = k:$("track" / "album" / "playlist" / "artist" / "user")
          {? ObjectKind::from_str(k).or(Err("object kind")) }

    rule kind_plural() -> ObjectKind
        = k:kind() "s" { k }

    rule id_chars() -> &'input str
        = id:$(['a'..='z' | 'A'..='Z' | '0'..='9']*<22>) { id }

    rule query_string()
        = ("?" [_]*)?

    rule uri() -> RemoteId
        = "spotify:" k:kind() ":" id:id_chars() ![_]
          { RemoteId { kind: Some(k), id: id.to_string(), id_type: IdType::Uri } }

    rule open_url() -> RemoteId
        = ("https://" / "http://") "open.spotify.com/" k:kind() "/" id:id_chars() query_string()
          { RemoteId { kind: Some(k), id: id.to_string(), id_type: IdType::Url } }

    rule api_url() -> RemoteId
        = ("https://" / "http://") "api.spotify.com/v1/" k:kind_plural() "/" id:id_chars() ("/" [_]*)? query_string()
          { RemoteId { kind: Some(k), id: id.to_string(), id_type: IdType::Url } }

    rule url() -> RemoteId
        = open_url() / api_url()

    rule bare_id() -> RemoteId
        = id:id_chars() ![_]
          { RemoteId { kind: None, id: id.to_string(), id_type: IdType::Id } }
}
}

/// Parse any accepted identifier shape, `None` if the value is not one.
pub fn parse(value: &str) -> Option<RemoteId> {
    remote_id::any_id(value.trim()).ok()
}

/// True when ``value`` is a URI/URL/ID, and (if it names a kind) of the
/// expected kind.
pub fn validate_id_type(value: &str, expected: Option<ObjectKind>) -> bool {
    match parse(value) {
        Some(id) => match (id.kind, expected) {
            (Some(found), Some(want)) => found == want,
            _ => true,
        },
        None => false,
    }
}

/// Convert any identifier shape into the requested output shape.
///
/// ``kind`` supplies the object kind for bare IDs; identifiers that name
/// their own kind win over it.
pub fn convert(
    value: &str,
    kind: Option<ObjectKind>,
    type_out: IdType,
) -> Result<String, MusifyError> {
    let identity_err = || MusifyError::Identity {
        value: value.to_string(),
    };
    let parsed = parse(value).ok_or_else(identity_err)?;
    let kind = parsed.kind.or(kind).ok_or_else(identity_err)?;

    Ok(match type_out {
        IdType::Uri => format!("spotify:{kind}:{}", parsed.id),
        IdType::Url => format!("https://api.spotify.com/v1/{}/{}", kind.api_path(), parsed.id),
        IdType::Id => parsed.id,
    })
}

/// Convert to a [`Uri`], requiring the identifier to be of the given kind.
pub fn to_uri(value: &str, kind: ObjectKind) -> Result<Uri, MusifyError> {
    if let Some(parsed) = parse(value)
        && let Some(found) = parsed.kind
        && found != kind
    {
        return Err(MusifyError::ItemKind {
            kind: found.to_string(),
        });
    }
    convert(value, Some(kind), IdType::Uri).map(Uri)
}
