use camino::Utf8PathBuf;

use crate::field::Field;

/// The closed set of failures the core distinguishes. Everything else is
/// ad-hoc context attached via [`color_eyre`].
#[derive(Debug, thiserror::Error)]
pub enum MusifyError {
    /// Operation received an item of a kind it does not accept.
    #[error("operation does not accept items of kind {kind}")]
    ItemKind { kind: String },

    /// A URI/URL/ID was required but the given value is malformed or missing.
    #[error("malformed or missing remote identifier: {value:?}")]
    Identity { value: String },

    /// A filtered local collection was built from heterogeneous tag values.
    #[error("collection {name:?} grouped on {field} contains a track with {field} = {found:?}")]
    Composition {
        field: Field,
        name: String,
        found: String,
    },

    /// Unknown condition name or unsupported field at rule load.
    #[error("unrecognised rule {what}: {name:?}")]
    Rule { what: &'static str, name: String },

    /// Tag read/write failure on a single file. Recovered per-item during
    /// library loads, fatal elsewhere.
    #[error("tag I/O failed for {path}: {message}")]
    TagIo { path: Utf8PathBuf, message: String },

    /// Surfaced from the remote API handle. The core never retries.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors produced by implementations of [`crate::remote::api::RemoteApi`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("remote API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("remote API response missing expected data: {0}")]
    InvalidResponse(String),

    #[error("no remote entity found for {0:?}")]
    NotFound(String),
}

pub type MusifyResult<T> = Result<T, MusifyError>;
