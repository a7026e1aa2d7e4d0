//! Musify: a music-library synchronization toolkit.
//!
//! Reads locally stored music files, reconciles them with a remote
//! streaming-service library, and runs bidirectional operations between the
//! two: matching local items to remote candidates by fuzzy scoring
//! ([`matcher`]), driving the remote query endpoint ([`searcher`]),
//! interactive correction of ambiguous matches ([`checker`]), and playlist
//! synchronization ([`remote::playlist`]). Local-side rules (comparers,
//! limiters, sorters) build auto-playlists over the scanned library
//! ([`processor`], [`local`]).

pub mod checker;
pub mod clean;
pub mod error;
pub mod field;
pub mod item;
pub mod local;
pub mod matcher;
pub mod processor;
pub mod progress;
pub mod remote;
pub mod report;
pub mod scan;
pub mod searcher;
pub mod util;
