//! Rule processors applied to local track lists: the comparer predicate,
//! the limiter, the sorter, and the include/exclude path filter that
//! together drive auto-playlists.

pub mod compare;
pub mod filter;
pub mod limit;
pub mod sort;
