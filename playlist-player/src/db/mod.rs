//! Database access layer
//!
//! Playlist storage queries and transactional list mutations.

pub mod playlist;

pub use playlist::{in_play_order, OrderedPlaylist};
