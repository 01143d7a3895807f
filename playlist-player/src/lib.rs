//! # Playlist Player Library (playlist-player)
//!
//! Single-playlist playback coordinator.
//!
//! **Purpose:** Keep an ordered playlist in SQLite, simulate playback of one
//! track at a time on a timer, advance automatically when a track finishes,
//! and expose the operations over a small HTTP control interface.
//!
//! **Architecture:** `db::OrderedPlaylist` (transactional linked list) →
//! `playback::PlaybackCoordinator` (session lock, workers, auto-advance) →
//! `api` (axum router)

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod playback;

pub use db::OrderedPlaylist;
pub use error::{Error, Result};
pub use playback::{PlaybackCoordinator, PlaybackEvent, PlaybackStatus, PlaybackTiming};
