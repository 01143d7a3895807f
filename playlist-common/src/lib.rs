//! # Playlist Common Library
//!
//! Shared code for the playlist service:
//! - Common error type
//! - Data folder resolution
//! - Database bootstrap and the `Track` model

pub mod config;
pub mod db;
pub mod error;

pub use db::Track;
pub use error::{Error, Result};
