//! Playlist scraper service.
//!
//! Fetches a radio playlist page with ETag revalidation, extracts the track
//! list, and serves it as JSON with its own conditional-response handling.

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod metrics;
pub mod origin;
pub mod playlist;
pub mod server;
