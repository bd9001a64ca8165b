//! Playlist extraction pipeline.
//!
//! [`PlaylistService::load`] ties the pieces together: fetch (or revalidate)
//! the origin page, then either reuse the cached track list for an unchanged
//! document or extract a fresh one.

pub mod extract;
pub mod track;

pub use extract::{PLAYLIST_PATH, PlaylistExtractor, extract_tracks};
pub use track::{Track, TrackLine, UNKNOWN_DURATION, UNKNOWN_TEXT, parse_line, track_hash};

use crate::{
    cache::CacheStore,
    error::Result,
    metrics,
    origin::{FetchOutcome, OriginFetcher},
};
use std::sync::Arc;
use tracing::debug;

/// Loads the current playlist for one origin URL.
#[derive(Clone, Debug)]
pub struct PlaylistService {
    url: String,
    fetcher: OriginFetcher,
    extractor: PlaylistExtractor,
    store: CacheStore,
}

impl PlaylistService {
    pub fn new(
        url: impl Into<String>,
        fetcher: OriginFetcher,
        extractor: PlaylistExtractor,
        store: CacheStore,
    ) -> Self {
        Self {
            url: url.into(),
            fetcher,
            extractor,
            store,
        }
    }

    /// Current track list.
    ///
    /// # Errors
    /// Any fetch, decode or parse failure from [`OriginFetcher::fetch_document`].
    /// No partial list is ever returned.
    pub async fn load(&self) -> Result<Arc<[Track]>> {
        let outcome = self.fetcher.fetch_document(&self.url, true).await?;

        if let FetchOutcome::Unchanged(doc) = &outcome {
            let cached = self
                .store
                .playlist()
                .filter(|playlist| playlist.document_digest == doc.digest());
            metrics::record_playlist_cache(cached.is_some());
            if let Some(playlist) = cached {
                debug!("Reusing {} cached tracks", playlist.tracks.len());
                return Ok(playlist.tracks.clone());
            }
        }

        Ok(self.extractor.extract(outcome.document()))
    }
}
