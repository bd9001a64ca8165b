use super::track::{Track, UNKNOWN_DURATION};
use crate::{
    cache::{CacheStore, CacheValue, CachedPlaylist, PLAYLIST_KEY},
    document::Document,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Where the playlist lives in the origin page: `//body/blockquote/ol/li`.
pub const PLAYLIST_PATH: &[&str] = &["body", "blockquote", "ol", "li"];

/// Build one [`Track`] per playlist list item, in document order.
///
/// Positions are assigned here (1..=N); any numbering in the source is ignored.
pub fn extract_tracks(doc: &Document) -> Vec<Track> {
    doc.select_path(PLAYLIST_PATH)
        .into_iter()
        .enumerate()
        .map(|(index, item)| Track::from_line(index + 1, &doc.inner_text(item)))
        .collect()
}

/// Extracts tracks and records them in the playlist cache.
#[derive(Clone, Debug)]
pub struct PlaylistExtractor {
    store: CacheStore,
    ttl: Duration,
}

impl PlaylistExtractor {
    pub fn new(store: CacheStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Extract all tracks from `doc` and cache the list, tagged with the
    /// document's digest.
    pub fn extract(&self, doc: &Document) -> Arc<[Track]> {
        let tracks: Arc<[Track]> = extract_tracks(doc).into();
        let fallbacks = tracks
            .iter()
            .filter(|t| t.duration == UNKNOWN_DURATION)
            .count();
        if fallbacks > 0 {
            debug!("{} playlist lines did not match the track pattern", fallbacks);
        }
        info!("Extracted {} tracks", tracks.len());

        self.store.set(
            PLAYLIST_KEY,
            CacheValue::Playlist(Arc::new(CachedPlaylist {
                document_digest: doc.digest().to_string(),
                tracks: tracks.clone(),
            })),
            self.ttl,
        );
        tracks
    }
}
