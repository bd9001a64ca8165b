//! In-memory key/value store with per-entry expiry.
//!
//! One [`TtlStore`] is constructed at startup and handed to every component
//! that caches something (the origin fetcher and the playlist extractor).
//! Expired entries read as absent and are dropped lazily on access; a janitor
//! task may additionally call [`TtlStore::purge_expired`] on an interval.

use crate::document::Document;
use crate::playlist::Track;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Cache key holding the last ETag seen from the origin.
pub const ETAG_KEY: &str = "konsti-etag";

/// Cache key holding the last parsed origin document.
pub const DOCUMENT_KEY: &str = "playlist-node";

/// Cache key holding the last extracted track list.
pub const PLAYLIST_KEY: &str = "items";

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Instant;
}

/// Monotonic wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used to test expiry without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Track list as last extracted, tagged with the digest of the document it
/// was extracted from.
#[derive(Debug)]
pub struct CachedPlaylist {
    pub document_digest: String,
    pub tracks: Arc<[Track]>,
}

/// Everything the service keeps in its cache.
#[derive(Clone, Debug)]
pub enum CacheValue {
    ETag(String),
    Document(Arc<Document>),
    Playlist(Arc<CachedPlaylist>),
}

#[derive(Clone, Debug)]
struct Entry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Thread-safe TTL map. Cloning shares the underlying entries.
#[derive(Clone, Debug)]
pub struct TtlStore<V> {
    entries: Arc<DashMap<String, Entry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlStore<V> {
    /// Create a store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Create a store backed by the system clock.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Store `value` under `key`, replacing any previous entry. The entry
    /// expires `ttl` from now; a `ttl` too large to add to the clock never expires.
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = self.clock.now().checked_add(ttl);
        self.entries.insert(key.to_string(), Entry { value, expires_at });
    }

    /// Look up a live entry.
    ///
    /// Returns `None` for missing keys and for expired entries; the latter
    /// are removed on the way out.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                debug!("Cache HIT for {}", key);
                return Some(entry.value.clone());
            }
            // Expired: release the read guard before removing
            drop(entry);
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        debug!("Cache MISS for {}", key);
        None
    }

    /// Remove `key` regardless of expiry.
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TtlStore<V> {
    fn default() -> Self {
        Self::system()
    }
}

/// The store type shared by the whole service.
pub type CacheStore = TtlStore<CacheValue>;

impl CacheStore {
    /// Last origin ETag, if one is cached and non-empty.
    pub fn etag(&self) -> Option<String> {
        match self.get(ETAG_KEY) {
            Some(CacheValue::ETag(tag)) if !tag.is_empty() => Some(tag),
            _ => None,
        }
    }

    /// Last parsed origin document, if cached.
    pub fn document(&self) -> Option<Arc<Document>> {
        match self.get(DOCUMENT_KEY) {
            Some(CacheValue::Document(doc)) => Some(doc),
            _ => None,
        }
    }

    /// Last extracted playlist, if cached.
    pub fn playlist(&self) -> Option<Arc<CachedPlaylist>> {
        match self.get(PLAYLIST_KEY) {
            Some(CacheValue::Playlist(playlist)) => Some(playlist),
            _ => None,
        }
    }
}

/// Periodically drop expired entries until `shutdown` is cancelled.
pub fn spawn_purge_task<V>(
    store: TtlStore<V>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Cache purge task stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let removed = store.purge_expired();
                    if removed > 0 {
                        debug!("Purged {} expired cache entries", removed);
                    }
                }
            }
        }
    })
}
