//! LRU image cache with in-flight load deduplication.
//!
//! The cache maps keys to completers. A key is either *pending* (its load is
//! in flight) or *cached* (its image arrived and its size is known), never
//! both: both states live as variants of one slot in a single LRU table.
//!
//! # Eviction
//!
//! Two limits apply to cached entries: an entry count and a total byte size.
//! After every admission, and whenever a limit is tightened, the
//! least-recently-used cached entries are evicted until both limits hold.
//! Pending entries are never evicted and do not count toward the limits.
//!
//! # Oversized Images
//!
//! An image larger than the byte limit widens the limit to its size plus
//! [`OVERSIZE_MARGIN`] instead of being rejected, so at least one large image
//! stays available.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::CacheConfig;
use crate::stream::{ImageStreamCompleter, ImageStreamListener};

use super::key::ImageKey;

/// Default maximum number of cached images.
pub const DEFAULT_MAXIMUM_SIZE: usize = 1000;

/// Default maximum total size of cached images: 100 MiB.
pub const DEFAULT_MAXIMUM_SIZE_BYTES: usize = 100 << 20;

/// Bytes added on top of an oversized image when the byte limit is widened.
pub const OVERSIZE_MARGIN: usize = 1000;

// =============================================================================
// Cache State
// =============================================================================

enum Slot {
    /// Load in flight; later callers join this completer
    Pending(ImageStreamCompleter),

    /// Load finished; counted toward both limits
    Cached {
        completer: ImageStreamCompleter,
        size_bytes: usize,
    },
}

impl Slot {
    fn completer(&self) -> &ImageStreamCompleter {
        match self {
            Slot::Pending(completer) => completer,
            Slot::Cached { completer, .. } => completer,
        }
    }

    fn is_cached(&self) -> bool {
        matches!(self, Slot::Cached { .. })
    }

    fn is_pending_for(&self, completer_id: usize) -> bool {
        matches!(self, Slot::Pending(c) if c.identity() == completer_id)
    }
}

struct CacheState<K> {
    /// Pending and cached slots, most-recently-used first
    entries: LruCache<K, Slot>,

    cached_count: usize,
    current_size_bytes: usize,
    maximum_size: usize,
    maximum_size_bytes: usize,

    hits: u64,
    misses: u64,
}

impl<K: Hash + Eq + Clone + fmt::Debug> CacheState<K> {
    /// Promote a pending slot to a cached entry at the MRU position.
    fn admit(&mut self, key: K, completer_id: usize, size_bytes: usize) {
        let completer = match self.entries.peek(&key) {
            Some(slot) if slot.is_pending_for(completer_id) => slot.completer().clone(),
            _ => {
                debug!(key = ?key, "Completed load is no longer pending, not caching");
                return;
            }
        };

        if self.maximum_size_bytes > 0 && size_bytes > self.maximum_size_bytes {
            let widened = size_bytes + OVERSIZE_MARGIN;
            warn!(
                key = ?key,
                size_bytes,
                limit = self.maximum_size_bytes,
                widened,
                "Image exceeds byte limit, widening limit"
            );
            self.maximum_size_bytes = widened;
        }

        self.entries.put(
            key.clone(),
            Slot::Cached {
                completer,
                size_bytes,
            },
        );
        self.cached_count += 1;
        self.current_size_bytes += size_bytes;

        debug!(
            key = ?key,
            size_bytes,
            entries = self.cached_count,
            total_bytes = self.current_size_bytes,
            "Cached image"
        );

        self.check_cache_size();
    }

    /// Drop a pending slot whose load failed so the next request retries.
    fn abandon(&mut self, key: &K, completer_id: usize) {
        let pending = self
            .entries
            .peek(key)
            .is_some_and(|slot| slot.is_pending_for(completer_id));

        if pending {
            self.entries.pop(key);
            debug!(key = ?key, "Load failed, pending entry removed");
        }
    }

    fn evict(&mut self, key: &K) -> bool {
        if !self.entries.peek(key).is_some_and(Slot::is_cached) {
            return false;
        }

        if let Some(Slot::Cached { size_bytes, .. }) = self.entries.pop(key) {
            self.cached_count -= 1;
            self.current_size_bytes -= size_bytes;
            debug!(key = ?key, size_bytes, "Evicted image");
        }
        true
    }

    fn check_cache_size(&mut self) {
        while self.current_size_bytes > self.maximum_size_bytes
            || self.cached_count > self.maximum_size
        {
            let victim = self
                .entries
                .iter()
                .rev()
                .find(|(_, slot)| slot.is_cached())
                .map(|(key, _)| key.clone());

            match victim {
                Some(key) => {
                    self.evict(&key);
                }
                None => break,
            }
        }

        debug_assert!(self.cached_count <= self.maximum_size);
        debug_assert!(self.current_size_bytes <= self.maximum_size_bytes);
    }

    fn clear(&mut self) {
        let cached: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.is_cached())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &cached {
            self.entries.pop(key);
        }

        self.cached_count = 0;
        self.current_size_bytes = 0;
        debug!(evicted = cached.len(), "Cleared image cache");
    }
}

// =============================================================================
// Image Cache
// =============================================================================

/// Snapshot of cache occupancy and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub size_bytes: usize,
    pub pending: usize,
    pub maximum_size: usize,
    pub maximum_size_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cache: {}/{} images, {}/{} bytes, {} pending ({} hits, {} misses)",
            self.entries,
            self.maximum_size,
            self.size_bytes,
            self.maximum_size_bytes,
            self.pending,
            self.hits,
            self.misses
        )
    }
}

/// Count- and byte-bounded LRU cache of image completers.
///
/// Concurrent requests for one key share a single load: while a key is
/// pending, [`put_if_absent`](Self::put_if_absent) hands every caller the
/// same completer without invoking the loader again.
///
/// # Thread Safety
///
/// All state sits behind one mutex; the cache can be shared via `Arc`.
///
/// # Example
///
/// ```
/// use image_pipeline::cache::ImageCache;
/// use image_pipeline::stream::{DecodedImage, ImageInfo, ImageStreamCompleter};
///
/// let cache: ImageCache<&str> = ImageCache::with_limits(2, 1_000_000);
///
/// let completer = cache.put_if_absent("a", ImageStreamCompleter::new);
/// let joined = cache.put_if_absent("a", || unreachable!("load already in flight"));
/// assert!(completer.ptr_eq(&joined));
///
/// let image = DecodedImage::new(5, 5, vec![0u8; 100]).unwrap();
/// completer.set_image(ImageInfo::new(image, 1.0));
///
/// assert_eq!(cache.current_size(), 1);
/// assert_eq!(cache.current_size_bytes(), 100);
/// ```
pub struct ImageCache<K = ImageKey> {
    state: Arc<Mutex<CacheState<K>>>,
}

impl<K> ImageCache<K>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + 'static,
{
    /// Create a cache with the default limits (1000 images, 100 MiB).
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAXIMUM_SIZE, DEFAULT_MAXIMUM_SIZE_BYTES)
    }

    /// Create a cache with explicit limits.
    ///
    /// # Arguments
    ///
    /// * `maximum_size` - Maximum number of cached images
    /// * `maximum_size_bytes` - Maximum total size of cached images in bytes
    pub fn with_limits(maximum_size: usize, maximum_size_bytes: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                cached_count: 0,
                current_size_bytes: 0,
                maximum_size,
                maximum_size_bytes,
                hits: 0,
                misses: 0,
            })),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_limits(config.maximum_size, config.maximum_size_bytes)
    }

    /// Return the completer for `key`, starting a load only if none exists.
    ///
    /// - Pending key: the in-flight completer is returned.
    /// - Cached key: the entry moves to the MRU position and its completer is
    ///   returned.
    /// - Otherwise `loader` is invoked, its completer is tracked as pending,
    ///   and it is promoted to a cached entry once it delivers an image. A
    ///   failed load removes the pending entry.
    ///
    /// If either limit is 0 the loader's completer is returned untracked.
    ///
    /// `loader` runs while the cache is locked and must not call back into
    /// this cache.
    pub fn put_if_absent<F>(&self, key: K, loader: F) -> ImageStreamCompleter
    where
        F: FnOnce() -> ImageStreamCompleter,
    {
        let completer = {
            let mut state = self.state.lock();

            let hit = state
                .entries
                .peek(&key)
                .map(|slot| (slot.completer().clone(), slot.is_cached()));

            if let Some((completer, cached)) = hit {
                state.hits += 1;
                if cached {
                    state.entries.promote(&key);
                    trace!(key = ?key, "Image cache hit");
                } else {
                    trace!(key = ?key, "Joining in-flight load");
                }
                return completer;
            }

            state.misses += 1;
            let completer = loader();

            if state.maximum_size == 0 || state.maximum_size_bytes == 0 {
                debug!(key = ?key, "Caching disabled, load not tracked");
                return completer;
            }

            state
                .entries
                .put(key.clone(), Slot::Pending(completer.clone()));
            debug!(key = ?key, "Started load");
            completer
        };

        // Registered after unlocking: a completer that already holds an image
        // replays synchronously and re-enters the cache.
        let completer_id = completer.identity();
        let on_image_state = Arc::downgrade(&self.state);
        let on_error_state = Weak::clone(&on_image_state);
        let error_key = key.clone();

        completer.add_listener(
            ImageStreamListener::new(move |info, _| {
                if let Some(state) = on_image_state.upgrade() {
                    state.lock().admit(key, completer_id, info.size_bytes());
                }
            })
            .on_error(move |_| {
                if let Some(state) = on_error_state.upgrade() {
                    state.lock().abandon(&error_key, completer_id);
                }
            }),
        );

        completer
    }

    /// Remove a cached entry. Pending loads are not affected.
    ///
    /// Returns `true` if an entry was removed.
    pub fn evict(&self, key: &K) -> bool {
        self.state.lock().evict(key)
    }

    /// Remove every cached entry and reset the byte counter.
    ///
    /// Pending loads are kept and will populate the cache when they finish.
    pub fn clear(&self) {
        self.state.lock().clear();
    }

    pub fn maximum_size(&self) -> usize {
        self.state.lock().maximum_size
    }

    /// Change the entry limit. 0 clears the cache and disables caching;
    /// a smaller value evicts immediately.
    pub fn set_maximum_size(&self, value: usize) {
        let mut state = self.state.lock();
        if value == state.maximum_size {
            return;
        }

        state.maximum_size = value;
        if value == 0 {
            state.clear();
        } else {
            state.check_cache_size();
        }
    }

    pub fn maximum_size_bytes(&self) -> usize {
        self.state.lock().maximum_size_bytes
    }

    /// Change the byte limit. 0 clears the cache and disables caching;
    /// a smaller value evicts immediately.
    pub fn set_maximum_size_bytes(&self, value: usize) {
        let mut state = self.state.lock();
        if value == state.maximum_size_bytes {
            return;
        }

        state.maximum_size_bytes = value;
        if value == 0 {
            state.clear();
        } else {
            state.check_cache_size();
        }
    }

    /// Number of cached images (pending loads excluded).
    pub fn current_size(&self) -> usize {
        self.state.lock().cached_count
    }

    /// Total size of cached images in bytes.
    pub fn current_size_bytes(&self) -> usize {
        self.state.lock().current_size_bytes
    }

    /// Number of loads in flight.
    pub fn pending_count(&self) -> usize {
        let state = self.state.lock();
        state.entries.len() - state.cached_count
    }

    /// Whether `key` has a cached image. Does not affect LRU order.
    pub fn contains_key(&self, key: &K) -> bool {
        self.state
            .lock()
            .entries
            .peek(key)
            .is_some_and(Slot::is_cached)
    }

    /// Whether a load for `key` is in flight.
    pub fn is_pending(&self, key: &K) -> bool {
        self.state
            .lock()
            .entries
            .peek(key)
            .is_some_and(|slot| !slot.is_cached())
    }

    /// Cached keys from least to most recently used.
    pub fn keys(&self) -> Vec<K> {
        self.state
            .lock()
            .entries
            .iter()
            .rev()
            .filter(|(_, slot)| slot.is_cached())
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.cached_count,
            size_bytes: state.current_size_bytes,
            pending: state.entries.len() - state.cached_count,
            maximum_size: state.maximum_size,
            maximum_size_bytes: state.maximum_size_bytes,
            hits: state.hits,
            misses: state.misses,
        }
    }
}

impl<K> Default for ImageCache<K>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for ImageCache<K>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCache")
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
