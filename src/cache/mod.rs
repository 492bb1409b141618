//! Image cache layer.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │                    ImageCache                     │
//! │                                                   │
//! │   LruCache<ImageKey, Slot>    (MRU ◀──────▶ LRU)  │
//! │   ┌──────────────┐ ┌──────────────┐               │
//! │   │ Pending(c)   │ │ Cached(c, n) │ ...           │
//! │   └──────────────┘ └──────────────┘               │
//! │                                                   │
//! │   cached_count ≤ maximum_size                     │
//! │   current_size_bytes ≤ maximum_size_bytes         │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`ImageCache`]: bounded LRU of completers with in-flight deduplication
//! - [`ImageKey`]: type-erased key so different providers share one cache
//! - [`CacheStats`]: serializable occupancy snapshot

mod image_cache;
mod key;

pub use image_cache::{
    CacheStats, ImageCache, DEFAULT_MAXIMUM_SIZE, DEFAULT_MAXIMUM_SIZE_BYTES, OVERSIZE_MARGIN,
};
pub use key::ImageKey;
