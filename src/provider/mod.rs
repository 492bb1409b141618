//! Image providers and the resolution pipeline.
//!
//! A provider describes *which* image is wanted. It derives a cache key from
//! an [`ImageConfiguration`] and, on a cache miss, starts the load that
//! produces the decoded image. [`ImageResolver`] ties providers to a shared
//! [`ImageCache`](crate::cache::ImageCache).
//!
//! # Providers
//!
//! - [`NetworkImage`]: HTTP(S) URL
//! - [`FileImage`]: local file
//! - [`MemoryImage`]: encoded bytes already in memory
//! - [`AssetImage`] / [`ExactAssetImage`]: files in an [`AssetBundle`]

use std::fmt::Debug;
use std::hash::Hash;

use crate::error::ImageError;
use crate::stream::ImageStreamCompleter;

mod asset;
pub mod codec;
mod configuration;
mod file;
mod memory;
mod network;
mod resolver;

pub use asset::{AssetBundle, AssetImage, AssetImageKey, ExactAssetImage, MAX_VARIANT_SCALE};
pub use configuration::{ImageConfiguration, Size};
pub use file::{FileImage, FileImageKey};
pub use memory::{MemoryImage, MemoryImageKey};
pub use network::{NetworkImage, NetworkImageKey};
pub use resolver::ImageResolver;

/// A source of one logical image.
///
/// Keys must compare equal exactly when two providers would load the same
/// image; the cache deduplicates on them.
pub trait ImageProvider: Send + Sync {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Derive the cache key for this provider under `configuration`.
    fn obtain_key(&self, configuration: &ImageConfiguration) -> Result<Self::Key, ImageError>;

    /// Start loading the image for `key`.
    ///
    /// Called only on a cache miss, while the cache is locked, so it must not
    /// block or call back into the cache. Do the work on a task and complete
    /// the returned completer later.
    fn load(&self, key: Self::Key) -> ImageStreamCompleter;
}
