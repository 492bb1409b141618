//! Resolution pipeline: provider → key → cache → stream.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       ImageResolver                       │
//! │                                                           │
//! │  resolve(provider, configuration)                         │
//! │    1. provider.obtain_key(configuration)                  │
//! │    2. cache.put_if_absent(key, || provider.load(key))     │
//! │    3. bind an ImageStream to the returned completer       │
//! │                     │                                     │
//! │                     ▼                                     │
//! │              ┌────────────┐                               │
//! │              │ ImageCache │ (shared, Arc)                 │
//! │              └────────────┘                               │
//! └───────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::warn;

use crate::cache::{ImageCache, ImageKey};
use crate::config::CacheConfig;
use crate::error::ImageError;
use crate::stream::{ImageStream, ImageStreamCompleter};

use super::{ImageConfiguration, ImageProvider};

/// Entry point for obtaining images.
///
/// Cheap to clone; clones share the cache.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    cache: Arc<ImageCache>,
}

impl ImageResolver {
    pub fn new(cache: Arc<ImageCache>) -> Self {
        Self { cache }
    }

    /// Create a resolver with a private cache built from `config`.
    pub fn with_config(config: &CacheConfig) -> Self {
        Self::new(Arc::new(ImageCache::from_config(config)))
    }

    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }

    /// Resolve `provider` into a stream.
    ///
    /// Concurrent and repeated requests for the same key share one load.
    /// If the provider cannot derive a key, the returned stream reports the
    /// error to its listeners and nothing is cached.
    pub fn resolve<P>(&self, provider: &P, configuration: &ImageConfiguration) -> ImageStream
    where
        P: ImageProvider + ?Sized,
    {
        let key = match provider.obtain_key(configuration) {
            Ok(key) => key,
            Err(err) => {
                warn!(error = %err, "Failed to obtain image key");
                return ImageStream::with_completer(ImageStreamCompleter::failed(err));
            }
        };

        let completer = self
            .cache
            .put_if_absent(ImageKey::new(key.clone()), || provider.load(key));
        ImageStream::with_completer(completer)
    }

    /// Drop the cached image `provider` resolves to under `configuration`.
    ///
    /// Returns whether a cached entry was removed. In-flight loads are left
    /// alone.
    pub fn evict<P>(
        &self,
        provider: &P,
        configuration: &ImageConfiguration,
    ) -> Result<bool, ImageError>
    where
        P: ImageProvider + ?Sized,
    {
        let key = provider.obtain_key(configuration)?;
        Ok(self.cache.evict(&ImageKey::new(key)))
    }
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new(Arc::new(ImageCache::new()))
    }
}
