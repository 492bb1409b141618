//! # Image Pipeline
//!
//! Resolution and caching of decoded images.
//!
//! Callers describe an image with a provider (URL, file, in-memory bytes,
//! asset). The resolver derives a key, consults a shared LRU cache, and hands
//! back a stream that delivers the decoded image once it is available.
//!
//! ## Features
//!
//! - **Deduplication**: concurrent requests for one key share a single load
//! - **Bounded cache**: LRU eviction by entry count and by decoded byte size
//! - **Late subscribers**: a completed image is replayed synchronously to new
//!   listeners
//! - **Failure isolation**: a panicking listener does not affect the others,
//!   and a failed load is retried on the next request
//!
//! ## Architecture
//!
//! - [`provider`] - image providers and the resolver
//! - [`cache`] - bounded LRU of in-flight and completed loads
//! - [`stream`] - completers, stream handles and listeners
//! - [`io`] - upstream byte sources (HTTP, filesystem)
//! - [`config`] - cache limits and CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use image_pipeline::{FileImage, ImageCache, ImageConfiguration, ImageResolver};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Arc::new(ImageCache::with_limits(100, 50 << 20));
//!     let resolver = ImageResolver::new(cache);
//!
//!     let stream = resolver.resolve(&FileImage::new("logo.png"), &ImageConfiguration::empty());
//!     match stream.next_image().await {
//!         Ok((info, _)) => println!("{}x{}", info.image().width(), info.image().height()),
//!         Err(e) => eprintln!("load failed: {}", e),
//!     }
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod io;
pub mod provider;
pub mod stream;

// Re-export commonly used types
pub use cache::{CacheStats, ImageCache, ImageKey};
pub use config::{CacheConfig, Cli, Command, FetchConfig, OutputFormat};
pub use error::{ImageError, IoError, StreamError};
pub use io::{ByteSource, FileSource, HttpSource};
pub use provider::{
    AssetBundle, AssetImage, ExactAssetImage, FileImage, ImageConfiguration, ImageProvider,
    ImageResolver, MemoryImage, NetworkImage, Size,
};
pub use stream::{
    DecodedImage, ImageInfo, ImageStream, ImageStreamCompleter, ImageStreamListener,
    ListenerHandle,
};
