//! Images fetched over HTTP(S).

use reqwest::Client;

use crate::error::ImageError;
use crate::io::{parse_http_url, HttpSource};
use crate::stream::ImageStreamCompleter;

use super::codec::load_from_source;
use super::{ImageConfiguration, ImageProvider};

/// Cache key for a network image: URL and scale. Request headers are not
/// part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkImageKey {
    url: String,
    scale_bits: u32,
}

impl NetworkImageKey {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn scale(&self) -> f32 {
        f32::from_bits(self.scale_bits)
    }
}

/// An image fetched over HTTP(S).
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use image_pipeline::cache::ImageCache;
/// use image_pipeline::provider::{ImageConfiguration, ImageResolver, NetworkImage};
///
/// # async fn run() {
/// let resolver = ImageResolver::new(Arc::new(ImageCache::new()));
/// let image = NetworkImage::new("https://example.com/logo.png")
///     .with_scale(2.0)
///     .with_header("Authorization", "Bearer token");
///
/// let stream = resolver.resolve(&image, &ImageConfiguration::empty());
/// let (info, _) = stream.next_image().await.unwrap();
/// println!("{}x{}", info.image().width(), info.image().height());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NetworkImage {
    url: String,
    scale: f32,
    headers: Vec<(String, String)>,
    client: Client,
}

impl NetworkImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scale: 1.0,
            headers: Vec::new(),
            client: Client::new(),
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Add a request header sent with every fetch.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Use a shared HTTP client (connection pool, timeouts).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl ImageProvider for NetworkImage {
    type Key = NetworkImageKey;

    fn obtain_key(&self, _configuration: &ImageConfiguration) -> Result<Self::Key, ImageError> {
        parse_http_url(&self.url)?;
        Ok(NetworkImageKey {
            url: self.url.clone(),
            scale_bits: self.scale.to_bits(),
        })
    }

    fn load(&self, key: Self::Key) -> ImageStreamCompleter {
        match HttpSource::new(self.client.clone(), key.url(), &self.headers) {
            Ok(source) => load_from_source(source, key.scale()),
            Err(err) => ImageStreamCompleter::failed(err.into()),
        }
    }
}
