//! Images decoded from encoded bytes held in memory.

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::error::ImageError;
use crate::stream::{ImageInfo, ImageStreamCompleter};

use super::codec::decode_image;
use super::{ImageConfiguration, ImageProvider};

/// Keyed by content digest, so two providers wrapping equal bytes share a
/// cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryImageKey {
    digest: String,
    scale_bits: u32,
}

impl MemoryImageKey {
    /// Hex-encoded SHA-256 of the encoded bytes.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn scale(&self) -> f32 {
        f32::from_bits(self.scale_bits)
    }
}

/// An image decoded from encoded bytes already in memory.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    bytes: Bytes,
    scale: f32,
    digest: String,
}

impl MemoryImage {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let digest = hex::encode(Sha256::digest(&bytes));
        Self {
            bytes,
            scale: 1.0,
            digest,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

impl ImageProvider for MemoryImage {
    type Key = MemoryImageKey;

    fn obtain_key(&self, _configuration: &ImageConfiguration) -> Result<Self::Key, ImageError> {
        Ok(MemoryImageKey {
            digest: self.digest.clone(),
            scale_bits: self.scale.to_bits(),
        })
    }

    fn load(&self, key: Self::Key) -> ImageStreamCompleter {
        let bytes = self.bytes.clone();
        let scale = key.scale();
        let label = format!("memory://{}", &key.digest[..12]);
        ImageStreamCompleter::spawn(label, async move {
            let image = decode_image(bytes).await?;
            Ok(ImageInfo::new(image, scale))
        })
    }
}
