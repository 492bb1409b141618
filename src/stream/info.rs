//! Decoded image payloads delivered to stream listeners.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::ImageError;

/// Bytes per pixel of the RGBA8 layout every decoded image uses.
pub const BYTES_PER_PIXEL: usize = 4;

/// A decoded RGBA8 pixel buffer.
///
/// The buffer is opaque to the cache; only its length matters for size
/// accounting.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Bytes,
}

impl DecodedImage {
    /// Wrap a raw RGBA8 buffer, checking that its length matches the dimensions.
    pub fn new(width: u32, height: u32, pixels: impl Into<Bytes>) -> Result<Self, ImageError> {
        let pixels = pixels.into();
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL));

        // An unrepresentable size is reported as usize::MAX.
        if expected != Some(pixels.len()) {
            return Err(ImageError::InvalidBuffer {
                width,
                height,
                expected: expected.unwrap_or(usize::MAX),
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Convert a decoded `image` crate value into an RGBA8 buffer.
    pub fn from_dynamic(image: image::DynamicImage) -> Self {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            pixels: Bytes::from(rgba.into_raw()),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &Bytes {
        &self.pixels
    }

    /// Memory held by the pixel buffer, used for cache accounting.
    pub fn size_bytes(&self) -> usize {
        self.pixels.len()
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size_bytes", &self.pixels.len())
            .finish()
    }
}

/// A decoded image together with the scale it was loaded at.
///
/// Cloning shares the underlying buffer; every subscriber of one completer
/// sees the same allocation.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    image: Arc<DecodedImage>,
    scale: f32,
}

impl ImageInfo {
    pub fn new(image: DecodedImage, scale: f32) -> Self {
        Self {
            image: Arc::new(image),
            scale,
        }
    }

    pub fn image(&self) -> &Arc<DecodedImage> {
        &self.image
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn size_bytes(&self) -> usize {
        self.image.size_bytes()
    }

    /// Whether both values point at the same decoded buffer.
    pub fn same_image(&self, other: &ImageInfo) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}
