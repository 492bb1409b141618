//! Decoding and the shared load path used by the built-in providers.

use std::io::Cursor;

use bytes::Bytes;
use image::ImageReader;

use crate::error::ImageError;
use crate::io::ByteSource;
use crate::stream::{DecodedImage, ImageInfo, ImageStreamCompleter};

/// Decode encoded bytes (PNG or JPEG) into an RGBA8 buffer.
pub fn decode_image_blocking(data: &[u8]) -> Result<DecodedImage, ImageError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    let image = reader
        .decode()
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    Ok(DecodedImage::from_dynamic(image))
}

/// Decode on the blocking thread pool.
pub async fn decode_image(data: Bytes) -> Result<DecodedImage, ImageError> {
    tokio::task::spawn_blocking(move || decode_image_blocking(&data))
        .await
        .map_err(|e| ImageError::TaskFailed(e.to_string()))?
}

/// Fetch from `source`, decode, and deliver through a new completer.
pub fn load_from_source<S>(source: S, scale: f32) -> ImageStreamCompleter
where
    S: ByteSource + 'static,
{
    let label = source.identifier().to_string();
    ImageStreamCompleter::spawn(label, async move {
        let data = source.fetch().await?;
        let image = decode_image(data).await?;
        Ok(ImageInfo::new(image, scale))
    })
}
