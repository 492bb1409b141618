//! Images read from the local filesystem.

use std::path::{Path, PathBuf};

use crate::error::ImageError;
use crate::io::FileSource;
use crate::stream::ImageStreamCompleter;

use super::codec::load_from_source;
use super::{ImageConfiguration, ImageProvider};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileImageKey {
    path: PathBuf,
    scale_bits: u32,
}

impl FileImageKey {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scale(&self) -> f32 {
        f32::from_bits(self.scale_bits)
    }
}

/// An image read from the local filesystem.
#[derive(Debug, Clone, PartialEq)]
pub struct FileImage {
    path: PathBuf,
    scale: f32,
}

impl FileImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageProvider for FileImage {
    type Key = FileImageKey;

    fn obtain_key(&self, _configuration: &ImageConfiguration) -> Result<Self::Key, ImageError> {
        Ok(FileImageKey {
            path: self.path.clone(),
            scale_bits: self.scale.to_bits(),
        })
    }

    fn load(&self, key: Self::Key) -> ImageStreamCompleter {
        let scale = key.scale();
        load_from_source(FileSource::new(key.path), scale)
    }
}
