use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

use super::ByteSource;
use crate::error::IoError;

/// Reads an image file from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    identifier: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identifier = format!("file://{}", path.display());
        Self { path, identifier }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn fetch(&self) -> Result<Bytes, IoError> {
        trace!(path = %self.path.display(), "Reading image file");
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(IoError::NotFound(self.identifier.clone()))
            }
            Err(e) => Err(IoError::Read(format!("{}: {}", self.identifier, e))),
        }
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
