use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Trait for fetching the encoded bytes of one image.
///
/// This is the upstream seam of the pipeline: providers build a source for a
/// key and the cache never sees anything but the decoded result. Sources are
/// expected to be cheap to construct and safe to use from any task.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Fetch the complete encoded resource.
    async fn fetch(&self) -> Result<Bytes, IoError>;

    /// Identifier used in logs, e.g. `https://host/a.png` or `file:///tmp/a.png`.
    fn identifier(&self) -> &str;
}
