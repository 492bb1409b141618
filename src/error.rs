use thiserror::Error;

/// I/O errors that can occur when fetching encoded image bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote server answered with a non-success status
    #[error("HTTP {status} while fetching {url}")]
    Http { status: u16, url: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The source location could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Local read failure
    #[error("Read error: {0}")]
    Read(String),
}

/// Errors that can fail an image load.
///
/// Cloneable so that a single failure can be replayed to every listener of a
/// completer.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// Fetching the encoded bytes failed
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The bytes could not be decoded into pixels
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Pixel buffer length does not match the declared dimensions
    #[error(
        "Invalid pixel buffer for {width}x{height} RGBA image: expected {expected} bytes, got {actual}"
    )]
    InvalidBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// No asset (or scaled variant) exists under the requested name
    #[error("Unable to find asset \"{name}\"")]
    AssetNotFound { name: String },

    /// Key derivation rejected the provider/configuration pair
    #[error("Invalid image key: {0}")]
    InvalidKey(String),

    /// A load was started outside of a tokio runtime
    #[error("No async runtime available to load {0}")]
    NoRuntime(String),

    /// The background load task panicked or was cancelled
    #[error("Image load task failed: {0}")]
    TaskFailed(String),
}

/// Misuse of an [`ImageStream`](crate::stream::ImageStream).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// `set_completer` was called on a stream that is already bound
    #[error("Image stream is already bound to a completer")]
    AlreadyBound,
}
