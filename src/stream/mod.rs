//! Image streams: delivery of decoded images to subscribers.
//!
//! # Components
//!
//! - [`ImageStreamCompleter`]: holds one load's outcome and broadcasts it,
//!   replaying it synchronously to listeners that attach late
//! - [`ImageStream`]: handle returned to consumers; buffers listeners until a
//!   completer is bound
//! - [`ImageStreamListener`]: an `on_image` callback plus optional `on_error`
//! - [`ImageInfo`] / [`DecodedImage`]: the shared, immutable payload
//!
//! # Example
//!
//! ```
//! use image_pipeline::stream::{
//!     DecodedImage, ImageInfo, ImageStream, ImageStreamCompleter, ImageStreamListener,
//! };
//!
//! let stream = ImageStream::new();
//! stream.add_listener(ImageStreamListener::new(|info, synchronous| {
//!     println!("{}x{} (sync: {})", info.image().width(), info.image().height(), synchronous);
//! }));
//!
//! let completer = ImageStreamCompleter::new();
//! stream.set_completer(completer.clone()).unwrap();
//!
//! let image = DecodedImage::new(2, 2, vec![0u8; 16]).unwrap();
//! completer.set_image(ImageInfo::new(image, 1.0));
//! ```

mod completer;
mod handle;
mod info;

pub use completer::{
    ErrorCallback, ImageCallback, ImageStreamCompleter, ImageStreamListener, ListenerHandle,
};
pub use handle::ImageStream;
pub use info::{DecodedImage, ImageInfo, BYTES_PER_PIXEL};
