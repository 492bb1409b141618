//! Test utilities for integration tests.
//!
//! Mock providers whose loads are completed by hand, image fixtures, and a
//! minimal HTTP server with request counting.

use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use image_pipeline::error::ImageError;
use image_pipeline::provider::{ImageConfiguration, ImageProvider};
use image_pipeline::stream::{
    DecodedImage, ImageInfo, ImageStream, ImageStreamCompleter, ImageStreamListener,
};

// =============================================================================
// Mock Provider
// =============================================================================

/// A provider whose loads stay pending until the test completes them.
///
/// Clones share the load counter and the list of started loads.
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    load_count: Arc<AtomicUsize>,
    loads: Arc<Mutex<Vec<ImageStreamCompleter>>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            load_count: Arc::new(AtomicUsize::new(0)),
            loads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    /// Completer of the most recent load.
    pub fn last_load(&self) -> ImageStreamCompleter {
        self.loads
            .lock()
            .last()
            .cloned()
            .expect("no load started")
    }

    /// Complete the most recent load with an RGBA image of `size_bytes`.
    pub fn complete(&self, size_bytes: usize) {
        self.last_load().set_image(make_info(size_bytes));
    }

    pub fn fail(&self, err: ImageError) {
        self.last_load().report_error(err);
    }
}

impl ImageProvider for MockProvider {
    type Key = String;

    fn obtain_key(&self, _configuration: &ImageConfiguration) -> Result<Self::Key, ImageError> {
        Ok(self.name.clone())
    }

    fn load(&self, _key: Self::Key) -> ImageStreamCompleter {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        let completer = ImageStreamCompleter::new();
        self.loads.lock().push(completer.clone());
        completer
    }
}

// =============================================================================
// Listener Recording
// =============================================================================

/// What a recording listener observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Image { synchronous: bool, size_bytes: usize },
    Error(String),
}

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener(&self) -> ImageStreamListener {
        let on_image = self.events.clone();
        let on_error = self.events.clone();
        ImageStreamListener::new(move |info, synchronous| {
            on_image.lock().push(Event::Image {
                synchronous,
                size_bytes: info.size_bytes(),
            });
        })
        .on_error(move |err| on_error.lock().push(Event::Error(err.to_string())))
    }

    pub fn listen(&self, stream: &ImageStream) {
        stream.add_listener(self.listener());
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

// =============================================================================
// Image Fixtures
// =============================================================================

/// An image whose decoded buffer is `size_bytes` long (a multiple of 4).
pub fn make_info(size_bytes: usize) -> ImageInfo {
    assert_eq!(size_bytes % 4, 0, "RGBA sizes are multiples of 4");
    let width = (size_bytes / 4) as u32;
    let image = DecodedImage::new(width, 1, vec![0u8; size_bytes]).unwrap();
    ImageInfo::new(image, 1.0)
}

/// Encode a solid-color PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]));
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

// =============================================================================
// Test HTTP Server
// =============================================================================

/// Minimal HTTP/1.1 server serving fixed bodies by path.
///
/// Unknown paths answer 404. Every request is counted.
pub struct TestServer {
    addr: SocketAddr,
    request_count: Arc<AtomicUsize>,
}

impl TestServer {
    pub async fn start(routes: HashMap<String, Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let request_count = Arc::new(AtomicUsize::new(0));
        let routes = Arc::new(routes);

        let counter = request_count.clone();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let routes = routes.clone();
                let counter = counter.clone();

                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    counter.fetch_add(1, Ordering::SeqCst);

                    let head = String::from_utf8_lossy(&request);
                    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let (status, body) = match routes.get(&path) {
                        Some(body) => ("200 OK", body.clone()),
                        None => ("404 Not Found", Vec::new()),
                    };
                    let header = format!(
                        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        body.len()
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            addr,
            request_count,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}
