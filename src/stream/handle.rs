//! Deferred-binding stream handle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use tokio::sync::oneshot;

use crate::error::{ImageError, StreamError};

use super::completer::{ImageStreamCompleter, ImageStreamListener, ListenerHandle};
use super::info::ImageInfo;

#[derive(Default)]
struct StreamState {
    completer: Option<ImageStreamCompleter>,

    /// Set while buffered listeners are being forwarded by `set_completer`
    binding: Option<ImageStreamCompleter>,

    buffered: Vec<(ListenerHandle, ImageStreamListener)>,

    /// Listener taken from `buffered` and being attached to `binding`.
    /// Removal claims the flag so the listener never fires.
    forwarding: Option<(ListenerHandle, Arc<AtomicBool>)>,
}

/// A forward reference to an [`ImageStreamCompleter`].
///
/// Consumers attach listeners here rather than on the completer so they can
/// subscribe before the completer is known. Listeners added while unbound are
/// buffered and forwarded, in order, when [`set_completer`](Self::set_completer)
/// binds the stream. Clones share the same state.
#[derive(Clone, Default)]
pub struct ImageStream {
    state: Arc<Mutex<StreamState>>,
}

impl ImageStream {
    /// Create an unbound stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream already bound to `completer`.
    pub fn with_completer(completer: ImageStreamCompleter) -> Self {
        Self {
            state: Arc::new(Mutex::new(StreamState {
                completer: Some(completer),
                ..StreamState::default()
            })),
        }
    }

    /// The bound completer, if any.
    pub fn completer(&self) -> Option<ImageStreamCompleter> {
        self.state.lock().completer.clone()
    }

    pub fn is_bound(&self) -> bool {
        self.state.lock().completer.is_some()
    }

    /// Bind the stream and forward buffered listeners to `completer`.
    ///
    /// Buffered listeners are forwarded without holding the stream lock, so a
    /// callback replayed during the flush may use this stream again. Listeners
    /// added concurrently with the flush are queued behind it.
    pub fn set_completer(&self, completer: ImageStreamCompleter) -> Result<(), StreamError> {
        {
            let mut state = self.state.lock();
            if state.completer.is_some() || state.binding.is_some() {
                return Err(StreamError::AlreadyBound);
            }
            state.binding = Some(completer.clone());
        }

        loop {
            let (handle, listener, claimed) = {
                let mut state = self.state.lock();
                if state.buffered.is_empty() {
                    state.forwarding = None;
                    state.binding = None;
                    state.completer = Some(completer);
                    return Ok(());
                }
                let (handle, listener) = state.buffered.remove(0);
                let claimed = Arc::new(AtomicBool::new(false));
                state.forwarding = Some((handle, claimed.clone()));
                (handle, listener, claimed)
            };

            completer.attach(handle, listener.claimable(claimed));
        }
    }

    /// Register a listener, buffering it until the stream is bound.
    pub fn add_listener(&self, listener: ImageStreamListener) -> ListenerHandle {
        let handle = ListenerHandle::next();

        let completer = {
            let mut state = self.state.lock();
            match state.completer.clone() {
                Some(completer) => completer,
                None => {
                    state.buffered.push((handle, listener));
                    return handle;
                }
            }
        };

        completer.attach(handle, listener);
        handle
    }

    /// Remove a listener whether it is still buffered or already forwarded.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut state = self.state.lock();

        if let Some(pos) = state.buffered.iter().position(|(h, _)| *h == handle) {
            state.buffered.remove(pos);
            return true;
        }

        if let Some((forwarding, claimed)) = &state.forwarding {
            if *forwarding == handle {
                if claimed.swap(true, Ordering::AcqRel) {
                    return false;
                }
                if let Some(binding) = &state.binding {
                    binding.remove_listener(handle);
                }
                return true;
            }
        }

        match state.completer.as_ref().or(state.binding.as_ref()) {
            Some(completer) => completer.remove_listener(handle),
            None => false,
        }
    }

    /// Wait for the stream's outcome.
    ///
    /// Resolves to the image and whether it was delivered synchronously
    /// (already available when the listener was added), or to the load error.
    pub async fn next_image(&self) -> Result<(ImageInfo, bool), ImageError> {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let on_error_tx = tx.clone();

        self.add_listener(
            ImageStreamListener::new(move |info, synchronous| {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(Ok((info.clone(), synchronous)));
                }
            })
            .on_error(move |err| {
                if let Some(tx) = on_error_tx.lock().take() {
                    let _ = tx.send(Err(err.clone()));
                }
            }),
        );

        rx.await
            .map_err(|_| ImageError::TaskFailed("image stream dropped".to_string()))?
    }
}

impl fmt::Debug for ImageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ImageStream")
            .field("completer", &state.completer)
            .field("buffered", &state.buffered.len())
            .finish()
    }
}
