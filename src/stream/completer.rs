//! Completion broadcaster for a single image load.
//!
//! An [`ImageStreamCompleter`] holds at most one outcome and fans it out to
//! every listener. Listeners registered before completion are queued and
//! called in registration order; listeners registered afterwards are called
//! synchronously with `synchronous_call = true` and are never retained.
//!
//! # State Machine
//!
//! ```text
//!            set_image                report_error
//! Pending ─────────────▶ Image    Pending ─────────────▶ Failed
//! ```
//!
//! Both terminal states replay to late listeners. A panic inside one
//! listener's callback is caught and logged; the remaining listeners still run.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::error::ImageError;

use super::info::ImageInfo;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// Listeners
// =============================================================================

/// Token returned when a listener is registered, used to remove it again.
///
/// Ids are unique for the whole process, so a handle issued by an
/// [`ImageStream`](super::ImageStream) stays valid once the stream forwards
/// the listener to its completer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub(crate) fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Called with the image and whether it was delivered synchronously from
/// inside `add_listener`.
pub type ImageCallback = Box<dyn FnOnce(&ImageInfo, bool) + Send>;

pub type ErrorCallback = Box<dyn FnOnce(&ImageError) + Send>;

/// A subscriber: an image callback and an optional error callback.
///
/// Exactly one of the two is invoked, at most once.
pub struct ImageStreamListener {
    on_image: ImageCallback,
    on_error: Option<ErrorCallback>,
}

impl ImageStreamListener {
    pub fn new<F>(on_image: F) -> Self
    where
        F: FnOnce(&ImageInfo, bool) + Send + 'static,
    {
        Self {
            on_image: Box::new(on_image),
            on_error: None,
        }
    }

    /// Attach an error callback.
    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: FnOnce(&ImageError) + Send + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Wrap the callbacks so they run only if `claimed` is still unset when
    /// delivery happens. Whoever sets the flag first wins.
    pub(crate) fn claimable(self, claimed: Arc<AtomicBool>) -> Self {
        let on_image = self.on_image;
        let image_claim = claimed.clone();
        let listener = Self::new(move |info, synchronous_call| {
            if !image_claim.swap(true, Ordering::AcqRel) {
                on_image(info, synchronous_call);
            }
        });

        let on_error = self.on_error;
        listener.on_error(move |err| {
            if !claimed.swap(true, Ordering::AcqRel) {
                if let Some(on_error) = on_error {
                    on_error(err);
                }
            }
        })
    }

    fn deliver_image(self, handle: ListenerHandle, info: &ImageInfo, synchronous_call: bool) {
        let on_image = self.on_image;
        let result = panic::catch_unwind(AssertUnwindSafe(|| on_image(info, synchronous_call)));
        if let Err(payload) = result {
            error!(
                listener = handle.id(),
                "Image listener panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }

    fn deliver_error(self, handle: ListenerHandle, err: &ImageError) {
        let Some(on_error) = self.on_error else {
            debug!(listener = handle.id(), error = %err, "Listener has no error callback");
            return;
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| on_error(err)));
        if let Err(payload) = result {
            error!(
                listener = handle.id(),
                "Image error listener panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }
}

impl fmt::Debug for ImageStreamListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageStreamListener")
            .field("has_error_callback", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =============================================================================
// Completer
// =============================================================================

#[derive(Debug, Clone)]
enum Outcome {
    Image(ImageInfo),
    Error(ImageError),
}

#[derive(Default)]
struct CompleterState {
    /// Queued listeners in the order they were attached to this completer
    listeners: Vec<(ListenerHandle, ImageStreamListener)>,

    outcome: Option<Outcome>,
}

/// Shared, cloneable broadcaster for one image load.
///
/// Clones refer to the same state; use [`ptr_eq`](Self::ptr_eq) to compare
/// identity.
#[derive(Clone, Default)]
pub struct ImageStreamCompleter {
    state: Arc<Mutex<CompleterState>>,
}

impl ImageStreamCompleter {
    /// Create an empty completer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a completer that already holds `info`.
    pub fn completed(info: ImageInfo) -> Self {
        let completer = Self::new();
        completer.state.lock().outcome = Some(Outcome::Image(info));
        completer
    }

    /// Create a completer that already failed with `err`.
    pub fn failed(err: ImageError) -> Self {
        let completer = Self::new();
        completer.state.lock().outcome = Some(Outcome::Error(err));
        completer
    }

    /// Run `future` on the current tokio runtime and complete with its result.
    ///
    /// `label` identifies the load in logs and in the error reported when no
    /// runtime is available. A panic inside the future is reported as
    /// [`ImageError::TaskFailed`].
    pub fn spawn<F>(label: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = Result<ImageInfo, ImageError>> + Send + 'static,
    {
        let completer = Self::new();
        let label = label.into();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                completer.report_error(ImageError::NoRuntime(label));
                return completer;
            }
        };

        let target = completer.clone();
        let load = runtime.spawn(future);
        runtime.spawn(async move {
            let outcome = match load.await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(ImageError::TaskFailed(join_err.to_string())),
            };

            match outcome {
                Ok(info) => {
                    debug!(source = %label, size_bytes = info.size_bytes(), "Image loaded");
                    target.set_image(info);
                }
                Err(err) => {
                    debug!(source = %label, error = %err, "Image load failed");
                    target.report_error(err);
                }
            }
        });

        completer
    }

    /// Register a listener.
    ///
    /// If the completer already holds an outcome, the listener is invoked
    /// before this method returns and is not retained; the returned handle
    /// is then already spent.
    pub fn add_listener(&self, listener: ImageStreamListener) -> ListenerHandle {
        let handle = ListenerHandle::next();
        self.attach(handle, listener);
        handle
    }

    /// Register a listener under an id issued elsewhere.
    ///
    /// Delivery order follows the order of `attach` calls, not handle ids.
    pub(crate) fn attach(&self, handle: ListenerHandle, listener: ImageStreamListener) {
        let outcome = {
            let mut state = self.state.lock();
            match state.outcome.clone() {
                None => {
                    state.listeners.push((handle, listener));
                    return;
                }
                Some(outcome) => outcome,
            }
        };

        match outcome {
            Outcome::Image(info) => listener.deliver_image(handle, &info, true),
            Outcome::Error(err) => listener.deliver_error(handle, &err),
        }
    }

    /// Remove a queued listener. Returns `false` if it was never queued or
    /// has already been called.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut state = self.state.lock();
        match state.listeners.iter().position(|(h, _)| *h == handle) {
            Some(pos) => {
                state.listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Store `info` and deliver it to every queued listener in registration
    /// order.
    ///
    /// A later call replaces the stored image for future listeners; listeners
    /// already called are not called again.
    pub fn set_image(&self, info: ImageInfo) {
        let listeners = {
            let mut state = self.state.lock();
            state.outcome = Some(Outcome::Image(info.clone()));
            mem::take(&mut state.listeners)
        };

        for (handle, listener) in listeners {
            listener.deliver_image(handle, &info, false);
        }
    }

    /// Fail the load and deliver `err` to every queued listener.
    ///
    /// Ignored if an image was already delivered.
    pub fn report_error(&self, err: ImageError) {
        let listeners = {
            let mut state = self.state.lock();
            if matches!(state.outcome, Some(Outcome::Image(_))) {
                warn!(error = %err, "Ignoring error reported after image completion");
                return;
            }
            state.outcome = Some(Outcome::Error(err.clone()));
            mem::take(&mut state.listeners)
        };

        for (handle, listener) in listeners {
            listener.deliver_error(handle, &err);
        }
    }

    /// The delivered image, if any.
    pub fn current_image(&self) -> Option<ImageInfo> {
        match &self.state.lock().outcome {
            Some(Outcome::Image(info)) => Some(info.clone()),
            _ => None,
        }
    }

    /// The reported error, if the load failed.
    pub fn error(&self) -> Option<ImageError> {
        match &self.state.lock().outcome {
            Some(Outcome::Error(err)) => Some(err.clone()),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state.lock().outcome.is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Whether both values are clones of the same completer.
    pub fn ptr_eq(&self, other: &ImageStreamCompleter) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Address of the shared state. Stable while any clone is alive.
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.state) as usize
    }
}

impl fmt::Debug for ImageStreamCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let status = match state.outcome {
            None => "pending",
            Some(Outcome::Image(_)) => "image",
            Some(Outcome::Error(_)) => "failed",
        };
        f.debug_struct("ImageStreamCompleter")
            .field("status", &status)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
