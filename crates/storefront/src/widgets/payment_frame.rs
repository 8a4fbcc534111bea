//! Lifecycle of the embedded payment gateway page.
//!
//! ```text
//! Loading --on_load--> Ready --detector--> Completed
//!    |                   |
//!    +--on_error--> Error(msg)      refresh: any non-terminal state -> Loading
//! ```
//!
//! Two detectors run as background tasks while the frame is open:
//!
//! - a message listener fed through [`PaymentFrame::message_sender`]
//! - a poller that reads the frame's current URL through a [`FrameProbe`]
//!   every two seconds
//!
//! Whichever sees success first flips an atomic latch; the success callback
//! runs exactly once. Closing or dropping the frame aborts both tasks.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

const LOAD_FAILED: &str =
    "Failed to load payment gateway. Please try again or open in a new window.";

/// URL fragments that mean the gateway redirected back after a payment.
const SUCCESS_MARKERS: [&str; 4] = [
    "success=true",
    "status=success",
    "payment_status=success",
    "callback_success",
];

/// Why the frame's URL could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The frame shows another origin's page.
    #[error("frame URL is not readable across origins")]
    CrossOrigin,
    /// The frame is gone.
    #[error("frame is no longer attached")]
    Detached,
}

/// Read access to the URL the embedded frame is currently showing.
pub trait FrameProbe: Send + Sync + 'static {
    /// The frame's current URL.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when the URL cannot be read.
    fn current_url(&self) -> Result<String, ProbeError>;
}

/// A message posted by the page inside the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMessage {
    pub origin: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameState {
    Loading,
    Ready,
    Error(String),
    Completed,
}

#[derive(Debug, Clone)]
pub struct FrameOptions {
    pub poll_interval: Duration,
    /// When set, messages from any other origin are ignored.
    pub trusted_origin: Option<String>,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            trusted_origin: None,
        }
    }
}

/// Whether a posted message reports a completed payment.
#[must_use]
pub fn is_success_message(data: &Value) -> bool {
    let Some(obj) = data.as_object() else {
        return false;
    };
    obj.get("status").and_then(Value::as_str) == Some("success")
        || obj.get("payment_status").and_then(Value::as_str) == Some("success")
        || obj.get("success").and_then(Value::as_bool) == Some(true)
}

/// Whether a URL carries one of the gateway's success markers.
#[must_use]
pub fn is_success_url(url: &str) -> bool {
    SUCCESS_MARKERS.iter().any(|marker| url.contains(marker))
}

type SuccessCallback = Box<dyn Fn() + Send + Sync>;

struct Shared {
    state: Mutex<FrameState>,
    completed: AtomicBool,
    on_success: SuccessCallback,
}

impl Shared {
    fn set_state(&self, next: FrameState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Move to `Completed` and fire the callback, once.
    fn complete(&self, detector: &str) -> bool {
        if self.completed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.set_state(FrameState::Completed);
        info!(detector, "Payment completed");
        (self.on_success)();
        true
    }

    fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

/// An open payment frame and its detector tasks.
pub struct PaymentFrame {
    redirect_url: String,
    shared: Arc<Shared>,
    messages: mpsc::Sender<FrameMessage>,
    reloads: AtomicU32,
    fullscreen: bool,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for PaymentFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentFrame")
            .field("redirect_url", &self.redirect_url)
            .field("state", &self.state())
            .field("fullscreen", &self.fullscreen)
            .finish_non_exhaustive()
    }
}

impl PaymentFrame {
    /// Show `redirect_url` and start both detectors.
    ///
    /// Must be called inside a tokio runtime.
    pub fn open(
        redirect_url: impl Into<String>,
        probe: Arc<dyn FrameProbe>,
        on_success: impl Fn() + Send + Sync + 'static,
        options: FrameOptions,
    ) -> Self {
        let redirect_url = redirect_url.into();
        let shared = Arc::new(Shared {
            state: Mutex::new(FrameState::Loading),
            completed: AtomicBool::new(false),
            on_success: Box::new(on_success),
        });
        let (tx, rx) = mpsc::channel(16);

        let handles = vec![
            tokio::spawn(listen_for_messages(
                rx,
                Arc::clone(&shared),
                options.trusted_origin,
            )),
            tokio::spawn(poll_frame_url(
                probe,
                Arc::clone(&shared),
                options.poll_interval,
            )),
        ];
        debug!(%redirect_url, "Payment frame opened");

        Self {
            redirect_url,
            shared,
            messages: tx,
            reloads: AtomicU32::new(0),
            fullscreen: false,
            handles,
        }
    }

    /// Where the host posts messages received from the frame.
    #[must_use]
    pub fn message_sender(&self) -> mpsc::Sender<FrameMessage> {
        self.messages.clone()
    }

    #[must_use]
    pub fn state(&self) -> FrameState {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state() == FrameState::Loading
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.shared.is_completed()
    }

    #[must_use]
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// The frame finished loading.
    pub fn on_load(&self) {
        if !self.is_completed() {
            self.shared.set_state(FrameState::Ready);
        }
    }

    /// The frame failed to load.
    pub fn on_error(&self) {
        if !self.is_completed() {
            warn!(redirect_url = %self.redirect_url, "Payment frame failed to load");
            self.shared.set_state(FrameState::Error(LOAD_FAILED.to_owned()));
        }
    }

    /// Reload the same gateway page. Returns the URL to load.
    pub fn refresh(&self) -> &str {
        if !self.is_completed() {
            self.reloads.fetch_add(1, Ordering::Relaxed);
            self.shared.set_state(FrameState::Loading);
        }
        &self.redirect_url
    }

    #[must_use]
    pub fn reload_count(&self) -> u32 {
        self.reloads.load(Ordering::Relaxed)
    }

    /// The URL to open in a separate window. Does not change state.
    #[must_use]
    pub fn open_externally(&self) -> &str {
        &self.redirect_url
    }

    pub const fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.fullscreen
    }

    #[must_use]
    pub const fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Stop both detectors. Completion state is left as it is.
    pub fn teardown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    /// Dismiss the frame. Returns whether the payment had completed.
    #[must_use]
    pub fn close(mut self) -> bool {
        self.teardown();
        self.is_completed()
    }
}

impl Drop for PaymentFrame {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn listen_for_messages(
    mut rx: mpsc::Receiver<FrameMessage>,
    shared: Arc<Shared>,
    trusted_origin: Option<String>,
) {
    while let Some(message) = rx.recv().await {
        if let Some(trusted) = &trusted_origin
            && message.origin != *trusted
        {
            warn!(origin = %message.origin, "Ignoring frame message from untrusted origin");
            continue;
        }
        if is_success_message(&message.data) {
            shared.complete("message");
            return;
        }
        if shared.is_completed() {
            return;
        }
    }
}

async fn poll_frame_url(probe: Arc<dyn FrameProbe>, shared: Arc<Shared>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        if shared.is_completed() {
            return;
        }
        match probe.current_url() {
            Ok(url) if is_success_url(&url) => {
                shared.complete("url");
                return;
            }
            Ok(_) | Err(ProbeError::CrossOrigin) => {}
            Err(e) => debug!(error = %e, "Frame URL unavailable"),
        }
    }
}
