//! Transient notifications ("toasts").
//!
//! One surface, one toast at a time. Presenting a new toast replaces the text
//! and restarts the auto-hide timer; the previous timer is aborted, never left
//! to fire alongside the new one.

pub mod category;

pub use category::ToastCategory;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// How long a toast stays visible.
pub const TOAST_DURATION: Duration = Duration::from_millis(3200);

/// The UI element toasts render into.
pub trait NotificationSink: Send + Sync {
    /// Set text and category class and make the surface visible.
    fn show(&self, message: &str, category: ToastCategory);
    fn hide(&self);
}

/// Surface for terminal front ends. A printed line cannot be retracted, so
/// hiding only ends the toast's lifetime.
pub struct StderrSink;

impl NotificationSink for StderrSink {
    fn show(&self, message: &str, category: ToastCategory) {
        eprintln!("[{}] {}", category, message);
    }

    fn hide(&self) {
        log::debug!("Toast expired");
    }
}

#[derive(Default)]
struct ToastState {
    message: String,
    category: ToastCategory,
    visible: bool,
    /// Bumped on every present; a hide timer only acts on its own toast.
    generation: u64,
    hide_timer: Option<JoinHandle<()>>,
}

/// Notification presenter owning the single toast surface.
pub struct Toaster {
    sink: Option<Arc<dyn NotificationSink>>,
    duration: Duration,
    state: Arc<Mutex<ToastState>>,
}

impl Toaster {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink: Some(sink),
            duration: TOAST_DURATION,
            state: Arc::new(Mutex::new(ToastState::default())),
        }
    }

    /// Presenter without a surface; every call is a no-op.
    pub fn disabled() -> Self {
        Self {
            sink: None,
            duration: TOAST_DURATION,
            state: Arc::new(Mutex::new(ToastState::default())),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Show `message` and (re)schedule the auto-hide. Never fails.
    ///
    /// The sink is called with the state unlocked, so a sink may itself
    /// present through this toaster; the newest toast then wins.
    pub fn present(&self, message: &str, category: ToastCategory) {
        let Some(sink) = &self.sink else {
            return;
        };
        let generation = {
            let Ok(mut state) = self.state.lock() else {
                log::warn!("Toast state poisoned, dropping notification");
                return;
            };
            if let Some(timer) = state.hide_timer.take() {
                timer.abort();
            }
            state.generation += 1;
            state.message = message.to_string();
            state.category = category;
            state.visible = true;
            state.generation
        };

        sink.show(message, category);
        self.schedule_hide(sink, generation);
    }

    fn schedule_hide(&self, sink: &Arc<dyn NotificationSink>, generation: u64) {
        let Ok(handle) = Handle::try_current() else {
            log::debug!("No async runtime, toast will not auto-hide");
            return;
        };
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.generation != generation {
            // Superseded while the sink was showing it.
            return;
        }

        let duration = self.duration;
        let sink = Arc::clone(sink);
        let shared = Arc::clone(&self.state);
        state.hide_timer = Some(handle.spawn(async move {
            tokio::time::sleep(duration).await;
            let hide = match shared.lock() {
                Ok(mut state) if state.generation == generation => {
                    state.visible = false;
                    state.hide_timer = None;
                    true
                }
                _ => false,
            };
            if hide {
                sink.hide();
            }
        }));
    }

    pub fn success(&self, message: &str) {
        self.present(message, ToastCategory::Success);
    }

    pub fn error(&self, message: &str) {
        self.present(message, ToastCategory::Error);
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().map(|s| s.visible).unwrap_or(false)
    }

    /// Text and category of the visible toast.
    pub fn current(&self) -> Option<(String, ToastCategory)> {
        let state = self.state.lock().ok()?;
        state
            .visible
            .then(|| (state.message.clone(), state.category))
    }
}
