//! Debounced calls: coalesce bursts of calls into one delayed call.
//!
//! Each call aborts the pending timer and schedules a fresh one carrying the
//! latest arguments, so `f` runs at most once per quiet period of `delay`.
//! Superseded arguments are dropped.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

struct Inner<A> {
    f: Box<dyn Fn(A) + Send + Sync>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// Debounced wrapper around a function of `A`.
///
/// Clones share the same pending timer.
pub struct Debounced<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for Debounced<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Wrap `f` so that it runs `delay` after the last of a burst of calls.
pub fn debounce<A, F>(f: F, delay: Duration) -> Debounced<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Debounced {
        inner: Arc::new(Inner {
            f: Box::new(f),
            delay,
            pending: Mutex::new(None),
        }),
    }
}

impl<A: Send + 'static> Debounced<A> {
    /// Cancel any pending call and schedule `f(args)` after the delay.
    ///
    /// Must run inside a Tokio runtime; without one the call is dropped.
    pub fn call(&self, args: A) {
        let Ok(mut pending) = self.inner.pending.lock() else {
            log::warn!("Debounce state poisoned, dropping call");
            return;
        };
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        let Ok(handle) = Handle::try_current() else {
            log::warn!("No async runtime, debounced call dropped");
            return;
        };
        let inner = Arc::clone(&self.inner);
        *pending = Some(handle.spawn(async move {
            tokio::time::sleep(inner.delay).await;
            (inner.f)(args);
        }));
    }

    /// Drop the pending call, if any.
    pub fn cancel(&self) {
        if let Ok(mut pending) = self.inner.pending.lock() {
            if let Some(timer) = pending.take() {
                timer.abort();
            }
        }
    }

    /// Whether a call is scheduled and has not run yet.
    pub fn is_pending(&self) -> bool {
        self.inner
            .pending
            .lock()
            .map(|p| p.as_ref().is_some_and(|t| !t.is_finished()))
            .unwrap_or(false)
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}
