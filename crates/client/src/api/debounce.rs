//! Trailing-edge debounce for search triggers.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default quiet period before a trigger fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

type StopHook = Box<dyn Fn() + Send + Sync>;

struct Pending {
    handle: JoinHandle<()>,
    started: Arc<AtomicBool>,
}

/// Runs the most recent trigger once `delay` has passed without another one.
///
/// Re-triggering, [`Debouncer::cancel`] or dropping the debouncer discards a
/// trigger still in its quiet period. A trigger that has already started is
/// stopped through the hook set with [`Debouncer::on_stop`] before its task is
/// aborted, so the work it drives can settle its own state.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<Pending>>,
    on_stop: Option<StopHook>,
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: Mutex::new(None), on_stop: None }
    }

    /// Run `hook` whenever a trigger that has already started gets stopped.
    ///
    /// For searches this is [`SearchClient::cancel`](super::SearchClient::cancel).
    pub fn on_stop(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_stop = Some(Box::new(hook));
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `task`, replacing any pending one. Must be called inside a tokio runtime.
    pub fn trigger<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let started = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&started);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::SeqCst);
            task.await;
        });

        let previous = self.pending.lock().unwrap_or_else(PoisonError::into_inner).replace(Pending { handle, started });
        if let Some(previous) = previous {
            self.stop(previous);
        }
    }

    pub fn cancel(&self) {
        let previous = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(previous) = previous {
            self.stop(previous);
        }
    }

    /// Whether a trigger is scheduled or still running.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }

    fn stop(&self, pending: Pending) {
        let running = pending.started.load(Ordering::SeqCst) && !pending.handle.is_finished();
        if let Some(hook) = self.on_stop.as_ref().filter(|_| running) {
            hook();
        }
        pending.handle.abort();
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
