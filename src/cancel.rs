use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Returned by [`Cancellation::check`] and [`Cancellation::sleep`] once the
/// run has been aborted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("resolution was cancelled")]
pub struct Cancelled;

#[derive(Debug, Default)]
struct State {
    is_cancelled: AtomicBool,
    lock: Mutex<()>,
    notify: Condvar,
}

/// Cooperative abort signal shared by every worker of a single run.
///
/// The coordinator trips it on the first fatal result. Workers blocked in
/// [`Edge::resolve`](crate::Edge::resolve) are never interrupted forcibly,
/// they are expected to observe the token.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<State>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token. Returns `true` only for the call that actually
    /// cancelled it.
    pub fn cancel(&self) -> bool {
        let first = self
            .0
            .is_cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        if first {
            // Taking the lock orders this wakeup after any sleeper that has
            // already checked the flag and is about to wait.
            let _guard = self.0.lock.lock().unwrap_or_else(|e| e.into_inner());
            self.0.notify.notify_all();
        }

        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Block for `duration`, waking up early if the token gets cancelled.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        let deadline = Instant::now() + duration;
        let mut guard = self.0.lock.lock().unwrap_or_else(|e| e.into_inner());

        loop {
            if self.is_cancelled() {
                return Err(Cancelled);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }

            guard = match self.0.notify.wait_timeout(guard, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}
