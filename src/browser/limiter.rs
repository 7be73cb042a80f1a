use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::AutomationError;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), AutomationError> {
        if self.is_cancelled() {
            Err(AutomationError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub(crate) const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Caps the number of live browser sessions. Callers past the cap block
/// until a permit is released or their request is cancelled.
#[derive(Debug)]
pub struct SessionLimiter {
    max: usize,
    in_use: Mutex<usize>,
    freed: Condvar,
}

impl SessionLimiter {
    /// A limit of zero is treated as one.
    pub fn new(max: usize) -> Self {
        SessionLimiter {
            max: max.max(1),
            in_use: Mutex::new(0),
            freed: Condvar::new(),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn available(&self) -> usize {
        self.max - *self.lock()
    }

    pub fn acquire(&self, cancel: &CancelToken) -> Result<SessionPermit<'_>, AutomationError> {
        let mut in_use = self.lock();
        loop {
            cancel.check()?;
            if *in_use < self.max {
                *in_use += 1;
                tracing::debug!(in_use = *in_use, max = self.max, "session slot acquired");
                return Ok(SessionPermit { limiter: self });
            }
            in_use = match self.freed.wait_timeout(in_use, CANCEL_POLL) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub fn try_acquire(&self) -> Option<SessionPermit<'_>> {
        let mut in_use = self.lock();
        if *in_use < self.max {
            *in_use += 1;
            Some(SessionPermit { limiter: self })
        } else {
            None
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_use.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self) {
        let mut in_use = self.lock();
        *in_use = in_use.saturating_sub(1);
        drop(in_use);
        self.freed.notify_one();
    }
}

/// Held for the lifetime of one browser session.
#[derive(Debug)]
pub struct SessionPermit<'a> {
    limiter: &'a SessionLimiter,
}

impl Drop for SessionPermit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
