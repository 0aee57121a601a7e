//! Interruptible exclusive lock
//!
//! Every device guards its state with one [`parking_lot::Mutex`]. Waiting
//! for it is a suspension point that an [`Interrupt`] can cancel: the
//! waiter re-checks its token every poll interval and gives up with
//! [`ScullError::Interrupted`] once the token is raised. Giving up happens
//! strictly before the lock is held, so no state is touched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{Result, ScullError};

/// Cancellation token shared between a waiter and whoever may interrupt it
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    /// Create a token in the lowered state
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every waiter holding this token to give up
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Lower the token so later waits proceed normally
    pub fn clear(&self) {
        self.raised.store(false, Ordering::SeqCst);
    }

    /// Whether the token is raised
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// Mutex whose acquisition can be cancelled through an [`Interrupt`]
#[derive(Debug)]
pub struct InterruptibleMutex<T> {
    inner: Mutex<T>,
    poll_interval: Duration,
}

impl<T> InterruptibleMutex<T> {
    pub fn new(value: T, poll_interval: Duration) -> Self {
        Self {
            inner: Mutex::new(value),
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    /// Acquire the lock, blocking until it is free or `interrupt` is raised
    ///
    /// An uncontended lock is taken without looking at the token.
    pub fn lock(&self, interrupt: &Interrupt) -> Result<MutexGuard<'_, T>> {
        if let Some(guard) = self.inner.try_lock() {
            return Ok(guard);
        }

        loop {
            if interrupt.is_raised() {
                tracing::trace!("lock wait interrupted");
                return Err(ScullError::Interrupted);
            }
            if let Some(guard) = self.inner.try_lock_for(self.poll_interval) {
                return Ok(guard);
            }
        }
    }

    /// Acquire the lock, ignoring interrupts (teardown path)
    pub fn lock_uninterruptible(&self) -> MutexGuard<'_, T> {
        self.inner.lock()
    }
}
