//! Cancellation, deadline and correlation data for one repository call.
//!
//! # Invariants
//! - Clones share one cancellation flag; cancelling any clone cancels all.
//! - A done context fails before the statement runs; a context that becomes
//!   done mid-statement interrupts SQLite through a progress handler.

use crate::monitoring::MonitoringContext;
use crate::repo::{RepoError, RepoResult};
use std::panic::RefUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    monitoring: Option<Arc<MonitoringContext>>,
}

impl CallContext {
    /// Context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Attaches correlation data; repository calls then log each execution.
    pub fn with_monitoring(mut self, monitoring: MonitoringContext) -> Self {
        self.monitoring = Some(Arc::new(monitoring));
        self
    }

    pub fn monitoring(&self) -> Option<&MonitoringContext> {
        self.monitoring.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True once cancelled or past the deadline.
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fails with `Cancelled` or `DeadlineExceeded` when the call should not run.
    pub fn check(&self) -> RepoResult<()> {
        if self.is_cancelled() {
            return Err(RepoError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(RepoError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Closure for `Connection::progress_handler`; returns true to interrupt.
    pub(crate) fn interrupt_probe(&self) -> impl FnMut() -> bool + Send + RefUnwindSafe + 'static {
        let cancelled = Arc::clone(&self.cancelled);
        let deadline = self.deadline;
        move || {
            cancelled.load(Ordering::SeqCst)
                || deadline.is_some_and(|deadline| Instant::now() >= deadline)
        }
    }
}
