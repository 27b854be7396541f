//! Timer service backed by the tokio runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use rtable_core::error::{Result, RouteError};
use rtable_core::traits::{TimerCallback, TimerService};
use rtable_core::types::TimerHandle;

/// A timer that has been scheduled and has neither fired nor been cancelled.
struct Pending {
    deadline: Instant,
    /// Filled in right after spawn; `None` only during scheduling
    abort: Option<AbortHandle>,
}

/// Timer service running each timer as a tokio task.
///
/// A timer task sleeps until its deadline, then removes its own entry from
/// the pending map and runs the callback only if that removal succeeded.
/// `cancel` removes the same entry and aborts the task, so exactly one of
/// the two wins.
pub struct TokioTimer {
    runtime: Handle,
    pending: Arc<DashMap<u64, Pending>>,
    next_id: AtomicU64,
}

impl TokioTimer {
    /// Creates a timer bound to the runtime of the calling context.
    ///
    /// Fails with `TimerError` when called outside a tokio runtime.
    pub fn current() -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| RouteError::TimerError(format!("no tokio runtime: {e}")))?;
        Ok(Self::with_handle(runtime))
    }

    /// Creates a timer that spawns onto the given runtime.
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl TimerService for TokioTimer {
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> Result<TimerHandle> {
        let _guard = self.runtime.enter();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now()
            .checked_add(delay)
            .ok_or_else(|| RouteError::TimerError(format!("delay {delay:?} overflows the clock")))?;

        // Register before spawning: a zero-delay task may run before spawn returns.
        self.pending.insert(id, Pending { deadline, abort: None });

        let pending = Arc::clone(&self.pending);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if pending.remove(&id).is_some() {
                trace!(timer = id, "Timer fired");
                callback(TimerHandle::from_raw(id));
            }
        });

        if let Some(mut entry) = self.pending.get_mut(&id) {
            entry.abort = Some(task.abort_handle());
        }

        debug!(timer = id, ?delay, "Timer scheduled");
        Ok(TimerHandle::from_raw(id))
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        match self.pending.remove(&handle.as_raw()) {
            Some((id, pending)) => {
                if let Some(abort) = pending.abort {
                    abort.abort();
                }
                debug!(timer = id, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        let _guard = self.runtime.enter();
        self.pending
            .get(&handle.as_raw())
            .map(|p| p.deadline.saturating_duration_since(Instant::now()))
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for entry in self.pending.iter() {
            if let Some(abort) = &entry.abort {
                abort.abort();
            }
        }
        self.pending.clear();
    }
}
