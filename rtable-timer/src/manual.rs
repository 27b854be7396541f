//! Deterministic timer service driven by a virtual clock.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use rtable_core::error::{Result, RouteError};
use rtable_core::traits::{TimerCallback, TimerService};
use rtable_core::types::TimerHandle;

struct Scheduled {
    deadline: Duration,
    callback: TimerCallback,
}

struct ClockState {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<u64, Scheduled>,
    refuse: bool,
}

/// Timer service whose clock only moves when [`ManualTimer::advance`] is called.
///
/// Due timers fire in deadline order (ties in scheduling order). Callbacks
/// run on the caller's thread with no internal lock held, so a callback may
/// schedule or cancel other timers.
pub struct ManualTimer {
    state: Mutex<ClockState>,
}

impl ManualTimer {
    /// Creates a timer with the clock at zero.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClockState {
                now: Duration::ZERO,
                next_id: 1,
                pending: BTreeMap::new(),
                refuse: false,
            }),
        }
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Makes subsequent `schedule_once` calls fail until switched back.
    pub fn refuse_schedules(&self, refuse: bool) {
        self.state.lock().refuse = refuse;
    }

    /// Moves the clock forward, firing every timer that falls due.
    ///
    /// Returns the number of callbacks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now.saturating_add(by);
        let mut fired = 0;

        loop {
            let due = {
                let mut state = self.state.lock();
                let next = state
                    .pending
                    .iter()
                    .filter(|(_, s)| s.deadline <= target)
                    .min_by_key(|(id, s)| (s.deadline, **id))
                    .map(|(id, _)| *id);
                match next.and_then(|id| state.pending.remove(&id).map(|s| (id, s))) {
                    Some((id, scheduled)) => {
                        state.now = state.now.max(scheduled.deadline);
                        Some((id, scheduled.callback))
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            match due {
                Some((id, callback)) => {
                    trace!(timer = id, "Manual timer fired");
                    callback(TimerHandle::from_raw(id));
                    fired += 1;
                }
                None => break,
            }
        }

        fired
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerService for ManualTimer {
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> Result<TimerHandle> {
        let mut state = self.state.lock();
        if state.refuse {
            return Err(RouteError::TimerError("scheduling refused".into()));
        }
        let id = state.next_id;
        state.next_id += 1;
        let deadline = state
            .now
            .checked_add(delay)
            .ok_or_else(|| RouteError::TimerError(format!("delay {delay:?} overflows the clock")))?;
        state.pending.insert(id, Scheduled { deadline, callback });
        Ok(TimerHandle::from_raw(id))
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        self.state.lock().pending.remove(&handle.as_raw()).is_some()
    }

    fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        let state = self.state.lock();
        state
            .pending
            .get(&handle.as_raw())
            .map(|s| s.deadline.saturating_sub(state.now))
    }

    fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }
}
