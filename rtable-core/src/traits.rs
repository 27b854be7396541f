//! Common traits for rtable.
//!
//! The table does not own a clock. Expiration is delegated to a timer
//! subsystem behind [`TimerService`], so production code can run on tokio
//! while tests drive a virtual clock.

use std::time::Duration;

use crate::error::Result;
use crate::types::TimerHandle;

// ═══════════════════════════════════════════════════════════════════════════════
// TIMER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// One-shot callback run when a timer fires.
pub type TimerCallback = Box<dyn FnOnce(TimerHandle) + Send + 'static>;

/// Interface of the timer subsystem that drives expiration.
///
/// Contract relied upon by the table:
/// - a timer whose `cancel` returned `true` never invokes its callback;
/// - once a timer has fired or been cancelled its handle is dead and is
///   never handed out again;
/// - callbacks are never invoked from inside `schedule_once` or `cancel`.
pub trait TimerService: Send + Sync {
    /// Schedules `callback` to run once after `delay`.
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> Result<TimerHandle>;

    /// Revokes a pending timer.
    ///
    /// Returns `true` if this call prevented the callback from running and
    /// `false` if the timer had already fired, was already cancelled, or is
    /// unknown.
    fn cancel(&self, handle: TimerHandle) -> bool;

    /// Time left before a pending timer fires, `None` once it is dead.
    fn remaining(&self, handle: TimerHandle) -> Option<Duration>;

    /// Number of timers still pending.
    fn pending(&self) -> usize;
}
