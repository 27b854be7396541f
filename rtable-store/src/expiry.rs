//! Binding between entry TTLs and the timer subsystem.
//!
//! Per entry: `Created -> Armed -> {Expired | Cancelled} -> Removed`.
//! The timer only ever holds an [`EntryHandle`] plus a weak reference to
//! the table, never the entry itself, so a late firing finds nothing to
//! act on instead of touching freed state.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use rtable_core::error::Result;
use rtable_core::traits::TimerService;
use rtable_core::types::{EntryHandle, RouteEntry, TimerHandle};

use crate::store::EntryStore;

/// Outcome of an expiration callback.
#[derive(Debug)]
pub enum Expiry {
    /// The entry was removed from the store.
    Evicted(RouteEntry),
    /// The firing no longer matched a live armed entry; nothing changed.
    Stale,
}

/// Arms, cancels and queries expiration timers for entries.
#[derive(Clone)]
pub struct ExpirationBinding {
    timer: Arc<dyn TimerService>,
}

impl ExpirationBinding {
    /// Binds to a timer subsystem.
    pub fn new(timer: Arc<dyn TimerService>) -> Self {
        Self { timer }
    }

    /// The underlying timer subsystem.
    pub fn timer(&self) -> &Arc<dyn TimerService> {
        &self.timer
    }

    /// Schedules `on_expire` to run once after `ttl` and records the timer
    /// on the entry.
    ///
    /// If the entry was already armed, the new timer is scheduled first and
    /// the old one cancelled after, so a scheduling failure leaves the old
    /// timer in force.
    pub fn arm<F>(&self, entry: &mut RouteEntry, ttl: Duration, on_expire: F) -> Result<TimerHandle>
    where
        F: FnOnce(TimerHandle) + Send + 'static,
    {
        let handle = self.timer.schedule_once(ttl, Box::new(on_expire))?;
        if let Some(previous) = entry.set_timer(handle) {
            self.timer.cancel(previous);
        }
        debug!(key = %entry.key(), timer = %handle, ?ttl, "Expiration armed");
        Ok(handle)
    }

    /// Revokes the entry's pending timer.
    ///
    /// Idempotent: an entry with no armed timer, or whose timer already
    /// fired, is left as is. Returns `true` only if a firing was prevented.
    pub fn cancel(&self, entry: &mut RouteEntry) -> bool {
        match entry.take_timer() {
            Some(handle) => {
                let cancelled = self.timer.cancel(handle);
                debug!(key = %entry.key(), timer = %handle, cancelled, "Expiration cancelled");
                cancelled
            }
            None => false,
        }
    }

    /// Time left before the entry expires, `None` if nothing is armed.
    pub fn remaining(&self, entry: &RouteEntry) -> Option<Duration> {
        entry.timer().and_then(|h| self.timer.remaining(h))
    }
}

/// Body of the expiration callback, run with the store lock held.
///
/// Acts only if `handle` still resolves and the entry's armed timer is the
/// one that fired. A firing that lost the race to a delete, a refresh or a
/// reinsertion of the same key is reported as [`Expiry::Stale`].
pub(crate) fn expire(store: &mut EntryStore, handle: EntryHandle, fired: TimerHandle) -> Expiry {
    let key = match store.get_mut(handle) {
        Some(entry) if entry.timer() == Some(fired) => {
            // The timer has fired and is gone; only the record remains.
            entry.take_timer();
            *entry.key()
        }
        _ => return Expiry::Stale,
    };

    match store.delete(&key) {
        Ok(entry) => Expiry::Evicted(entry),
        Err(_) => Expiry::Stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rtable_core::types::RouteKey;
    use rtable_timer::ManualTimer;

    fn entry(n: u8) -> RouteEntry {
        let key = RouteKey::new(Ipv4Addr::new(122, 1, 1, n), 32).unwrap();
        RouteEntry::new(key, None, None, Duration::from_secs(30)).unwrap()
    }

    fn binding() -> (Arc<ManualTimer>, ExpirationBinding) {
        let timer = Arc::new(ManualTimer::new());
        let binding = ExpirationBinding::new(timer.clone());
        (timer, binding)
    }

    #[test]
    fn test_arm_records_timer() {
        let (timer, binding) = binding();
        let mut e = entry(1);

        let h = binding.arm(&mut e, Duration::from_secs(30), |_| {}).unwrap();
        assert_eq!(e.timer(), Some(h));
        assert_eq!(binding.remaining(&e), Some(Duration::from_secs(30)));
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn test_rearm_replaces_previous_timer() {
        let (timer, binding) = binding();
        let fired = Arc::new(AtomicUsize::new(0));
        let mut e = entry(1);

        let f = fired.clone();
        let first = binding
            .arm(&mut e, Duration::from_secs(10), move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        timer.advance(Duration::from_secs(5));
        let second = binding.arm(&mut e, Duration::from_secs(10), |_| {}).unwrap();

        assert_ne!(first, second);
        assert_eq!(timer.pending(), 1);
        timer.advance(Duration::from_secs(6));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_rearm_keeps_old_timer() {
        let (timer, binding) = binding();
        let mut e = entry(1);

        let first = binding.arm(&mut e, Duration::from_secs(10), |_| {}).unwrap();
        timer.refuse_schedules(true);
        assert!(binding.arm(&mut e, Duration::from_secs(10), |_| {}).is_err());
        assert_eq!(e.timer(), Some(first));
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (timer, binding) = binding();
        let mut e = entry(1);

        assert!(!binding.cancel(&mut e));
        binding.arm(&mut e, Duration::from_secs(30), |_| {}).unwrap();
        assert!(binding.cancel(&mut e));
        assert!(!binding.cancel(&mut e));
        assert!(e.timer().is_none());
        assert_eq!(timer.pending(), 0);
        assert_eq!(binding.remaining(&e), None);
    }

    #[test]
    fn test_expire_evicts_matching_entry() {
        let mut store = EntryStore::with_capacity(4);
        let h = store.insert(entry(1)).unwrap();
        store.get_mut(h).unwrap().set_timer(TimerHandle::from_raw(7));

        match expire(&mut store, h, TimerHandle::from_raw(7)) {
            Expiry::Evicted(e) => assert!(e.timer().is_none()),
            Expiry::Stale => panic!("expected eviction"),
        }
        assert!(store.is_empty());
        assert!(store.check_links());
    }

    #[test]
    fn test_expire_ignores_superseded_timer() {
        let mut store = EntryStore::with_capacity(4);
        let h = store.insert(entry(1)).unwrap();
        store.get_mut(h).unwrap().set_timer(TimerHandle::from_raw(8));

        assert!(matches!(expire(&mut store, h, TimerHandle::from_raw(7)), Expiry::Stale));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_expire_ignores_stale_handle() {
        let mut store = EntryStore::with_capacity(4);
        let old = store.insert(entry(1)).unwrap();
        store.get_mut(old).unwrap().set_timer(TimerHandle::from_raw(7));
        store.delete(&RouteKey::new(Ipv4Addr::new(122, 1, 1, 1), 32).unwrap()).unwrap();

        // Same key reinserted into the same slot.
        let new = store.insert(entry(1)).unwrap();
        store.get_mut(new).unwrap().set_timer(TimerHandle::from_raw(7));

        assert!(matches!(expire(&mut store, old, TimerHandle::from_raw(7)), Expiry::Stale));
        assert_eq!(store.len(), 1);
        assert!(store.get(new).is_some());
    }
}
