//! The routing table: an entry store plus its expiration binding.
//!
//! All mutation, including the expiration callback, goes through one
//! mutex scoped to the whole table. Whichever of an explicit delete and
//! a timer firing takes the lock first wins; the loser sees `NotFound` or
//! a stale firing and changes nothing.

use std::net::Ipv4Addr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use rtable_core::config::TableConfig;
use rtable_core::error::{Result, RouteError};
use rtable_core::traits::TimerService;
use rtable_core::types::{EntryHandle, RouteEntry, RouteKey, RouteSnapshot, TimerHandle};

use crate::expiry::{self, ExpirationBinding, Expiry};
use crate::store::EntryStore;

/// Table counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    /// Entries currently live
    pub live_entries: usize,
    /// Maximum number of live entries
    pub capacity: usize,
    /// Successful inserts
    pub inserted: u64,
    /// Explicit deletes (including `clear`)
    pub deleted: u64,
    /// Entries evicted by their TTL
    pub expired: u64,
    /// Timer firings that found their entry already gone or re-armed
    pub stale_expirations: u64,
}

struct Inner {
    store: EntryStore,
    stats: TableStats,
}

/// Routing table with TTL-driven eviction.
///
/// Owned by whatever composes the application; there is no global
/// instance. Timer callbacks reach the table through a weak reference, so
/// dropping the table (which also cancels every pending timer) is safe at
/// any time.
pub struct RouteTable {
    inner: Arc<Mutex<Inner>>,
    expiry: ExpirationBinding,
    config: TableConfig,
}

impl RouteTable {
    /// Creates a table with the default configuration.
    pub fn new(timer: Arc<dyn TimerService>) -> Self {
        let config = TableConfig::default();
        Self::build(config, timer)
    }

    /// Creates a table with a custom configuration.
    pub fn with_config(config: TableConfig, timer: Arc<dyn TimerService>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, timer))
    }

    fn build(config: TableConfig, timer: Arc<dyn TimerService>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                store: EntryStore::with_capacity(config.max_entries),
                stats: TableStats {
                    capacity: config.max_entries,
                    ..TableStats::default()
                },
            })),
            expiry: ExpirationBinding::new(timer),
            config,
        }
    }

    /// The table's configuration.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Inserts a route with the configured default TTL.
    pub fn insert(
        &self,
        key: RouteKey,
        gateway: Option<Ipv4Addr>,
        oif: Option<String>,
    ) -> Result<EntryHandle> {
        self.insert_with_ttl(key, gateway, oif, self.config.default_ttl())
    }

    /// Inserts a route that expires after `ttl` unless refreshed or deleted.
    ///
    /// Rejects a key that is already live with `DuplicateKey`. If the timer
    /// cannot be armed the entry is unlinked again and `AllocationFailure`
    /// is returned; the table is left as it was.
    #[instrument(skip(self, gateway, oif), fields(key = %key))]
    pub fn insert_with_ttl(
        &self,
        key: RouteKey,
        gateway: Option<Ipv4Addr>,
        oif: Option<String>,
        ttl: Duration,
    ) -> Result<EntryHandle> {
        if ttl.is_zero() {
            return Err(RouteError::InvalidRoute("TTL must be non-zero".into()));
        }
        let entry = RouteEntry::new(key, gateway, oif, ttl)?;

        let mut inner = self.inner.lock();
        let handle = inner.store.insert(entry)?;

        let armed = match inner.store.get_mut(handle) {
            Some(entry) => self.expiry.arm(entry, ttl, self.on_expire(handle)),
            None => Err(RouteError::AllocationFailure("entry vanished while arming".into())),
        };
        if let Err(e) = armed {
            inner.store.remove(handle);
            return Err(RouteError::AllocationFailure(format!(
                "could not arm expiration for {key}: {e}"
            )));
        }

        inner.stats.inserted += 1;
        inner.stats.live_entries = inner.store.len();
        debug!(%handle, ?ttl, "Route inserted");
        Ok(handle)
    }

    /// Deletes a route, cancelling its pending expiration first.
    #[instrument(skip(self), fields(key = %key))]
    pub fn delete(&self, key: &RouteKey) -> Result<()> {
        let mut inner = self.inner.lock();
        let handle = inner.store.find(key).ok_or(RouteError::NotFound(*key))?;
        if let Some(entry) = inner.store.get_mut(handle) {
            self.expiry.cancel(entry);
        }
        inner.store.remove(handle);

        inner.stats.deleted += 1;
        inner.stats.live_entries = inner.store.len();
        debug!("Route deleted");
        Ok(())
    }

    /// Replaces gateway and interface label in place. TTL is unaffected.
    #[instrument(skip(self, gateway, oif), fields(key = %key))]
    pub fn update(
        &self,
        key: &RouteKey,
        gateway: Option<Ipv4Addr>,
        oif: Option<String>,
    ) -> Result<()> {
        self.inner.lock().store.update(key, gateway, oif)?;
        debug!("Route updated");
        Ok(())
    }

    /// Restarts the route's TTL from now.
    #[instrument(skip(self), fields(key = %key))]
    pub fn refresh(&self, key: &RouteKey) -> Result<()> {
        let mut inner = self.inner.lock();
        let handle = inner.store.find(key).ok_or(RouteError::NotFound(*key))?;
        let entry = inner.store.get_mut(handle).ok_or(RouteError::NotFound(*key))?;
        let ttl = entry.ttl;
        self.expiry.arm(entry, ttl, self.on_expire(handle))?;
        debug!(?ttl, "Route refreshed");
        Ok(())
    }

    /// Exact-key lookup.
    pub fn lookup(&self, key: &RouteKey) -> Option<RouteSnapshot> {
        let inner = self.inner.lock();
        let handle = inner.store.find(key)?;
        inner
            .store
            .get(handle)
            .map(|e| e.snapshot(self.expiry.remaining(e)))
    }

    /// Returns true if a route with `key` is live.
    pub fn contains(&self, key: &RouteKey) -> bool {
        self.inner.lock().store.find(key).is_some()
    }

    /// Time left before the route with `key` expires.
    pub fn remaining(&self, key: &RouteKey) -> Option<Duration> {
        let inner = self.inner.lock();
        let handle = inner.store.find(key)?;
        inner.store.get(handle).and_then(|e| self.expiry.remaining(e))
    }

    /// Snapshot of every live route, most recently inserted first.
    ///
    /// The copy is taken under the table lock, so it is consistent and may
    /// be consumed while the table keeps changing.
    pub fn enumerate(&self) -> Vec<RouteSnapshot> {
        let inner = self.inner.lock();
        inner
            .store
            .iter()
            .map(|(_, e)| e.snapshot(self.expiry.remaining(e)))
            .collect()
    }

    /// Cancels every pending expiration and removes every route.
    ///
    /// Returns the number of routes removed.
    #[instrument(skip(self))]
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let expiry = &self.expiry;
        inner.store.for_each_mut(|_, entry| {
            expiry.cancel(entry);
        });
        let removed = inner.store.drain().len();

        inner.stats.deleted += removed as u64;
        inner.stats.live_entries = 0;
        if removed > 0 {
            debug!(removed, "Table cleared");
        }
        removed
    }

    /// Number of live routes.
    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    /// Returns true if the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> TableStats {
        self.inner.lock().stats.clone()
    }

    /// Verifies the list invariants of the underlying store.
    pub fn check_links(&self) -> bool {
        self.inner.lock().store.check_links()
    }

    /// Builds the callback handed to the timer for the entry at `handle`.
    fn on_expire(&self, handle: EntryHandle) -> impl FnOnce(TimerHandle) + Send + 'static {
        let table = Arc::downgrade(&self.inner);
        move |fired| expire_entry(&table, handle, fired)
    }
}

impl Drop for RouteTable {
    fn drop(&mut self) {
        self.clear();
    }
}

fn expire_entry(table: &Weak<Mutex<Inner>>, handle: EntryHandle, fired: TimerHandle) {
    let Some(table) = table.upgrade() else {
        return;
    };
    let mut inner = table.lock();
    match expiry::expire(&mut inner.store, handle, fired) {
        Expiry::Evicted(entry) => {
            inner.stats.expired += 1;
            inner.stats.live_entries = inner.store.len();
            info!(key = %entry.key(), ttl = ?entry.ttl, "Route expired");
        }
        Expiry::Stale => {
            inner.stats.stale_expirations += 1;
            warn!(%handle, timer = %fired, "Ignoring expiration for a route that is gone or re-armed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rtable_timer::ManualTimer;

    fn key(n: u8) -> RouteKey {
        RouteKey::new(Ipv4Addr::new(122, 1, 1, n), 32).unwrap()
    }

    fn gw(n: u8) -> Option<Ipv4Addr> {
        Some(Ipv4Addr::new(10, 1, 1, n))
    }

    fn table() -> (Arc<ManualTimer>, RouteTable) {
        let timer = Arc::new(ManualTimer::new());
        let table = RouteTable::new(timer.clone());
        (timer, table)
    }

    fn seed(table: &RouteTable, n: u8) {
        table.insert(key(n), gw(n), Some(format!("eth{}", n - 1))).unwrap();
    }

    #[test]
    fn test_insert_and_enumerate() {
        let (_, table) = table();
        seed(&table, 1);

        let routes = table.enumerate();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].key(), key(1));
        assert_eq!(routes[0].gateway, gw(1));
        assert_eq!(routes[0].oif.as_deref(), Some("eth0"));
        assert_eq!(routes[0].ttl_seconds, 30);
        assert_eq!(routes[0].remaining_ms, 30_000);
    }

    #[test]
    fn test_remaining_decreases_then_entry_expires() {
        let (timer, table) = table();
        seed(&table, 1);

        timer.advance(Duration::from_secs(10));
        assert_eq!(table.enumerate()[0].remaining_ms, 20_000);
        timer.advance(Duration::from_secs(19));
        assert_eq!(table.enumerate()[0].remaining_ms, 1_000);

        timer.advance(Duration::from_secs(1));
        assert!(table.enumerate().is_empty());
        assert!(matches!(table.delete(&key(1)), Err(RouteError::NotFound(_))));
        assert_eq!(table.stats().expired, 1);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let (timer, table) = table();
        seed(&table, 1);

        let err = table.insert(key(1), gw(9), None).unwrap_err();
        assert!(matches!(err, RouteError::DuplicateKey(_)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&key(1)).unwrap().gateway, gw(1));
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn test_delete_cancels_timer() {
        let (timer, table) = table();
        seed(&table, 1);

        table.delete(&key(1)).unwrap();
        assert_eq!(timer.pending(), 0);

        timer.advance(Duration::from_secs(60));
        let stats = table.stats();
        assert_eq!(stats.expired, 0);
        assert_eq!(stats.stale_expirations, 0);
        assert_eq!(stats.deleted, 1);
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let (_, table) = table();
        assert!(matches!(table.delete(&key(1)), Err(RouteError::NotFound(_))));
    }

    #[test]
    fn test_reinsert_after_delete_gets_fresh_ttl() {
        let (timer, table) = table();
        seed(&table, 1);
        timer.advance(Duration::from_secs(20));

        table.delete(&key(1)).unwrap();
        seed(&table, 1);
        timer.advance(Duration::from_secs(20));

        assert!(table.contains(&key(1)));
        assert_eq!(table.remaining(&key(1)), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_update_keeps_ttl_and_position() {
        let (timer, table) = table();
        seed(&table, 1);
        seed(&table, 2);
        timer.advance(Duration::from_secs(5));

        table
            .update(&key(1), Some(Ipv4Addr::new(10, 9, 9, 9)), Some("wlan0".into()))
            .unwrap();

        let routes = table.enumerate();
        assert_eq!(routes[1].key(), key(1));
        assert_eq!(routes[1].gateway, Some(Ipv4Addr::new(10, 9, 9, 9)));
        assert_eq!(routes[1].oif.as_deref(), Some("wlan0"));
        assert_eq!(routes[1].remaining_ms, 25_000);

        assert!(matches!(
            table.update(&key(7), None, None),
            Err(RouteError::NotFound(_))
        ));
    }

    #[test]
    fn test_refresh_restarts_ttl() {
        let (timer, table) = table();
        seed(&table, 1);

        timer.advance(Duration::from_secs(25));
        table.refresh(&key(1)).unwrap();
        assert_eq!(timer.pending(), 1);

        timer.advance(Duration::from_secs(25));
        assert!(table.contains(&key(1)));

        timer.advance(Duration::from_secs(5));
        assert!(!table.contains(&key(1)));
        assert_eq!(table.stats().stale_expirations, 0);
        assert!(matches!(table.refresh(&key(1)), Err(RouteError::NotFound(_))));
    }

    #[test]
    fn test_custom_ttl() {
        let (timer, table) = table();
        table
            .insert_with_ttl(key(1), None, None, Duration::from_secs(2))
            .unwrap();
        seed(&table, 2);

        timer.advance(Duration::from_secs(2));
        let routes = table.enumerate();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].key(), key(2));

        assert!(table
            .insert_with_ttl(key(3), None, None, Duration::ZERO)
            .unwrap_err()
            .is_validation_error());
    }

    #[test]
    fn test_timer_refusal_rolls_back_insert() {
        let (timer, table) = table();
        seed(&table, 1);

        timer.refuse_schedules(true);
        let err = table.insert(key(2), gw(2), None).unwrap_err();
        assert!(matches!(err, RouteError::AllocationFailure(_)));
        assert!(err.is_recoverable());
        assert_eq!(table.len(), 1);
        assert!(!table.contains(&key(2)));
        assert!(table.check_links());

        timer.refuse_schedules(false);
        seed(&table, 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_unschedulable_ttl_rolls_back_insert() {
        let (timer, table) = table();
        seed(&table, 1);
        timer.advance(Duration::from_secs(1));

        let err = table
            .insert_with_ttl(key(2), gw(2), None, Duration::MAX)
            .unwrap_err();
        assert!(matches!(err, RouteError::AllocationFailure(_)));
        assert!(!table.contains(&key(2)));
        assert_eq!(table.len(), 1);
        assert_eq!(timer.pending(), 1);
        assert!(table.check_links());
    }

    #[test]
    fn test_full_table_is_allocation_failure() {
        let timer = Arc::new(ManualTimer::new());
        let config = TableConfig::default().with_max_entries(2);
        let table = RouteTable::with_config(config, timer.clone()).unwrap();

        seed(&table, 1);
        seed(&table, 2);
        assert!(matches!(
            table.insert(key(3), None, None),
            Err(RouteError::AllocationFailure(_))
        ));
        assert_eq!(timer.pending(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let timer = Arc::new(ManualTimer::new());
        let config = TableConfig::default().with_ttl_seconds(0);
        assert!(RouteTable::with_config(config, timer).is_err());
    }

    #[test]
    fn test_clear_cancels_everything() {
        let (timer, table) = table();
        for n in 1..=5 {
            seed(&table, n);
        }

        assert_eq!(table.clear(), 5);
        assert!(table.is_empty());
        assert_eq!(timer.pending(), 0);

        timer.advance(Duration::from_secs(60));
        assert_eq!(table.stats().expired, 0);
        assert_eq!(table.clear(), 0);
    }

    #[test]
    fn test_drop_cancels_timers() {
        let timer = Arc::new(ManualTimer::new());
        {
            let table = RouteTable::new(timer.clone());
            table.insert(key(1), None, None).unwrap();
            assert_eq!(timer.pending(), 1);
        }
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn test_firing_after_delete_is_stale() {
        // A firing already dispatched when the delete takes the lock.
        let (_, table) = table();
        let handle = table.insert(key(1), None, None).unwrap();
        let fired = table.inner.lock().store.get(handle).unwrap().timer().unwrap();

        table.delete(&key(1)).unwrap();
        expire_entry(&Arc::downgrade(&table.inner), handle, fired);

        let stats = table.stats();
        assert_eq!(stats.expired, 0);
        assert_eq!(stats.stale_expirations, 1);
        assert!(table.check_links());
    }

    #[test]
    fn test_firing_after_table_dropped_is_ignored() {
        let (_, table) = table();
        let handle = table.insert(key(1), None, None).unwrap();
        let weak = Arc::downgrade(&table.inner);
        drop(table);
        expire_entry(&weak, handle, TimerHandle::from_raw(1));
    }
}
