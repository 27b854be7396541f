//! Arena-backed doubly-linked list of route entries.
//!
//! Entries live in a vector of slots and are linked through `prev`/`next`
//! slot indices instead of pointers. New entries are prepended. Removing
//! an entry given its handle is O(1); lookup by key is a linear scan from
//! the head, which keeps enumeration order equal to recency of insertion.

use std::net::Ipv4Addr;

use tracing::debug;

use rtable_core::error::{Result, RouteError};
use rtable_core::types::{EntryHandle, RouteEntry, RouteKey};

/// A linked entry.
#[derive(Debug)]
struct Node {
    entry: RouteEntry,
    prev: Option<u32>,
    next: Option<u32>,
}

/// A slot in the arena. `generation` advances every time the slot is freed.
#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Owner of every live route entry.
///
/// Keys are unique: inserting a key that is already live is rejected with
/// `DuplicateKey`. Handles are generational, so a handle kept past the
/// removal of its entry resolves to `None` rather than to whatever entry
/// later reuses the slot.
#[derive(Debug)]
pub struct EntryStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
    capacity: usize,
}

impl EntryStore {
    /// Creates an empty store holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            capacity: capacity.min(u32::MAX as usize),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of live entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handle of the most recently inserted entry.
    pub fn head(&self) -> Option<EntryHandle> {
        self.head.map(|i| self.handle_at(i))
    }

    /// Links `entry` in at the head.
    ///
    /// Fails with `DuplicateKey` if the key is live and with
    /// `AllocationFailure` if the store is full. On failure nothing changes.
    pub fn insert(&mut self, entry: RouteEntry) -> Result<EntryHandle> {
        let key = *entry.key();
        if self.find(&key).is_some() {
            return Err(RouteError::DuplicateKey(key));
        }
        if self.len >= self.capacity {
            return Err(RouteError::AllocationFailure(format!(
                "table full ({} entries)",
                self.capacity
            )));
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot { generation: 0, node: None });
                (self.slots.len() - 1) as u32
            }
        };

        let old_head = self.head;
        self.slots[index as usize].node = Some(Node {
            entry,
            prev: None,
            next: old_head,
        });
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.len += 1;

        let handle = self.handle_at(index);
        debug!(%key, %handle, "Entry linked");
        Ok(handle)
    }

    /// Finds the live entry with `key`.
    pub fn find(&self, key: &RouteKey) -> Option<EntryHandle> {
        self.indices()
            .find(|&i| self.node(i).entry.key() == key)
            .map(|i| self.handle_at(i))
    }

    /// Resolves a handle, `None` if its entry is gone.
    pub fn get(&self, handle: EntryHandle) -> Option<&RouteEntry> {
        self.slot_of(handle)
            .and_then(|s| s.node.as_ref())
            .map(|n| &n.entry)
    }

    /// Resolves a handle mutably, `None` if its entry is gone.
    pub fn get_mut(&mut self, handle: EntryHandle) -> Option<&mut RouteEntry> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.node.as_mut().map(|n| &mut n.entry)
    }

    /// Unlinks and returns the entry behind `handle`.
    ///
    /// The slot's generation advances, invalidating every copy of `handle`.
    /// Returns `None` for a stale handle.
    pub fn remove(&mut self, handle: EntryHandle) -> Option<RouteEntry> {
        self.get(handle)?;
        let index = handle.index();
        let slot = &mut self.slots[index as usize];
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);

        match (node.prev, node.next) {
            // Only entry.
            (None, None) => {
                self.head = None;
                self.tail = None;
            }
            // Head: successor becomes the new head.
            (None, Some(next)) => {
                self.node_mut(next).prev = None;
                self.head = Some(next);
            }
            // Tail: predecessor becomes the new tail.
            (Some(prev), None) => {
                self.node_mut(prev).next = None;
                self.tail = Some(prev);
            }
            // Interior: splice around it.
            (Some(prev), Some(next)) => {
                self.node_mut(prev).next = Some(next);
                self.node_mut(next).prev = Some(prev);
            }
        }

        self.free.push(index);
        self.len -= 1;
        debug!(key = %node.entry.key(), %handle, "Entry unlinked");
        Some(node.entry)
    }

    /// Unlinks and returns the entry with `key`.
    pub fn delete(&mut self, key: &RouteKey) -> Result<RouteEntry> {
        let handle = self.find(key).ok_or(RouteError::NotFound(*key))?;
        self.remove(handle).ok_or(RouteError::NotFound(*key))
    }

    /// Replaces gateway and interface label of the entry with `key` in place.
    pub fn update(
        &mut self,
        key: &RouteKey,
        gateway: Option<Ipv4Addr>,
        oif: Option<String>,
    ) -> Result<()> {
        let handle = self.find(key).ok_or(RouteError::NotFound(*key))?;
        let entry = self.get_mut(handle).ok_or(RouteError::NotFound(*key))?;
        entry.update(gateway, oif)
    }

    /// Walks the list from head to tail.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            store: self,
            cursor: self.head,
        }
    }

    /// Mutable access to every live entry, in list order.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(EntryHandle, &mut RouteEntry),
    {
        let mut cursor = self.head;
        while let Some(i) = cursor {
            let handle = self.handle_at(i);
            let node = self.node_mut(i);
            cursor = node.next;
            f(handle, &mut node.entry);
        }
    }

    /// Unlinks every entry and returns them in list order.
    ///
    /// Every outstanding handle is invalidated.
    pub fn drain(&mut self) -> Vec<RouteEntry> {
        let mut drained = Vec::with_capacity(self.len);
        while let Some(handle) = self.head() {
            match self.remove(handle) {
                Some(entry) => drained.push(entry),
                None => break,
            }
        }
        drained
    }

    /// Verifies the link structure.
    ///
    /// Holds when the head has no predecessor, the tail no successor, every
    /// `prev`/`next` pair points back at each other, each live entry is
    /// reached exactly once, and no two entries share a key.
    pub fn check_links(&self) -> bool {
        if let Some(h) = self.head {
            if self.try_node(h).map_or(true, |n| n.prev.is_some()) {
                return false;
            }
        }
        if let Some(t) = self.tail {
            if self.try_node(t).map_or(true, |n| n.next.is_some()) {
                return false;
            }
        }

        let mut seen = vec![false; self.slots.len()];
        let mut keys = Vec::with_capacity(self.len);
        let mut prev: Option<u32> = None;
        let mut cursor = self.head;
        let mut count = 0;

        while let Some(i) = cursor {
            let Some(node) = self.try_node(i) else {
                return false;
            };
            if std::mem::replace(&mut seen[i as usize], true) || node.prev != prev {
                return false;
            }
            keys.push(*node.entry.key());
            count += 1;
            prev = Some(i);
            cursor = node.next;
        }

        keys.sort_unstable();
        keys.dedup();

        prev == self.tail
            && count == self.len
            && keys.len() == self.len
            && self.slots.iter().filter(|s| s.node.is_some()).count() == self.len
    }

    fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        std::iter::successors(self.head, move |&i| self.node(i).next)
    }

    fn handle_at(&self, index: u32) -> EntryHandle {
        EntryHandle::new(index, self.slots[index as usize].generation)
    }

    fn slot_of(&self, handle: EntryHandle) -> Option<&Slot> {
        self.slots
            .get(handle.index() as usize)
            .filter(|s| s.generation == handle.generation())
    }

    fn try_node(&self, index: u32) -> Option<&Node> {
        self.slots.get(index as usize).and_then(|s| s.node.as_ref())
    }

    // Link indices always point at occupied slots between public calls.
    fn node(&self, index: u32) -> &Node {
        match self.slots[index as usize].node.as_ref() {
            Some(node) => node,
            None => unreachable!("linked slot {index} is empty"),
        }
    }

    fn node_mut(&mut self, index: u32) -> &mut Node {
        match self.slots[index as usize].node.as_mut() {
            Some(node) => node,
            None => unreachable!("linked slot {index} is empty"),
        }
    }
}

/// Head-to-tail iterator over live entries.
pub struct Iter<'a> {
    store: &'a EntryStore,
    cursor: Option<u32>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (EntryHandle, &'a RouteEntry);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = self.store.node(index);
        self.cursor = node.next;
        Some((self.store.handle_at(index), &node.entry))
    }
}
