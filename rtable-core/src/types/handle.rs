//! Non-owning handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generational reference to a slot in the entry store.
///
/// A handle resolves only while its slot holds the same generation it was
/// issued for. Once the entry is removed the slot's generation moves on,
/// so a late holder (e.g. an expiration callback) sees `None` instead of
/// reaching a different entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryHandle {
    index: u32,
    generation: u32,
}

impl EntryHandle {
    /// Builds a handle from raw parts.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation the handle was issued for.
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Opaque identifier of a scheduled timer.
///
/// Handles are never reused by a timer service, so a fired or cancelled
/// handle can never alias a newer timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Wraps a raw timer id.
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Raw timer id.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}
