//! Domain types for rtable.
//!
//! - [`RouteKey`]: (destination, mask length) identity of an entry
//! - [`RouteEntry`]: A live entry as owned by the store
//! - [`RouteSnapshot`]: Read-only copy handed to enumeration consumers
//! - [`EntryHandle`] / [`TimerHandle`]: Non-owning references into the store and timer

mod entry;
mod handle;
mod key;

pub use entry::*;
pub use handle::*;
pub use key::*;
