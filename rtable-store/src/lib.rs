//! # rtable Store
//!
//! The routing entry store and its TTL-driven eviction.
//!
//! - **EntryStore**: Arena-backed doubly-linked list with generational handles
//! - **ExpirationBinding**: Arms and cancels one expiration timer per entry
//! - **RouteTable**: The two composed behind a single table-wide lock
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use rtable_core::RouteKey;
//! use rtable_store::RouteTable;
//! use rtable_timer::ManualTimer;
//!
//! let timer = Arc::new(ManualTimer::new());
//! let table = RouteTable::new(timer.clone());
//!
//! let key = RouteKey::parse("122.1.1.1", 32).unwrap();
//! table.insert(key, "10.1.1.1".parse().ok(), Some("eth0".into())).unwrap();
//! assert_eq!(table.enumerate().len(), 1);
//!
//! timer.advance(Duration::from_secs(30));
//! assert!(table.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod expiry;
mod store;
mod table;

pub use expiry::{ExpirationBinding, Expiry};
pub use store::{EntryStore, Iter};
pub use table::{RouteTable, TableStats};
