//! # rtable Core
//!
//! Core types, errors, and traits for the rtable routing table.
//!
//! This crate provides the building blocks shared by the store, the timer
//! backends, and the command surface:
//!
//! - **Types**: Route keys, entries, snapshots, and generational handles
//! - **Errors**: The `RouteError` hierarchy
//! - **Config**: Table-wide settings loaded from defaults or the environment
//! - **Traits**: The timer-subsystem contract (`TimerService`)
//!
//! ## Example
//!
//! ```rust
//! use rtable_core::{RouteKey, TableConfig};
//!
//! let key = RouteKey::parse("122.1.1.1", 32).unwrap();
//! assert_eq!(key.to_string(), "122.1.1.1/32");
//! assert_eq!(TableConfig::default().default_ttl_seconds, 30);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use config::TableConfig;
pub use constants::*;
pub use error::{Result, RouteError};
pub use traits::*;
pub use types::*;
