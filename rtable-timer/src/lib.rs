//! # rtable Timer
//!
//! Implementations of [`rtable_core::TimerService`]:
//!
//! - **TokioTimer**: One tokio task per timer, cancelled by aborting the task
//! - **ManualTimer**: A virtual clock advanced by hand, for tests and simulations
//!
//! Both guarantee that a timer whose `cancel` returned `true` never runs its
//! callback: a pending timer is a map entry, and firing and cancelling race
//! to remove it. Only the winner acts.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod manual;
mod runtime;

pub use manual::ManualTimer;
pub use runtime::TokioTimer;
