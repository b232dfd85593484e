// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Page-flip coordination across several outputs sharing one event source.
//!
//! A display engine schedules one page flip per output and then waits for the
//! hardware to report that flip complete. Completion events for every output
//! arrive on a single channel (the DRM file descriptor), so only one thread
//! may read it at a time. [`FlipCoordinator`](coordinator::FlipCoordinator)
//! elects that thread on demand: whichever waiter finds the master slot empty
//! pumps events for everybody until its own flip is done, then hands over.
//!
//! ```text
//!   schedule(output, buffer) ──► FlipDriver::submit_flip
//!                                        │
//!   wait(output) ─┬─ master ──► FlipDriver::poll_for_event ──► FlipEvent
//!                 │                 │ (timeout ─► forced completion)
//!                 └─ others ──► Condvar ◄──────── notify_all
//! ```
//!
//! **[`driver`]**: the [`FlipDriver`](driver::FlipDriver) seam to the kernel.
//!
//! **[`config`]**: timeout and timeout-policy presets.
//!
//! **[`coordinator`]**: the registry and single-master protocol.

pub mod config;
pub mod coordinator;
pub mod driver;

#[cfg(test)]
mod fake;

pub use coordinator::{FlipCoordinator, FlipError};
