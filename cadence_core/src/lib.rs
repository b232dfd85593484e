// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clock-domain timestamps and phase-locked frame deadlines for display pacing.
//!
//! `cadence_core` holds the platform-independent half of display pacing. It is
//! `no_std` compatible (with `alloc`) and never reads a system clock itself;
//! every time read goes through a [`ClockSource`](clock::ClockSource).
//!
//! # Architecture
//!
//! ```text
//!   ClockSource (platform or ManualClock)
//!       │
//!       ▼
//!   FrameClock::next_frame_after(previous) ──► deadline
//!       ▲                                        │
//!       │ resync (vblank reference)              ▼
//!   ResyncSource                     render, then wait for deadline
//! ```
//!
//! **[`time`]**: [`Timestamp`](time::Timestamp) tagged with its
//! [`ClockId`](time::ClockId), and a signed nanosecond
//! [`Duration`](time::Duration). Cross-domain comparisons fail instead of
//! mixing clocks.
//!
//! **[`clock`]**: the [`ClockSource`](clock::ClockSource) seam and a
//! deterministic [`ManualClock`](clock::ManualClock).
//!
//! **[`frame_clock`]**: phase-locked deadline generator that recovers from
//! missed frames by resyncing with a reference such as the last vblank.
//!
//! **[`throttle`]**: single-domain variant for clients that only need a
//! steady cadence on their own clock.
//!
//! **[`output`]**: [`OutputId`](output::OutputId) for physical displays.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! pacing instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod clock;
pub mod frame_clock;
pub mod output;
pub mod throttle;
pub mod time;
pub mod trace;
