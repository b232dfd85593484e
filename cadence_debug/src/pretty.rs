// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed as milliseconds on their clock, tagged with the clock domain.

use std::io::Write;
use std::time::Duration;

use cadence_core::time::Timestamp;
use cadence_core::trace::{
    FlipCancelledEvent, FlipCompletedEvent, FlipScheduledEvent, FlipTimeoutEvent,
    FrameDeadlineEvent, ResyncEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write + Send>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn stamp(t: Timestamp) -> String {
    format!("{:.3}ms@{:?}", t.ticks() as f64 / 1e6, t.domain())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_flip_scheduled(&mut self, e: &FlipScheduledEvent) {
        let _ = writeln!(
            self.writer,
            "[flip:schedule] output={} token={} buffer={}",
            e.output.0, e.token, e.buffer,
        );
    }

    fn on_flip_completed(&mut self, e: &FlipCompletedEvent) {
        let vblank = e.vblank.map_or_else(|| "?".to_owned(), stamp);
        let _ = writeln!(
            self.writer,
            "[flip:done] output={} token={} latency={:.2}ms vblank={vblank}",
            e.output.0,
            e.token,
            ms(e.latency),
        );
    }

    fn on_flip_timeout(&mut self, e: &FlipTimeoutEvent) {
        let _ = writeln!(
            self.writer,
            "[flip:TIMEOUT] output={} token={} pending={:.2}ms",
            e.output.0,
            e.token,
            ms(e.pending_for),
        );
    }

    fn on_flip_cancelled(&mut self, e: &FlipCancelledEvent) {
        let _ = writeln!(
            self.writer,
            "[flip:cancel] output={} token={}",
            e.output.0, e.token,
        );
    }

    fn on_resync(&mut self, e: &ResyncEvent) {
        let _ = writeln!(
            self.writer,
            "[resync] previous={} reference={} now={}",
            stamp(e.previous),
            stamp(e.reference),
            stamp(e.now),
        );
    }

    fn on_frame_deadline(&mut self, e: &FrameDeadlineEvent) {
        let how = if e.resynced { "resync" } else { "steady" };
        let _ = writeln!(
            self.writer,
            "[deadline] target={} previous={} {how}",
            stamp(e.target),
            stamp(e.previous),
        );
    }
}
