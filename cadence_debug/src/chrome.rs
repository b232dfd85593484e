// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Flips are drawn as complete slices on a per-output track (`pid` is the
//! output number), spanning from scheduling to completion or timeout. Frame
//! clock events are instants on track 0, thread 1.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};
use std::time::Duration;

use serde_json::{Value, json};

use crate::recorder::{Record, RecordedEvent, decode};

const FRAME_CLOCK_TID: u32 = 1;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Event times are the recorder's elapsed time in microseconds. Clock-domain
/// timestamps are kept in `args` as raw nanosecond ticks.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes).map(to_json).collect();
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn to_json(record: Record) -> Value {
    let at = us(record.elapsed);
    match record.event {
        RecordedEvent::FlipScheduled(e) => json!({
            "ph": "i",
            "name": "FlipScheduled",
            "cat": "Flip",
            "ts": at,
            "pid": e.output.0,
            "tid": 0,
            "s": "t",
            "args": {
                "token": e.token,
                "buffer": e.buffer,
            }
        }),
        RecordedEvent::FlipCompleted(e) => json!({
            "ph": "X",
            "name": "Flip",
            "cat": "Flip",
            "ts": (at - us(e.latency)).max(0.0),
            "dur": us(e.latency),
            "pid": e.output.0,
            "tid": 0,
            "args": {
                "token": e.token,
                "vblank_ns": e.vblank.map(|t| t.ticks()),
            }
        }),
        RecordedEvent::FlipTimeout(e) => json!({
            "ph": "X",
            "name": "FlipTimeout",
            "cat": "Flip",
            "ts": (at - us(e.pending_for)).max(0.0),
            "dur": us(e.pending_for),
            "pid": e.output.0,
            "tid": 0,
            "args": {
                "token": e.token,
            }
        }),
        RecordedEvent::FlipCancelled(e) => json!({
            "ph": "i",
            "name": "FlipCancelled",
            "cat": "Flip",
            "ts": at,
            "pid": e.output.0,
            "tid": 0,
            "s": "t",
            "args": {
                "token": e.token,
            }
        }),
        RecordedEvent::Resync(e) => json!({
            "ph": "i",
            "name": "Resync",
            "cat": "FrameClock",
            "ts": at,
            "pid": 0,
            "tid": FRAME_CLOCK_TID,
            "s": "t",
            "args": {
                "previous_ns": e.previous.ticks(),
                "reference_ns": e.reference.ticks(),
                "reference_clock": e.reference.domain().0,
                "now_ns": e.now.ticks(),
            }
        }),
        RecordedEvent::FrameDeadline(e) => json!({
            "ph": "i",
            "name": "FrameDeadline",
            "cat": "FrameClock",
            "ts": at,
            "pid": 0,
            "tid": FRAME_CLOCK_TID,
            "s": "t",
            "args": {
                "target_ns": e.target.ticks(),
                "clock": e.target.domain().0,
                "resynced": e.resynced,
            }
        }),
    }
}

fn us(d: Duration) -> f64 {
    d.as_secs_f64() * 1e6
}
