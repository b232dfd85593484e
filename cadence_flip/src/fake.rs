// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory driver and trace sink for coordinator tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use cadence_core::output::OutputId;
use cadence_core::time::Timestamp;
use cadence_core::trace::{
    FlipCancelledEvent, FlipCompletedEvent, FlipScheduledEvent, FlipTimeoutEvent, TraceSink,
};

use crate::driver::{DriverError, FlipDriver, FlipEvent, FlipToken, FramebufferId};

/// Driver whose hardware events are injected by the test.
///
/// Records every submitted flip and flags any overlapping `poll_for_event`
/// calls.
#[derive(Debug)]
pub(crate) struct FakeDriver {
    submitted: Mutex<Vec<(OutputId, FramebufferId, FlipToken)>>,
    tx: Sender<FlipEvent>,
    rx: Receiver<FlipEvent>,
    submit_error: Mutex<Option<DriverError>>,
    poll_error: Mutex<Option<DriverError>>,
    polling: AtomicUsize,
    polls: AtomicUsize,
    overlapped: AtomicBool,
}

impl FakeDriver {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            submitted: Mutex::new(Vec::new()),
            tx,
            rx,
            submit_error: Mutex::new(None),
            poll_error: Mutex::new(None),
            polling: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            overlapped: AtomicBool::new(false),
        }
    }

    /// Queues a completion event for `token`.
    pub(crate) fn complete(&self, token: FlipToken) {
        self.complete_at(token, None);
    }

    pub(crate) fn complete_at(&self, token: FlipToken, vblank: Option<Timestamp>) {
        self.tx
            .send(FlipEvent { token, vblank })
            .expect("receiver lives as long as the driver");
    }

    /// Token of the most recent flip submitted for `output`.
    pub(crate) fn token_for(&self, output: OutputId) -> FlipToken {
        self.submitted
            .lock()
            .iter()
            .rev()
            .find(|(o, _, _)| *o == output)
            .map(|(_, _, token)| *token)
            .expect("no flip was submitted for this output")
    }

    pub(crate) fn submit_count(&self) -> usize {
        self.submitted.lock().len()
    }

    pub(crate) fn fail_next_submit(&self, err: DriverError) {
        *self.submit_error.lock() = Some(err);
    }

    pub(crate) fn fail_next_poll(&self, err: DriverError) {
        *self.poll_error.lock() = Some(err);
    }

    pub(crate) fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub(crate) fn saw_concurrent_poll(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

impl FlipDriver for FakeDriver {
    fn submit_flip(
        &self,
        output: OutputId,
        buffer: FramebufferId,
        token: FlipToken,
    ) -> Result<(), DriverError> {
        if let Some(err) = self.submit_error.lock().take() {
            return Err(err);
        }
        self.submitted.lock().push((output, buffer, token));
        Ok(())
    }

    fn poll_for_event(&self, timeout: Duration) -> Result<Option<FlipEvent>, DriverError> {
        if self.polling.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.polls.fetch_add(1, Ordering::SeqCst);

        let result = match self.poll_error.lock().take() {
            Some(err) => Err(err),
            None => match self.rx.recv_timeout(timeout) {
                Ok(event) => Ok(Some(event)),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Ok(None),
            },
        };

        self.polling.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// One observed trace event, reduced to what tests assert on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Seen {
    Scheduled(OutputId, FlipToken),
    Completed(OutputId, FlipToken),
    Timeout(OutputId, FlipToken),
    Cancelled(OutputId, FlipToken),
}

/// Trace sink whose log stays readable after the coordinator takes ownership.
#[derive(Clone, Debug, Default)]
pub(crate) struct SharedSink {
    log: Arc<Mutex<Vec<Seen>>>,
    vblanks: Arc<Mutex<Vec<Option<Timestamp>>>>,
}

impl SharedSink {
    pub(crate) fn seen(&self) -> Vec<Seen> {
        self.log.lock().clone()
    }

    pub(crate) fn vblanks(&self) -> Vec<Option<Timestamp>> {
        self.vblanks.lock().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Seen) -> bool) -> usize {
        self.log.lock().iter().filter(|s| pred(s)).count()
    }
}

impl TraceSink for SharedSink {
    fn on_flip_scheduled(&mut self, e: &FlipScheduledEvent) {
        self.log
            .lock()
            .push(Seen::Scheduled(e.output, FlipToken(e.token)));
    }

    fn on_flip_completed(&mut self, e: &FlipCompletedEvent) {
        self.log
            .lock()
            .push(Seen::Completed(e.output, FlipToken(e.token)));
        self.vblanks.lock().push(e.vblank);
    }

    fn on_flip_timeout(&mut self, e: &FlipTimeoutEvent) {
        self.log.lock().push(Seen::Timeout(e.output, FlipToken(e.token)));
    }

    fn on_flip_cancelled(&mut self, e: &FlipCancelledEvent) {
        self.log
            .lock()
            .push(Seen::Cancelled(e.output, FlipToken(e.token)));
    }
}
