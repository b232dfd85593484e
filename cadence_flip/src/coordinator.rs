// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pending-flip registry and the single-master wait protocol.
//!
//! Every output has at most one flip in flight. [`FlipCoordinator::wait`]
//! blocks until the caller's own flip is done, but completion events for all
//! outputs come from one driver queue. The first waiter that finds the master
//! slot empty becomes master: it drops the registry lock, polls the driver,
//! and retires whichever flip the event belongs to, waking everyone after
//! each event. When its own flip is done it releases the slot and another
//! waiter takes over.
//!
//! A flip pending for longer than the configured timeout is treated as a lost
//! event, even while other outputs keep delivering theirs. The flip chosen by
//! [`TimeoutPolicy`] is force-completed and reported once to the trace sink,
//! and `wait` still succeeds.

use std::collections::HashMap;
use std::fmt;
use std::thread::{self, ThreadId};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use cadence_core::output::OutputId;
use cadence_core::trace::{
    FlipCancelledEvent, FlipCompletedEvent, FlipScheduledEvent, FlipTimeoutEvent, NoopSink,
    TraceSink,
};

use crate::config::{CoordinatorConfig, TimeoutPolicy};
use crate::driver::{DriverError, FlipDriver, FlipEvent, FlipToken, FramebufferId};

/// Errors from [`FlipCoordinator`] operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FlipError {
    /// A flip is already in flight for this output.
    #[error("a page flip is already pending on {0}")]
    AlreadyPending(OutputId),
    /// The driver rejected the flip request.
    #[error("page flip request for {output} failed")]
    HardwareRequestFailed {
        /// Output the flip targeted.
        output: OutputId,
        /// Driver error.
        #[source]
        source: DriverError,
    },
    /// Reading completion events from the driver failed.
    #[error("failed to read page flip events")]
    EventSource(#[source] DriverError),
}

#[derive(Debug)]
struct PendingFlip {
    token: FlipToken,
    buffer: FramebufferId,
    scheduled_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    pending: HashMap<OutputId, PendingFlip>,
    master: Option<ThreadId>,
    next_token: u64,
}

impl State {
    fn is_pending(&self, output: OutputId, token: FlipToken) -> bool {
        self.pending.get(&output).is_some_and(|p| p.token == token)
    }
}

/// Tracks in-flight page flips for every output of one display engine.
///
/// Share it between render threads by reference or `Arc`. The trace sink is
/// invoked with the registry locked and must not call back into the
/// coordinator.
pub struct FlipCoordinator<D> {
    driver: D,
    config: CoordinatorConfig,
    state: Mutex<State>,
    cond: Condvar,
    sink: Mutex<Box<dyn TraceSink + Send>>,
}

impl<D: fmt::Debug> fmt::Debug for FlipCoordinator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlipCoordinator")
            .field("driver", &self.driver)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<D: FlipDriver> FlipCoordinator<D> {
    /// Creates a coordinator with no trace sink.
    pub fn new(driver: D, config: CoordinatorConfig) -> Self {
        Self::with_sink(driver, config, NoopSink)
    }

    /// Creates a coordinator reporting flip lifecycle events to `sink`.
    pub fn with_sink(
        driver: D,
        config: CoordinatorConfig,
        sink: impl TraceSink + Send + 'static,
    ) -> Self {
        Self {
            driver,
            config,
            state: Mutex::new(State::default()),
            cond: Condvar::new(),
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// The underlying driver.
    #[inline]
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The configuration this coordinator was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Requests that `buffer` be scanned out on `output` at the next vblank.
    ///
    /// The driver is called with the registry locked, so the completion event
    /// can never be processed before the flip is registered.
    ///
    /// # Errors
    ///
    /// - [`FlipError::AlreadyPending`] if `output` has a flip in flight. The
    ///   driver is not called.
    /// - [`FlipError::HardwareRequestFailed`] if the driver rejects the
    ///   request. Nothing is registered.
    pub fn schedule(&self, output: OutputId, buffer: FramebufferId) -> Result<(), FlipError> {
        let mut state = self.state.lock();
        if state.pending.contains_key(&output) {
            return Err(FlipError::AlreadyPending(output));
        }

        let token = FlipToken(state.next_token);
        state.next_token = state.next_token.wrapping_add(1);
        self.driver
            .submit_flip(output, buffer, token)
            .map_err(|source| FlipError::HardwareRequestFailed { output, source })?;

        state.pending.insert(
            output,
            PendingFlip {
                token,
                buffer,
                scheduled_at: Instant::now(),
            },
        );
        trace!(%output, token = token.0, buffer = buffer.0, "page flip scheduled");
        self.sink.lock().on_flip_scheduled(&FlipScheduledEvent {
            output,
            token: token.0,
            buffer: buffer.0,
        });
        Ok(())
    }

    /// Blocks until the flip pending on `output` has completed.
    ///
    /// Returns immediately if nothing is pending. A flip that times out is
    /// force-completed and counts as done.
    ///
    /// # Errors
    ///
    /// [`FlipError::EventSource`] if this thread was pumping events and the
    /// driver failed to deliver them. The flip stays pending and another
    /// waiter takes over pumping.
    pub fn wait(&self, output: OutputId) -> Result<(), FlipError> {
        let mut state = self.state.lock();
        let Some(token) = state.pending.get(&output).map(|p| p.token) else {
            return Ok(());
        };

        loop {
            if !state.is_pending(output, token) {
                return Ok(());
            }
            if state.master.is_none() {
                state.master = Some(thread::current().id());
                debug!(%output, "took over page flip event pumping");
                let result = self.pump(&mut state, output, token);
                state.master = None;
                debug!(%output, "released page flip event pumping");
                self.cond.notify_all();
                return result;
            }
            self.cond.wait(&mut state);
        }
    }

    /// Abandons the flip pending on `output`, if any.
    ///
    /// Waiters on `output` are woken and return. A late completion event for
    /// the abandoned flip is ignored. Returns whether a flip was pending.
    pub fn cancel(&self, output: OutputId) -> bool {
        let mut state = self.state.lock();
        let Some(flip) = state.pending.remove(&output) else {
            return false;
        };
        debug!(%output, token = flip.token.0, "page flip cancelled");
        self.sink.lock().on_flip_cancelled(&FlipCancelledEvent {
            output,
            token: flip.token.0,
        });
        self.cond.notify_all();
        true
    }

    /// Whether a flip is in flight for `output`.
    #[must_use]
    pub fn is_pending(&self, output: OutputId) -> bool {
        self.state.lock().pending.contains_key(&output)
    }

    /// Framebuffer of the flip in flight for `output`.
    #[must_use]
    pub fn pending_buffer(&self, output: OutputId) -> Option<FramebufferId> {
        self.state.lock().pending.get(&output).map(|p| p.buffer)
    }

    /// Number of outputs with a flip in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// The thread currently pumping driver events, if any.
    #[must_use]
    pub fn master_thread(&self) -> Option<ThreadId> {
        self.state.lock().master
    }

    /// Pumps events until the flip `token` on `output` is gone.
    ///
    /// Polls never outlast the timeout candidate's remaining budget, so a lost
    /// event is noticed no matter how busy the other outputs are.
    fn pump(
        &self,
        state: &mut MutexGuard<'_, State>,
        output: OutputId,
        token: FlipToken,
    ) -> Result<(), FlipError> {
        let timeout = self.config.timeout;
        while state.is_pending(output, token) {
            let Some((candidate, scheduled_at)) = self.timeout_candidate(state, output) else {
                break;
            };
            let remaining = timeout.saturating_sub(scheduled_at.elapsed());
            if remaining.is_zero() {
                self.force_complete(state, candidate);
            } else {
                let polled =
                    MutexGuard::unlocked(state, || self.driver.poll_for_event(remaining));
                match polled {
                    Ok(Some(event)) => self.complete(state, event),
                    Ok(None) => {}
                    Err(source) => {
                        warn!(%output, error = %source, "reading page flip events failed");
                        return Err(FlipError::EventSource(source));
                    }
                }
            }
            self.cond.notify_all();
        }
        Ok(())
    }

    /// The flip [`TimeoutPolicy`] gives up on next, with its submission time.
    fn timeout_candidate(&self, state: &State, waiter: OutputId) -> Option<(OutputId, Instant)> {
        match self.config.timeout_policy {
            TimeoutPolicy::Waiter => state
                .pending
                .get(&waiter)
                .map(|p| (waiter, p.scheduled_at)),
            TimeoutPolicy::Oldest => state
                .pending
                .iter()
                .min_by_key(|(_, p)| (p.scheduled_at, p.token))
                .map(|(output, p)| (*output, p.scheduled_at)),
        }
    }

    fn complete(&self, state: &mut State, event: FlipEvent) {
        let Some(output) = state
            .pending
            .iter()
            .find(|(_, p)| p.token == event.token)
            .map(|(output, _)| *output)
        else {
            debug!(token = event.token.0, "ignoring event for a flip no longer pending");
            return;
        };
        let Some(flip) = state.pending.remove(&output) else {
            return;
        };

        let latency = flip.scheduled_at.elapsed();
        trace!(%output, token = flip.token.0, ?latency, "page flip completed");
        self.sink.lock().on_flip_completed(&FlipCompletedEvent {
            output,
            token: flip.token.0,
            vblank: event.vblank,
            latency,
        });
    }

    fn force_complete(&self, state: &mut State, output: OutputId) {
        let Some(flip) = state.pending.remove(&output) else {
            return;
        };

        let pending_for = flip.scheduled_at.elapsed();
        warn!(
            %output,
            token = flip.token.0,
            ?pending_for,
            "page flip event timed out; assuming the flip completed"
        );
        self.sink.lock().on_flip_timeout(&FlipTimeoutEvent {
            output,
            token: flip.token.0,
            pending_for,
        });
    }
}
