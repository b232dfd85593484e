// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinator configuration.

use std::time::Duration;

/// Which pending flip the event pump gives up on once it is overdue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeoutPolicy {
    /// The flip of the thread currently pumping events.
    #[default]
    Waiter,
    /// The flip that has been pending the longest.
    Oldest,
}

/// Tunable parameters for a [`FlipCoordinator`](crate::FlipCoordinator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How long a flip may stay pending before it is assumed lost.
    ///
    /// Measured from scheduling, so events for other outputs do not extend
    /// it.
    pub timeout: Duration,
    /// Which flip to give up on first.
    pub timeout_policy: TimeoutPolicy,
}

impl CoordinatorConfig {
    /// Preset for DRM/KMS hardware: 50 ms flip timeout, waiter's own flip is
    /// force-completed.
    ///
    /// Some drivers occasionally drop flip events. Three frames at 60 Hz is
    /// long enough to never fire on healthy hardware.
    #[must_use]
    pub const fn kms() -> Self {
        Self {
            timeout: Duration::from_millis(50),
            timeout_policy: TimeoutPolicy::Waiter,
        }
    }

    /// Preset for event sources that never drop events: one hour flip
    /// timeout.
    #[must_use]
    pub const fn blocking() -> Self {
        Self {
            timeout: Duration::from_secs(60 * 60),
            timeout_policy: TimeoutPolicy::Waiter,
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::kms()
    }
}
