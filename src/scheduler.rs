//! Periodic override scheduling.
//!
//! The host loop calls [`OverrideScheduler::idle_tick`] on every pass; the
//! trigger gates the actual resend decision to the sink's fixed rate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::BridgeError;
use crate::override_state::OverrideState;

/// Fixed-rate trigger. `triggered` returns true at most once per period,
/// however often it is polled.
pub struct PeriodicTrigger {
    period: Duration,
    next: Instant,
}

impl PeriodicTrigger {
    pub fn new(rate_hz: u32) -> Self {
        let period = Duration::from_micros(1_000_000 / u64::from(rate_hz.max(1)));
        Self {
            period,
            next: Instant::now(),
        }
    }

    /// Whether a period has elapsed since the last firing. Fires on the
    /// first call after construction.
    pub fn triggered(&mut self) -> bool {
        let now = Instant::now();
        if now >= self.next {
            self.next = now + self.period;
            true
        } else {
            false
        }
    }
}

/// Drives the shared override state at the rate the transmit sink expects:
/// 20 Hz against a simulated vehicle, 1 Hz against a live one.
pub struct OverrideScheduler {
    trigger: PeriodicTrigger,
    state: Arc<OverrideState>,
}

impl OverrideScheduler {
    pub fn new(state: Arc<OverrideState>) -> Self {
        let trigger = PeriodicTrigger::new(state.sink_rate_hz());
        Self { trigger, state }
    }

    /// Call once per host-loop pass. Runs the resend decision when the
    /// trigger fires; returns whether a transmission happened.
    pub fn idle_tick(&mut self) -> Result<bool, BridgeError> {
        if self.trigger.triggered() {
            self.state.tick()
        } else {
            Ok(false)
        }
    }
}
