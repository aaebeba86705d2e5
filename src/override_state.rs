//! Shared RC override state.
//!
//! `OverrideState` owns the 16-channel override vector, the last vector that
//! went out on the wire, and the forced-resend counter. Every mutation and
//! the periodic resend decision run under one internal mutex, so the
//! sequence "mutate, arm hold repeats, transmit" is atomic with respect to
//! the scheduler tick and any other mutator.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::BridgeError;
use crate::sink::OverrideSink;

/// Number of RC channels carried in an override vector.
pub const CHANNEL_COUNT: usize = 16;

/// Reserved value meaning "release the override on this channel".
pub const NO_OVERRIDE: u16 = 65535;

/// Forced resend count armed by every override change. The link may drop
/// individual packets, so each change goes out redundantly on this many
/// subsequent ticks even if the vector stays unchanged.
pub const HOLD_REPEATS: u8 = 10;

/// Ordered override values for RC channels 1..16 (index 0 is channel 1).
pub type ChannelVector = [u16; CHANNEL_COUNT];

struct Inner {
    current: ChannelVector,
    last_sent: ChannelVector,
    hold_repeats: u8,
    sink: Box<dyn OverrideSink>,
}

/// RC channel override state shared between the command surface, the remote
/// event bridge, and the periodic scheduler.
pub struct OverrideState {
    inner: Mutex<Inner>,
}

impl OverrideState {
    /// Create an all-zero override state transmitting through `sink`.
    pub fn new(sink: Box<dyn OverrideSink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: [0; CHANNEL_COUNT],
                last_sent: [0; CHANNEL_COUNT],
                hold_repeats: 0,
                sink,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole override vector, arm the hold repeats, and transmit
    /// immediately. The next scheduler ticks keep resending it.
    pub fn set_all(&self, channels: ChannelVector) -> Result<(), BridgeError> {
        let mut inner = self.lock();
        inner.current = channels;
        inner.hold_repeats = HOLD_REPEATS;
        inner.sink.transmit(&channels)
    }

    /// Override a single channel (zero-based index), arm the hold repeats,
    /// and transmit the full vector immediately.
    pub fn set_channel(&self, index: usize, value: u16) -> Result<(), BridgeError> {
        if index >= CHANNEL_COUNT {
            return Err(BridgeError::InvalidChannel(index));
        }
        let mut inner = self.lock();
        inner.current[index] = value;
        inner.hold_repeats = HOLD_REPEATS;
        let current = inner.current;
        inner.sink.transmit(&current)
    }

    /// Current override value at a zero-based channel index.
    pub fn get_channel(&self, index: usize) -> Option<u16> {
        self.lock().current.get(index).copied()
    }

    /// Snapshot of the current override vector.
    pub fn channels(&self) -> ChannelVector {
        self.lock().current
    }

    /// Remaining forced-resend count.
    pub fn hold_repeats(&self) -> u8 {
        self.lock().hold_repeats
    }

    /// Send rate the owned sink expects, in Hz.
    pub fn sink_rate_hz(&self) -> u32 {
        self.lock().sink.rate_hz()
    }

    /// One scheduler pass: retransmit if the vector is non-zero, differs
    /// from the last transmission, or hold repeats remain. Returns whether a
    /// transmission happened.
    ///
    /// An all-zero vector with no pending hold repeats stays silent, so an
    /// idle bridge produces no traffic. A non-zero vector retransmits on
    /// every tick, enforcing the override continuously against packet loss.
    pub fn tick(&self) -> Result<bool, BridgeError> {
        let mut inner = self.lock();
        let changed = inner.current != [0; CHANNEL_COUNT]
            || inner.current != inner.last_sent
            || inner.hold_repeats > 0;
        if !changed {
            return Ok(false);
        }
        inner.last_sent = inner.current;
        let current = inner.current;
        inner.sink.transmit(&current)?;
        if inner.hold_repeats > 0 {
            inner.hold_repeats -= 1;
        }
        Ok(true)
    }
}
