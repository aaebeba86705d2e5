//! RC channel override and OSC telemetry bridging for MAVLink vehicles.
//!
//! Two halves, coordinating only through [`OverrideState`]:
//!
//! - The override side holds a 16-channel RC override vector, mutated by a
//!   console command surface and by OSC events from a remote controller,
//!   and retransmitted on a fixed-rate schedule with forced resends after
//!   every change (packet loss tolerance).
//! - The telemetry side forwards vehicle ATTITUDE packets as `/roll`,
//!   `/pitch`, `/yaw` OSC messages to an external consumer.
//!
//! Transmission goes through one of two sinks chosen at construction: a
//! little-endian byte stream for a simulated vehicle (20 Hz) or MAVLink
//! `RC_CHANNELS_OVERRIDE` for a live one (1 Hz, channels 1-8 only).

pub mod command;
pub mod error;
pub mod link;
pub mod osc;
pub mod override_state;
pub mod scheduler;
pub mod sink;

pub use command::{
    ChannelTarget, CommandSurface, ParamSource, ParamTable, SwitchAck, VehicleType, SWITCH_PWM,
};
pub use error::BridgeError;
pub use link::{MavSender, VehicleLink};
pub use osc::{AttitudeForwarder, OscEventBridge, RcEvent};
pub use override_state::{ChannelVector, OverrideState, CHANNEL_COUNT, HOLD_REPEATS, NO_OVERRIDE};
pub use scheduler::{OverrideScheduler, PeriodicTrigger};
pub use sink::{LiveSink, OverrideSink, SimSink, UdpWriter, LIVE_SEND_RATE_HZ, SIM_SEND_RATE_HZ};
