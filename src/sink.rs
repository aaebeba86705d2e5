//! Transmit sinks for override vectors.
//!
//! Two concrete forms, selected once at construction: `SimSink` serializes
//! all 16 channels as a little-endian byte block for a simulated vehicle's
//! RC input, `LiveSink` sends the first 8 channels as a MAVLink
//! `RC_CHANNELS_OVERRIDE` to a live vehicle. Failures propagate to the
//! caller; the scheduler's periodic resend is the only retry mechanism.

use std::io::{self, Write};
use std::net::{SocketAddr, UdpSocket};

use mavlink::common::{MavMessage, RC_CHANNELS_OVERRIDE_DATA};

use crate::error::BridgeError;
use crate::link::MavSender;
use crate::override_state::{ChannelVector, CHANNEL_COUNT};

/// Send rate against a simulated vehicle. Simulation links tolerate high
/// packet rates and benefit from a tight control loop.
pub const SIM_SEND_RATE_HZ: u32 = 20;

/// Send rate against a live vehicle, where the radio link is
/// bandwidth-constrained.
pub const LIVE_SEND_RATE_HZ: u32 = 1;

/// Downstream consumer of a 16-channel override vector.
pub trait OverrideSink: Send {
    /// Send the full override vector downstream.
    fn transmit(&mut self, channels: &ChannelVector) -> Result<(), BridgeError>;

    /// Rate at which the scheduler should drive this sink, in Hz.
    fn rate_hz(&self) -> u32;
}

/// Simulated-vehicle sink: 16 little-endian u16 values, concatenated in
/// channel order, written as one fixed-size block per transmit.
pub struct SimSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> SimSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write + Send> OverrideSink for SimSink<W> {
    fn transmit(&mut self, channels: &ChannelVector) -> Result<(), BridgeError> {
        let mut buf = [0u8; CHANNEL_COUNT * 2];
        for (i, value) in channels.iter().enumerate() {
            buf[i * 2..i * 2 + 2].copy_from_slice(&value.to_le_bytes());
        }
        self.out.write_all(&buf)?;
        Ok(())
    }

    fn rate_hz(&self) -> u32 {
        SIM_SEND_RATE_HZ
    }
}

/// Live-vehicle sink: channels 1-8 as `RC_CHANNELS_OVERRIDE`.
///
/// Channels 9-16 cannot be overridden through this path; the message only
/// carries eight channels.
pub struct LiveSink<S: MavSender> {
    sender: S,
    target_system: u8,
    target_component: u8,
}

impl<S: MavSender> LiveSink<S> {
    pub fn new(sender: S, target_system: u8, target_component: u8) -> Self {
        Self {
            sender,
            target_system,
            target_component,
        }
    }
}

impl<S: MavSender> OverrideSink for LiveSink<S> {
    fn transmit(&mut self, channels: &ChannelVector) -> Result<(), BridgeError> {
        let msg = MavMessage::RC_CHANNELS_OVERRIDE(RC_CHANNELS_OVERRIDE_DATA {
            target_system: self.target_system,
            target_component: self.target_component,
            chan1_raw: channels[0],
            chan2_raw: channels[1],
            chan3_raw: channels[2],
            chan4_raw: channels[3],
            chan5_raw: channels[4],
            chan6_raw: channels[5],
            chan7_raw: channels[6],
            chan8_raw: channels[7],
            ..Default::default()
        });
        self.sender.send_message(&msg)
    }

    fn rate_hz(&self) -> u32 {
        LIVE_SEND_RATE_HZ
    }
}

/// `Write` adapter sending each block as one UDP datagram, for pointing a
/// `SimSink` at a simulator's RC input port.
pub struct UdpWriter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpWriter {
    pub fn connect(target: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self { socket, target })
    }
}

impl Write for UdpWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send_to(buf, self.target)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
