//! Outbound attitude telemetry as OSC messages.
//!
//! Every MAVLink `ATTITUDE` packet from the vehicle is re-expressed as
//! three single-float OSC messages (`/roll`, `/pitch`, `/yaw`) sent to an
//! external process, e.g. an audio/visual patch reacting to the vehicle.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use mavlink::common::MavMessage;
use rosc::{OscMessage, OscPacket, OscType};

use crate::error::BridgeError;

/// Outbound addresses, one per attitude axis.
pub const ADDR_ROLL_OUT: &str = "/roll";
pub const ADDR_PITCH_OUT: &str = "/pitch";
pub const ADDR_YAW_OUT: &str = "/yaw";

/// Forwards vehicle attitude to an OSC consumer over UDP.
pub struct AttitudeForwarder {
    socket: UdpSocket,
    target: SocketAddr,
    packets_forwarded: u64,
    status_calls: u32,
    verbose: bool,
}

impl AttitudeForwarder {
    /// Bind an ephemeral local port and aim at the OSC consumer.
    pub fn new(target: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            socket,
            target,
            packets_forwarded: 0,
            status_calls: 0,
            verbose: false,
        })
    }

    /// Forward roll/pitch/yaw if `msg` is an ATTITUDE packet; every other
    /// message type is ignored.
    pub fn handle_message(&mut self, msg: &MavMessage) -> Result<(), BridgeError> {
        let MavMessage::ATTITUDE(att) = msg else {
            return Ok(());
        };
        self.send_float(ADDR_ROLL_OUT, att.roll)?;
        self.send_float(ADDR_PITCH_OUT, att.pitch)?;
        self.send_float(ADDR_YAW_OUT, att.yaw)?;
        self.packets_forwarded += 1;
        if self.verbose {
            log::debug!(
                "forwarded attitude roll={:.3} pitch={:.3} yaw={:.3}",
                att.roll,
                att.pitch,
                att.yaw
            );
        }
        Ok(())
    }

    fn send_float(&mut self, addr: &str, value: f32) -> Result<(), BridgeError> {
        let packet = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args: vec![OscType::Float(value)],
        });
        let bytes =
            rosc::encoder::encode(&packet).map_err(|e| BridgeError::OscEncode(format!("{e:?}")))?;
        self.socket.send_to(&bytes, self.target)?;
        Ok(())
    }

    /// Handle an `osc ...` console command, returning user-facing text.
    pub fn handle_command(&mut self, args: &[&str]) -> String {
        match args {
            ["status"] => self.status(),
            ["set", "verbose", value] if *value == "on" || *value == "off" => {
                self.verbose = *value == "on";
                format!("osc verbose {value}")
            }
            _ => "Usage: osc <status|set verbose on|off>".to_string(),
        }
    }

    /// Status line with forwarding counters.
    pub fn status(&mut self) -> String {
        self.status_calls += 1;
        format!(
            "status called {} times. {} attitude packets forwarded to {}",
            self.status_calls, self.packets_forwarded, self.target
        )
    }

    pub fn packets_forwarded(&self) -> u64 {
        self.packets_forwarded
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
