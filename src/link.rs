//! MAVLink UDP link to the vehicle.
//!
//! Ground-station side of a UDP connection: binds an ephemeral port, sends
//! v2-framed messages to a fixed vehicle address, and drains incoming
//! datagrams non-blocking so the host loop never stalls on the socket.

use std::io::{self, Cursor};
use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex, PoisonError};

use mavlink::common::MavMessage;
use mavlink::peek_reader::PeekReader;
use mavlink::MavHeader;

use crate::error::BridgeError;

/// MAV_COMP_ID_MISSIONPLANNER, the conventional GCS component id.
const GCS_COMPONENT_ID: u8 = 190;

/// Capability to push a MAVLink message toward the vehicle. Seam between
/// the live transmit sink and the concrete link, so tests can record
/// messages instead of opening sockets.
pub trait MavSender: Send {
    fn send_message(&mut self, msg: &MavMessage) -> Result<(), BridgeError>;
}

/// Non-blocking UDP MAVLink v2 endpoint talking to one vehicle.
pub struct VehicleLink {
    socket: UdpSocket,
    target: SocketAddr,
    system_id: u8,
    component_id: u8,
    sequence: u8,
    recv_buf: Vec<u8>,
}

impl VehicleLink {
    /// Bind an ephemeral local port and aim at the vehicle address.
    pub fn connect(target: SocketAddr, system_id: u8) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            socket,
            target,
            system_id,
            component_id: GCS_COMPONENT_ID,
            sequence: 0,
            recv_buf: vec![0u8; 280],
        })
    }

    /// Local address the link is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Vehicle address this link sends to.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Drain and parse all queued incoming MAVLink messages.
    pub fn poll_incoming(&mut self) -> Vec<(MavHeader, MavMessage)> {
        let mut messages = Vec::new();
        loop {
            match self.socket.recv_from(&mut self.recv_buf) {
                Ok((len, _addr)) => {
                    if let Some(msg) = parse_datagram(&self.recv_buf[..len]) {
                        messages.push(msg);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(_) => break,
            }
        }
        messages
    }
}

impl MavSender for VehicleLink {
    fn send_message(&mut self, msg: &MavMessage) -> Result<(), BridgeError> {
        let header = MavHeader {
            system_id: self.system_id,
            component_id: self.component_id,
            sequence: self.sequence,
        };
        self.sequence = self.sequence.wrapping_add(1);

        let mut buf = Cursor::new(Vec::with_capacity(280));
        mavlink::write_v2_msg(&mut buf, header, msg)
            .map_err(|e| BridgeError::MavlinkWrite(format!("{e:?}")))?;

        self.socket.send_to(&buf.into_inner(), self.target)?;
        Ok(())
    }
}

/// The link is shared between the live sink and the incoming-message poll
/// loop, so sending through a shared handle is also supported.
impl MavSender for Arc<Mutex<VehicleLink>> {
    fn send_message(&mut self, msg: &MavMessage) -> Result<(), BridgeError> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send_message(msg)
    }
}

fn parse_datagram(data: &[u8]) -> Option<(MavHeader, MavMessage)> {
    let cursor = Cursor::new(data);
    let mut reader = PeekReader::new(cursor);
    mavlink::read_v2_msg::<MavMessage, _>(&mut reader).ok()
}
