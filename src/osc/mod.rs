//! OSC bridging: inbound remote-controller events and outbound attitude
//! telemetry.
//!
//! The inbound side listens for OSC messages from a remote controller
//! (thrust/roll/pitch/yaw) on a background thread and re-expresses each as
//! an [`RcEvent`] on an mpsc queue. The loop that owns the override state
//! drains the queue and applies the updates, so the listener thread never
//! touches shared state directly.

mod telemetry;

pub use telemetry::AttitudeForwarder;

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rosc::{OscMessage, OscPacket, OscType};

use crate::error::BridgeError;

/// Inbound addresses the remote controller sends on.
pub const ADDR_THRUST: &str = "/thrust_from_max";
pub const ADDR_ROLL: &str = "/roll_from_max";
pub const ADDR_PITCH: &str = "/pitch_from_max";
pub const ADDR_YAW: &str = "/yaw_from_max";
/// Diagnostic address; logged, never mutates channel state.
pub const ADDR_DEBUG: &str = "/debug_from_max";

/// How long the listener thread blocks on the socket before re-checking
/// the shutdown flag.
const RECV_TIMEOUT: Duration = Duration::from_millis(200);

/// A channel update requested by the remote controller. `channel` is
/// one-based; `value` goes through the same validation as a console `rc`
/// command (so `-1` releases the override).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcEvent {
    pub channel: u8,
    pub value: i32,
}

/// Map an inbound OSC message to a channel update: thrust, roll, pitch,
/// and yaw land on channels 3, 1, 2, and 4 respectively. Debug and unknown
/// addresses produce no event.
pub fn map_message(msg: &OscMessage) -> Option<RcEvent> {
    let channel = match msg.addr.as_str() {
        ADDR_ROLL => 1,
        ADDR_PITCH => 2,
        ADDR_THRUST => 3,
        ADDR_YAW => 4,
        ADDR_DEBUG => {
            log::info!("received debug event");
            return None;
        }
        other => {
            log::debug!("ignoring OSC message for unmapped address {other}");
            return None;
        }
    };
    let value = numeric_arg(msg)?;
    Some(RcEvent { channel, value })
}

/// First argument of the message as an integer PWM value, if it is numeric.
fn numeric_arg(msg: &OscMessage) -> Option<i32> {
    let value = match msg.args.first()? {
        OscType::Int(v) => i64::from(*v),
        OscType::Long(v) => *v,
        OscType::Float(v) => v.round() as i64,
        OscType::Double(v) => v.round() as i64,
        other => {
            log::debug!("ignoring non-numeric OSC argument {other:?} on {}", msg.addr);
            return None;
        }
    };
    if (-1..=i64::from(u16::MAX)).contains(&value) {
        Some(value as i32)
    } else {
        log::debug!("ignoring out-of-range OSC value {value} on {}", msg.addr);
        None
    }
}

/// Background UDP listener translating OSC packets into [`RcEvent`]s.
pub struct OscEventBridge {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl OscEventBridge {
    /// Bind `listen` and start the listener thread. Returns the bridge
    /// handle and the queue the owner of the override state should drain.
    pub fn spawn(listen: SocketAddr) -> Result<(Self, Receiver<RcEvent>), BridgeError> {
        let socket = UdpSocket::bind(listen)?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        let local_addr = socket.local_addr()?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let flag = shutdown.clone();
        let handle = thread::Builder::new()
            .name("osc-listener".to_string())
            .spawn(move || listen_loop(socket, tx, flag))?;

        log::info!("OSC listener serving on {local_addr}");
        Ok((
            Self {
                shutdown,
                handle,
                local_addr,
            },
            rx,
        ))
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the listener thread and wait for it to exit.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}

fn listen_loop(socket: UdpSocket, tx: Sender<RcEvent>, shutdown: Arc<AtomicBool>) {
    let mut buf = [0u8; rosc::decoder::MTU];
    while !shutdown.load(Ordering::Relaxed) {
        match socket.recv_from(&mut buf) {
            Ok((len, _addr)) => match rosc::decoder::decode_udp(&buf[..len]) {
                Ok((_, packet)) => dispatch_packet(packet, &tx),
                Err(e) => log::debug!("discarding malformed OSC datagram: {e:?}"),
            },
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                log::warn!("OSC listener socket error: {e}");
                break;
            }
        }
    }
}

fn dispatch_packet(packet: OscPacket, tx: &Sender<RcEvent>) {
    match packet {
        OscPacket::Message(msg) => {
            if let Some(event) = map_message(&msg) {
                // The receiver going away just means the host is shutting down.
                let _ = tx.send(event);
            }
        }
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                dispatch_packet(inner, tx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    #[test]
    fn test_address_to_channel_mapping() {
        let cases = [
            (ADDR_ROLL, 1),
            (ADDR_PITCH, 2),
            (ADDR_THRUST, 3),
            (ADDR_YAW, 4),
        ];
        for (addr, channel) in cases {
            let event = map_message(&message(addr, vec![OscType::Float(1500.0)]))
                .unwrap_or_else(|| panic!("{addr} should map"));
            assert_eq!(event, RcEvent { channel, value: 1500 });
        }
    }

    #[test]
    fn test_debug_and_unknown_addresses_produce_no_event() {
        assert!(map_message(&message(ADDR_DEBUG, vec![OscType::Int(1)])).is_none());
        assert!(map_message(&message("/elsewhere", vec![OscType::Int(1)])).is_none());
    }

    #[test]
    fn test_numeric_argument_conversions() {
        assert_eq!(
            map_message(&message(ADDR_THRUST, vec![OscType::Int(1200)])),
            Some(RcEvent {
                channel: 3,
                value: 1200
            })
        );
        assert_eq!(
            map_message(&message(ADDR_THRUST, vec![OscType::Double(1499.6)])),
            Some(RcEvent {
                channel: 3,
                value: 1500
            })
        );
        // Release sentinel passes through.
        assert_eq!(
            map_message(&message(ADDR_THRUST, vec![OscType::Int(-1)])),
            Some(RcEvent {
                channel: 3,
                value: -1
            })
        );
    }

    #[test]
    fn test_rejects_out_of_range_and_non_numeric() {
        assert!(map_message(&message(ADDR_THRUST, vec![OscType::Int(70000)])).is_none());
        assert!(map_message(&message(ADDR_THRUST, vec![OscType::Int(-2)])).is_none());
        assert!(map_message(&message(
            ADDR_THRUST,
            vec![OscType::String("fast".to_string())]
        ))
        .is_none());
        assert!(map_message(&message(ADDR_THRUST, vec![])).is_none());
    }

    #[test]
    fn test_bridge_loopback() {
        let (bridge, rx) = OscEventBridge::spawn("127.0.0.1:0".parse().unwrap()).unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let packet = OscPacket::Message(message(ADDR_ROLL, vec![OscType::Float(1600.0)]));
        let bytes = rosc::encoder::encode(&packet).unwrap();
        sender.send_to(&bytes, bridge.local_addr()).unwrap();

        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(
            event,
            RcEvent {
                channel: 1,
                value: 1600
            }
        );

        bridge.shutdown();
    }

    #[test]
    fn test_bridge_flattens_bundles() {
        let (bridge, rx) = OscEventBridge::spawn("127.0.0.1:0".parse().unwrap()).unwrap();

        let bundle = OscPacket::Bundle(rosc::OscBundle {
            timetag: rosc::OscTime {
                seconds: 0,
                fractional: 0,
            },
            content: vec![
                OscPacket::Message(message(ADDR_THRUST, vec![OscType::Int(1100)])),
                OscPacket::Message(message(ADDR_YAW, vec![OscType::Int(1900)])),
            ],
        });
        let bytes = rosc::encoder::encode(&bundle).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(&bytes, bridge.local_addr()).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(
            first,
            RcEvent {
                channel: 3,
                value: 1100
            }
        );
        assert_eq!(
            second,
            RcEvent {
                channel: 4,
                value: 1900
            }
        );

        bridge.shutdown();
    }
}
