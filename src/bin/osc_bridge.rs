//! RC override / OSC bridge host.
//!
//! Wires the pieces together: a MAVLink UDP link to the vehicle, the
//! override state with its periodic scheduler, a console for `rc` /
//! `switch` / `osc` commands, an OSC listener for remote-controller events,
//! and the attitude-to-OSC forwarder.
//!
//! Usage:
//!   cargo run --bin osc_bridge -- [OPTIONS]
//!
//! Options:
//!   --vehicle <ADDR>        Vehicle MAVLink UDP address (default: 127.0.0.1:14550)
//!   --vehicle-type <TYPE>   copter | rover | other (default: copter)
//!   --target-system <N>     MAVLink target system id (default: 1)
//!   --target-component <N>  MAVLink target component id (default: 1)
//!   --sitl <ADDR>           Send overrides as raw byte blocks to this
//!                           simulator RC port instead of RC_CHANNELS_OVERRIDE
//!   --osc-listen <ADDR>     OSC listen address (default: 127.0.0.1:9998)
//!   --osc-send <ADDR>       OSC telemetry target (default: 127.0.0.1:9999)

use std::env;
use std::io::BufRead;
use std::net::SocketAddr;
use std::process;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use mav_osc_bridge::{
    AttitudeForwarder, ChannelTarget, CommandSurface, LiveSink, OscEventBridge, OverrideScheduler,
    OverrideSink, OverrideState, ParamTable, SimSink, UdpWriter, VehicleLink, VehicleType,
};

struct Args {
    vehicle: SocketAddr,
    vehicle_type: VehicleType,
    target_system: u8,
    target_component: u8,
    sitl: Option<SocketAddr>,
    osc_listen: SocketAddr,
    osc_send: SocketAddr,
}

fn parse_args() -> Args {
    let mut args = Args {
        vehicle: "127.0.0.1:14550".parse().unwrap(),
        vehicle_type: VehicleType::Copter,
        target_system: 1,
        target_component: 1,
        sitl: None,
        osc_listen: "127.0.0.1:9998".parse().unwrap(),
        osc_send: "127.0.0.1:9999".parse().unwrap(),
    };

    let raw: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--vehicle" => {
                i += 1;
                args.vehicle = parse_addr_arg(&raw, i, "vehicle");
            }
            "--vehicle-type" => {
                i += 1;
                args.vehicle_type = required_arg(&raw, i, "vehicle-type")
                    .parse()
                    .unwrap_or_else(|e| {
                        eprintln!("Error: {e}");
                        process::exit(1);
                    });
            }
            "--target-system" => {
                i += 1;
                args.target_system = parse_u8_arg(&raw, i, "target-system");
            }
            "--target-component" => {
                i += 1;
                args.target_component = parse_u8_arg(&raw, i, "target-component");
            }
            "--sitl" => {
                i += 1;
                args.sitl = Some(parse_addr_arg(&raw, i, "sitl"));
            }
            "--osc-listen" => {
                i += 1;
                args.osc_listen = parse_addr_arg(&raw, i, "osc-listen");
            }
            "--osc-send" => {
                i += 1;
                args.osc_send = parse_addr_arg(&raw, i, "osc-send");
            }
            "-h" | "--help" => {
                print_usage();
                process::exit(0);
            }
            other => {
                eprintln!("Unknown option: {other}");
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    args
}

fn required_arg<'a>(raw: &'a [String], i: usize, name: &str) -> &'a str {
    raw.get(i).map(String::as_str).unwrap_or_else(|| {
        eprintln!("Error: --{name} requires a value");
        process::exit(1);
    })
}

fn parse_addr_arg(raw: &[String], i: usize, name: &str) -> SocketAddr {
    required_arg(raw, i, name).parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid address for --{name}");
        process::exit(1);
    })
}

fn parse_u8_arg(raw: &[String], i: usize, name: &str) -> u8 {
    required_arg(raw, i, name).parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for --{name}");
        process::exit(1);
    })
}

fn print_usage() {
    eprintln!(
        "Usage: osc_bridge [OPTIONS]\n\
         \n\
         Options:\n\
         \x20 --vehicle <ADDR>        Vehicle MAVLink UDP address (default: 127.0.0.1:14550)\n\
         \x20 --vehicle-type <TYPE>   copter | rover | other (default: copter)\n\
         \x20 --target-system <N>     MAVLink target system id (default: 1)\n\
         \x20 --target-component <N>  MAVLink target component id (default: 1)\n\
         \x20 --sitl <ADDR>           Send overrides as raw byte blocks to this simulator RC port\n\
         \x20 --osc-listen <ADDR>     OSC listen address (default: 127.0.0.1:9998)\n\
         \x20 --osc-send <ADDR>       OSC telemetry target (default: 127.0.0.1:9999)\n\
         \x20 -h, --help              Show this help"
    );
}

/// Reads console lines on a dedicated thread so the main loop never blocks
/// on stdin.
fn spawn_console() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        })
        .expect("Failed to spawn console thread");
    rx
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    let args = parse_args();

    println!("=== MAVLink OSC bridge ===");
    println!(
        "Vehicle: {} ({:?}), OSC in: {}, OSC out: {}",
        args.vehicle, args.vehicle_type, args.osc_listen, args.osc_send
    );

    let link = Arc::new(Mutex::new(
        VehicleLink::connect(args.vehicle, 255).expect("Failed to open vehicle link"),
    ));

    let sink: Box<dyn OverrideSink> = match args.sitl {
        Some(addr) => {
            println!("Overrides: byte blocks to simulator at {addr} (20 Hz)");
            Box::new(SimSink::new(
                UdpWriter::connect(addr).expect("Failed to open simulator RC socket"),
            ))
        }
        None => {
            println!(
                "Overrides: RC_CHANNELS_OVERRIDE to system {} component {} (1 Hz)",
                args.target_system, args.target_component
            );
            Box::new(LiveSink::new(
                link.clone(),
                args.target_system,
                args.target_component,
            ))
        }
    };

    let state = Arc::new(OverrideState::new(sink));
    let mut scheduler = OverrideScheduler::new(state.clone());
    let surface = CommandSurface::new(state.clone(), args.vehicle_type, ParamTable::new());

    let (osc_bridge, rc_events) =
        OscEventBridge::spawn(args.osc_listen).expect("Failed to bind OSC listen address");
    let mut forwarder =
        AttitudeForwarder::new(args.osc_send).expect("Failed to open OSC telemetry socket");

    let console = spawn_console();

    println!("Console ready: rc <channel|all> <pwm> | switch <0-6> | osc status | quit");

    let mut interval = tokio::time::interval(tokio::time::Duration::from_millis(10));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    'main: loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("\nShutdown requested.");
                break;
            }
            _ = interval.tick() => {
                // Console commands
                loop {
                    match console.try_recv() {
                        Ok(line) => {
                            let tokens: Vec<&str> = line.split_whitespace().collect();
                            match tokens.as_slice() {
                                [] => {}
                                ["quit"] | ["exit"] => break 'main,
                                ["osc", rest @ ..] => println!("{}", forwarder.handle_command(rest)),
                                _ => {
                                    let reply = surface.handle_line(&line);
                                    if !reply.is_empty() {
                                        println!("{reply}");
                                    }
                                }
                            }
                        }
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => break 'main,
                    }
                }

                // Remote controller events
                while let Ok(event) = rc_events.try_recv() {
                    if let Err(e) = surface.set_channel_value(
                        ChannelTarget::Channel(event.channel),
                        event.value,
                    ) {
                        log::warn!("dropping remote event {event:?}: {e}");
                    }
                }

                // Periodic override resend
                if let Err(e) = scheduler.idle_tick() {
                    eprintln!("Override send failed: {e}");
                }

                // Vehicle telemetry out as OSC
                let incoming = link
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .poll_incoming();
                for (_header, msg) in incoming {
                    if let Err(e) = forwarder.handle_message(&msg) {
                        log::warn!("attitude forward failed: {e}");
                    }
                }
            }
        }
    }

    osc_bridge.shutdown();
    println!(
        "Bridge stopped. {} attitude packets forwarded.",
        forwarder.packets_forwarded()
    );
}
