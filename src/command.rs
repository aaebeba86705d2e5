//! Command surface for RC overrides.
//!
//! Accepts direct channel/value updates and flight-mode switch selections,
//! both as typed calls (for scripting) and as `rc` / `switch` console lines,
//! and funnels them into the shared [`OverrideState`].

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::BridgeError;
use crate::override_state::{OverrideState, CHANNEL_COUNT, NO_OVERRIDE};

/// PWM values for flight-mode switch positions 0..6. Position 0 releases
/// the override on the mode channel.
pub const SWITCH_PWM: [u16; 7] = [0, 1165, 1295, 1425, 1555, 1685, 1815];

/// Kind of vehicle the overrides are aimed at; decides which parameter
/// names the flight-mode channel and what it defaults to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleType {
    Copter,
    Rover,
    Other,
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "copter" => Ok(Self::Copter),
            "rover" => Ok(Self::Rover),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown vehicle type '{other}'")),
        }
    }
}

/// Read access to vehicle parameters. A missing parameter is never an
/// error; the caller's default is substituted.
pub trait ParamSource: Send {
    fn get_param(&self, name: &str, default: f32) -> f32;
}

/// In-memory parameter table, filled from whatever parameter transport the
/// host provides.
#[derive(Debug, Default)]
pub struct ParamTable {
    values: HashMap<String, f32>,
}

impl ParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: f32) {
        self.values.insert(name.to_string(), value);
    }
}

impl ParamSource for ParamTable {
    fn get_param(&self, name: &str, default: f32) -> f32 {
        self.values.get(name).copied().unwrap_or(default)
    }
}

/// Target of an `rc` command: one channel (one-based) or all sixteen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelTarget {
    All,
    Channel(u8),
}

/// Outcome of a switch selection, for user-facing reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchAck {
    pub position: u8,
    pub pwm: u16,
    pub channel: u8,
}

/// Validates and applies override commands against the shared state.
pub struct CommandSurface<P: ParamSource> {
    state: Arc<OverrideState>,
    vehicle_type: VehicleType,
    params: P,
}

impl<P: ParamSource> CommandSurface<P> {
    pub fn new(state: Arc<OverrideState>, vehicle_type: VehicleType, params: P) -> Self {
        Self {
            state,
            vehicle_type,
            params,
        }
    }

    /// One-based flight-mode channel for this vehicle: `MODE_CH` on rovers,
    /// `FLTMODE_CH` otherwise, defaulting to 5 on copters and 8 on
    /// everything else. A parameter value outside 1..16 falls back to the
    /// default too.
    pub fn target_channel(&self) -> u8 {
        let default = match self.vehicle_type {
            VehicleType::Copter => 5u8,
            _ => 8u8,
        };
        let name = match self.vehicle_type {
            VehicleType::Rover => "MODE_CH",
            _ => "FLTMODE_CH",
        };
        let channel = self.params.get_param(name, f32::from(default)) as i64;
        if (1..=CHANNEL_COUNT as i64).contains(&channel) {
            channel as u8
        } else {
            default
        }
    }

    /// Select a flight-mode switch position (0 disables the override on the
    /// mode channel). Rejects positions above 6 without touching state.
    pub fn set_switch(&self, position: u8) -> Result<SwitchAck, BridgeError> {
        if position as usize >= SWITCH_PWM.len() {
            return Err(BridgeError::InvalidSwitch(position));
        }
        let channel = self.target_channel();
        let pwm = SWITCH_PWM[position as usize];
        self.state.set_channel(usize::from(channel) - 1, pwm)?;
        Ok(SwitchAck {
            position,
            pwm,
            channel,
        })
    }

    /// Apply a PWM value to one channel or to all sixteen. `-1` is
    /// shorthand for 65535, the release-override sentinel. The all-channel
    /// form commits as a single state update (one immediate transmit).
    pub fn set_channel_value(&self, target: ChannelTarget, value: i32) -> Result<(), BridgeError> {
        if !(-1..=i32::from(u16::MAX)).contains(&value) {
            return Err(BridgeError::InvalidValue(i64::from(value)));
        }
        let value = if value == -1 { NO_OVERRIDE } else { value as u16 };

        match target {
            ChannelTarget::All => self.state.set_all([value; CHANNEL_COUNT]),
            ChannelTarget::Channel(n) => {
                if !(1..=CHANNEL_COUNT as u8).contains(&n) {
                    return Err(BridgeError::InvalidChannelNumber(i64::from(n)));
                }
                self.state.set_channel(usize::from(n) - 1, value)
            }
        }
    }

    /// Handle one console line (`rc <channel|all> <pwmvalue>` or
    /// `switch <0-6>`), returning user-facing status or error text.
    pub fn handle_line(&self, line: &str) -> String {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["rc", target, value] => self.handle_rc(target, value),
            ["rc", ..] => "Usage: rc <channel|all> <pwmvalue>".to_string(),
            ["switch", position] => self.handle_switch(position),
            ["switch", ..] => "Usage: switch <0|1|2|3|4|5|6>".to_string(),
            [] => String::new(),
            _ => "Unknown command. Usage: rc <channel|all> <pwmvalue> | switch <0-6>".to_string(),
        }
    }

    fn handle_rc(&self, target: &str, value: &str) -> String {
        let Ok(value) = value.parse::<i32>() else {
            return "Usage: rc <channel|all> <pwmvalue>".to_string();
        };
        let target = if target == "all" {
            ChannelTarget::All
        } else {
            match target.parse::<i64>() {
                // Out-of-range numbers go through validation for the
                // proper rejection message.
                Ok(n) => ChannelTarget::Channel(n.clamp(0, 255) as u8),
                Err(_) => return "Channel must be between 1 and 16 or 'all'".to_string(),
            }
        };
        match self.set_channel_value(target, value) {
            Ok(()) => match target {
                ChannelTarget::All => format!("Set override on all channels to {value}"),
                ChannelTarget::Channel(n) => format!("Set override on channel {n} to {value}"),
            },
            Err(BridgeError::InvalidValue(_)) => {
                "PWM value must be an integer between -1 and 65535".to_string()
            }
            Err(BridgeError::InvalidChannelNumber(_)) => {
                "Channel must be between 1 and 16 or 'all'".to_string()
            }
            Err(e) => format!("Override send failed: {e}"),
        }
    }

    fn handle_switch(&self, position: &str) -> String {
        let Ok(position) = position.parse::<u8>() else {
            return "Invalid switch value. Use 1-6 for flight modes, '0' to disable".to_string();
        };
        match self.set_switch(position) {
            Ok(ack) if ack.position == 0 => "Disabled RC switch override".to_string(),
            Ok(ack) => format!(
                "Set RC switch override to {} (PWM={} channel={})",
                ack.position, ack.pwm, ack.channel
            ),
            Err(BridgeError::InvalidSwitch(_)) => {
                "Invalid switch value. Use 1-6 for flight modes, '0' to disable".to_string()
            }
            Err(e) => format!("Override send failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::override_state::{ChannelVector, HOLD_REPEATS};
    use crate::sink::OverrideSink;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<ChannelVector>>>,
    }

    impl RecordingSink {
        fn sent(&self) -> Vec<ChannelVector> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl OverrideSink for RecordingSink {
        fn transmit(&mut self, channels: &ChannelVector) -> Result<(), BridgeError> {
            self.sent.lock().unwrap().push(*channels);
            Ok(())
        }

        fn rate_hz(&self) -> u32 {
            20
        }
    }

    fn surface(
        vehicle_type: VehicleType,
        params: ParamTable,
    ) -> (CommandSurface<ParamTable>, Arc<OverrideState>, RecordingSink) {
        let sink = RecordingSink::default();
        let state = Arc::new(OverrideState::new(Box::new(sink.clone())));
        let surface = CommandSurface::new(state.clone(), vehicle_type, params);
        (surface, state, sink)
    }

    #[test]
    fn test_switch_on_copter_defaults_to_channel_5() {
        let (surface, state, _) = surface(VehicleType::Copter, ParamTable::new());
        let ack = surface.set_switch(3).unwrap();
        assert_eq!(ack.channel, 5);
        assert_eq!(ack.pwm, 1425);
        assert_eq!(state.get_channel(4), Some(1425));
    }

    #[test]
    fn test_switch_on_rover_reads_mode_ch_param() {
        let mut params = ParamTable::new();
        params.set("MODE_CH", 7.0);
        let (surface, state, _) = surface(VehicleType::Rover, params);
        let ack = surface.set_switch(6).unwrap();
        assert_eq!(ack.channel, 7);
        assert_eq!(state.get_channel(6), Some(1815));
    }

    #[test]
    fn test_switch_default_channel_8_for_other_vehicles() {
        let (surface, state, _) = surface(VehicleType::Other, ParamTable::new());
        surface.set_switch(1).unwrap();
        assert_eq!(state.get_channel(7), Some(1165));
    }

    #[test]
    fn test_switch_out_of_range_param_falls_back_to_default() {
        let mut params = ParamTable::new();
        params.set("FLTMODE_CH", 42.0);
        let (surface, _, _) = surface(VehicleType::Copter, params);
        assert_eq!(surface.target_channel(), 5);
    }

    #[test]
    fn test_switch_zero_disables_override() {
        let (surface, state, _) = surface(VehicleType::Copter, ParamTable::new());
        surface.set_switch(3).unwrap();
        surface.set_switch(0).unwrap();
        assert_eq!(state.get_channel(4), Some(0));
    }

    #[test]
    fn test_switch_position_7_rejected_without_mutation() {
        let (surface, state, sink) = surface(VehicleType::Copter, ParamTable::new());
        assert!(matches!(
            surface.set_switch(7),
            Err(BridgeError::InvalidSwitch(7))
        ));
        assert_eq!(state.channels(), [0; CHANNEL_COUNT]);
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn test_sentinel_minus_one_becomes_no_override() {
        let (surface, state, _) = surface(VehicleType::Copter, ParamTable::new());
        surface
            .set_channel_value(ChannelTarget::Channel(5), -1)
            .unwrap();
        assert_eq!(state.get_channel(4), Some(NO_OVERRIDE));
    }

    #[test]
    fn test_channel_17_rejected_without_mutation() {
        let (surface, state, sink) = surface(VehicleType::Copter, ParamTable::new());
        assert!(matches!(
            surface.set_channel_value(ChannelTarget::Channel(17), 100),
            Err(BridgeError::InvalidChannelNumber(17))
        ));
        assert_eq!(state.channels(), [0; CHANNEL_COUNT]);
        assert!(sink.sent().is_empty());
    }

    #[test]
    fn test_value_out_of_range_rejected() {
        let (surface, state, _) = surface(VehicleType::Copter, ParamTable::new());
        assert!(matches!(
            surface.set_channel_value(ChannelTarget::Channel(1), 65536),
            Err(BridgeError::InvalidValue(65536))
        ));
        assert!(matches!(
            surface.set_channel_value(ChannelTarget::Channel(1), -2),
            Err(BridgeError::InvalidValue(-2))
        ));
        assert_eq!(state.channels(), [0; CHANNEL_COUNT]);
    }

    #[test]
    fn test_all_channels_commit_as_one_update() {
        let (surface, state, sink) = surface(VehicleType::Copter, ParamTable::new());
        surface.set_channel_value(ChannelTarget::All, 1500).unwrap();
        assert_eq!(state.channels(), [1500; CHANNEL_COUNT]);
        assert_eq!(state.hold_repeats(), HOLD_REPEATS);
        assert_eq!(sink.sent(), vec![[1500; CHANNEL_COUNT]]);
    }

    #[test]
    fn test_handle_line_rc_all() {
        let (surface, state, _) = surface(VehicleType::Copter, ParamTable::new());
        let reply = surface.handle_line("rc all 1500");
        assert_eq!(reply, "Set override on all channels to 1500");
        assert_eq!(state.channels(), [1500; CHANNEL_COUNT]);
    }

    #[test]
    fn test_handle_line_rc_single_channel() {
        let (surface, state, _) = surface(VehicleType::Copter, ParamTable::new());
        let reply = surface.handle_line("rc 3 1600");
        assert_eq!(reply, "Set override on channel 3 to 1600");
        assert_eq!(state.get_channel(2), Some(1600));
    }

    #[test]
    fn test_handle_line_errors() {
        let (surface, _, _) = surface(VehicleType::Copter, ParamTable::new());
        assert_eq!(surface.handle_line("rc 3"), "Usage: rc <channel|all> <pwmvalue>");
        assert_eq!(
            surface.handle_line("rc 17 100"),
            "Channel must be between 1 and 16 or 'all'"
        );
        assert_eq!(
            surface.handle_line("rc 3 70000"),
            "PWM value must be an integer between -1 and 65535"
        );
        assert_eq!(
            surface.handle_line("switch 7"),
            "Invalid switch value. Use 1-6 for flight modes, '0' to disable"
        );
        assert_eq!(surface.handle_line("switch"), "Usage: switch <0|1|2|3|4|5|6>");
    }

    #[test]
    fn test_handle_line_switch() {
        let (surface, _, _) = surface(VehicleType::Copter, ParamTable::new());
        assert_eq!(
            surface.handle_line("switch 3"),
            "Set RC switch override to 3 (PWM=1425 channel=5)"
        );
        assert_eq!(surface.handle_line("switch 0"), "Disabled RC switch override");
    }
}
