/// Errors that can occur while handling RC overrides or OSC traffic.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("channel index {0} out of range (0-15)")]
    InvalidChannel(usize),

    #[error("channel number {0} out of range (1-16)")]
    InvalidChannelNumber(i64),

    #[error("PWM value {0} out of range (-1 to 65535)")]
    InvalidValue(i64),

    #[error("switch position {0} out of range (0-6)")]
    InvalidSwitch(u8),

    #[error("MAVLink write failed: {0}")]
    MavlinkWrite(String),

    #[error("OSC encode failed: {0}")]
    OscEncode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
