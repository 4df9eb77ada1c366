use serde::{Deserialize, Serialize};

/// Baud rate of the controller's USB bridge
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Configuration for opening a serial port.
///
/// Framing is fixed at 8 data bits, 1 stop bit, no parity and no flow
/// control; only the device and speed are tunable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path (`/dev/ttyUSB0`, `COM3`). `None` selects the single
    /// detected USB serial adapter.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: None,
            baud_rate: default_baud_rate(),
        }
    }
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
