use std::fmt;

use crate::error::CommandError;

/// Outbound command understood by the controller firmware.
///
/// `Display` renders the wire form; the session appends the terminating
/// newline when it writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Self-test (`TEST`)
    Test,
    /// Restart the controller (`RESET`)
    Reset,
    /// Open the valve of `plant` for `seconds` (`IRRIGAR:<plant>:<seconds>`)
    Irrigate { plant: u8, seconds: u32 },
    /// Store the dry threshold (`CALIBRAR:SECO:<value>`)
    CalibrateDry(u32),
    /// Store the wet threshold (`CALIBRAR:UMIDO:<value>`)
    CalibrateWet(u32),
    /// Set the sensor read interval (`INTERVALO:<value>`)
    Interval(u32),
    /// Arbitrary single-line text typed by the user
    Custom(String),
}

impl Command {
    /// Build a free-text command. Surrounding whitespace is trimmed; empty
    /// input and embedded line breaks are rejected.
    pub fn custom(text: &str) -> Result<Self, CommandError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommandError::Empty);
        }
        if text.contains(['\n', '\r']) {
            return Err(CommandError::MultiLine);
        }
        Ok(Command::Custom(text.to_string()))
    }

    /// Parse a numeric argument as read from an input field.
    pub fn parse_arg(field: &'static str, value: &str) -> Result<u32, CommandError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(CommandError::MissingValue(field));
        }
        value.parse().map_err(|_| CommandError::InvalidValue {
            field,
            value: value.to_string(),
        })
    }

}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Test => f.write_str("TEST"),
            Command::Reset => f.write_str("RESET"),
            Command::Irrigate { plant, seconds } => write!(f, "IRRIGAR:{plant}:{seconds}"),
            Command::CalibrateDry(value) => write!(f, "CALIBRAR:SECO:{value}"),
            Command::CalibrateWet(value) => write!(f, "CALIBRAR:UMIDO:{value}"),
            Command::Interval(value) => write!(f, "INTERVALO:{value}"),
            Command::Custom(text) => f.write_str(text),
        }
    }
}
