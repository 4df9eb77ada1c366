//! Terminal input.
//!
//! Lines starting with `/` are panel verbs; anything else is sent to the
//! controller as a free-text command.

use irrigation_protocol::SensorId;

pub const HELP: &str = "\
Panel commands:
  /connect, /disconnect, /toggle   open or close the serial connection
  /port <path>                     device used by the next connect
  /ports                           list serial ports
  /test                            send TEST
  /reset                           send RESET
  /irrigate <plant> [seconds]      water plant 1 or 2
  /dry [value]                     send CALIBRAR:SECO (default: dry limit field)
  /wet [value]                     send CALIBRAR:UMIDO (default: wet limit field)
  /interval [value]                send INTERVALO (default: interval field)
  /status                          show sensors and settings
  /log [n]                         show the last n log lines
  /help                            this text
  /quit                            disconnect and exit
Any other line is sent as-is.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    Toggle,
    Connect,
    Disconnect,
    SelectPort(String),
    ListPorts,
    Test,
    Reset,
    Irrigate { plant: SensorId, seconds: u32 },
    CalibrateDry(Option<String>),
    CalibrateWet(Option<String>),
    Interval(Option<String>),
    Send(String),
    Status,
    Log(usize),
    Help,
    Quit,
    /// Blank line
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command /{0} (try /help)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("no plant {0}; plants are 1 and 2")]
    NoSuchPlant(String),
}

/// Parse one line of terminal input
pub fn parse_input(line: &str, default_irrigation_secs: u32) -> Result<UserAction, InputError> {
    let line = line.trim();
    let Some(verb_line) = line.strip_prefix('/') else {
        if line.is_empty() {
            return Ok(UserAction::Nothing);
        }
        return Ok(UserAction::Send(line.to_string()));
    };

    let mut words = verb_line.split_whitespace();
    let verb = words.next().unwrap_or("").to_lowercase();
    let args: Vec<&str> = words.collect();
    let first = args.first().map(|s| s.to_string());

    let action = match (verb.as_str(), args.len()) {
        ("connect", 0) => UserAction::Connect,
        ("disconnect", 0) => UserAction::Disconnect,
        ("toggle", 0) => UserAction::Toggle,
        ("port", 1) => UserAction::SelectPort(args[0].to_string()),
        ("port", _) => return Err(InputError::Usage("/port <path>")),
        ("ports", 0) => UserAction::ListPorts,
        ("test", 0) => UserAction::Test,
        ("reset", 0) => UserAction::Reset,
        ("irrigate", 1 | 2) => {
            let plant = args[0]
                .parse()
                .ok()
                .and_then(SensorId::from_number)
                .ok_or_else(|| InputError::NoSuchPlant(args[0].to_string()))?;
            let seconds = match args.get(1) {
                Some(secs) => secs
                    .parse()
                    .map_err(|_| InputError::Usage("/irrigate <plant> [seconds]"))?,
                None => default_irrigation_secs,
            };
            UserAction::Irrigate { plant, seconds }
        }
        ("irrigate", _) => return Err(InputError::Usage("/irrigate <plant> [seconds]")),
        ("dry", 0 | 1) => UserAction::CalibrateDry(first),
        ("wet", 0 | 1) => UserAction::CalibrateWet(first),
        ("interval", 0 | 1) => UserAction::Interval(first),
        ("status", 0) => UserAction::Status,
        ("log", 0) => UserAction::Log(20),
        ("log", 1) => UserAction::Log(
            args[0]
                .parse()
                .map_err(|_| InputError::Usage("/log [n]"))?,
        ),
        ("help", _) => UserAction::Help,
        ("quit" | "exit", 0) => UserAction::Quit,
        (other, _) => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_text() {
        assert_eq!(
            parse_input("  STATUS ", 5),
            Ok(UserAction::Send("STATUS".into()))
        );
        assert_eq!(parse_input("   ", 5), Ok(UserAction::Nothing));
    }

    #[test]
    fn test_irrigate() {
        assert_eq!(
            parse_input("/irrigate 2 10", 5),
            Ok(UserAction::Irrigate {
                plant: SensorId::Two,
                seconds: 10
            })
        );
        assert_eq!(
            parse_input("/irrigate 1", 5),
            Ok(UserAction::Irrigate {
                plant: SensorId::One,
                seconds: 5
            })
        );
        assert_eq!(
            parse_input("/irrigate 3", 5),
            Err(InputError::NoSuchPlant("3".into()))
        );
        assert!(matches!(
            parse_input("/irrigate 1 soon", 5),
            Err(InputError::Usage(_))
        ));
    }

    #[test]
    fn test_field_commands() {
        assert_eq!(parse_input("/dry", 5), Ok(UserAction::CalibrateDry(None)));
        assert_eq!(
            parse_input("/wet 1200", 5),
            Ok(UserAction::CalibrateWet(Some("1200".into())))
        );
        assert_eq!(
            parse_input("/INTERVAL 30", 5),
            Ok(UserAction::Interval(Some("30".into())))
        );
    }

    #[test]
    fn test_connection_verbs() {
        assert_eq!(parse_input("/connect", 5), Ok(UserAction::Connect));
        assert_eq!(parse_input("/toggle", 5), Ok(UserAction::Toggle));
        assert_eq!(
            parse_input("/port /dev/ttyUSB0", 5),
            Ok(UserAction::SelectPort("/dev/ttyUSB0".into()))
        );
        assert_eq!(parse_input("/quit", 5), Ok(UserAction::Quit));
    }

    #[test]
    fn test_unknown_verb() {
        assert_eq!(
            parse_input("/water", 5),
            Err(InputError::Unknown("water".into()))
        );
        assert_eq!(parse_input("/", 5), Err(InputError::Unknown(String::new())));
    }

    #[test]
    fn test_log_count() {
        assert_eq!(parse_input("/log", 5), Ok(UserAction::Log(20)));
        assert_eq!(parse_input("/log 5", 5), Ok(UserAction::Log(5)));
    }
}
