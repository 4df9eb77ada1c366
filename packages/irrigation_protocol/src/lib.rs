//! Irrigation Protocol - wire format of the irrigation controller
//!
//! The controller speaks newline-delimited text over a serial link. Each
//! inbound record is either a JSON object tagged with a `type` field
//! (`data`, `log`, `config`) or free text. Outbound records are plain
//! commands such as `TEST` or `IRRIGAR:1:5`.
//!
//! This crate has no I/O. It turns decoded text into [`PanelEvent`]s that a
//! presentation layer applies, and it renders [`Command`]s into wire lines.
//!
//! # Example
//!
//! ```
//! use irrigation_protocol::{Command, PanelEvent, route_chunk};
//!
//! let events = route_chunk("{\"type\":\"data\",\"sensor1\":42,\"humidity1\":55}\nboot ok\n");
//! assert_eq!(events.len(), 2);
//! assert!(matches!(events[0], PanelEvent::Sensor(_)));
//!
//! assert_eq!(Command::Irrigate { plant: 1, seconds: 5 }.to_string(), "IRRIGAR:1:5");
//! ```

mod command;
mod error;
mod inbound;
mod log_buffer;
mod router;
mod severity;
mod status;

pub use command::Command;
pub use error::CommandError;
pub use inbound::{ConfigMessage, DataMessage, InboundMessage, LogMessage, Record, Scalar, classify_line};
pub use log_buffer::{DEFAULT_LOG_CAPACITY, LogBuffer, LogEntry};
pub use router::{
    ConfigUpdate, DEVICE_PREFIX, LineAssembler, PanelEvent, SensorId, SensorUpdate, route_chunk,
    route_line, split_lines,
};
pub use severity::Severity;
pub use status::{StatusClass, TOO_DRY, TOO_WET};
