//! Serial Session - lifecycle of one serial connection
//!
//! A [`SerialSession`] owns at most one open port. Connecting opens the
//! device and starts a read loop on its own task; decoded text arrives on
//! the event channel returned by [`SerialSession::new`]. Disconnecting
//! cancels the loop, closes the writer and drops the port, and never fails.
//!
//! The session knows nothing about what the text means. Framing and
//! interpretation belong to the caller.
//!
//! # Example
//!
//! ```no_run
//! use serial_session::{NativePortOpener, SerialConfig, SerialSession, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SerialConfig {
//!         path: Some("/dev/ttyUSB0".to_string()),
//!         ..Default::default()
//!     };
//!     let (mut session, mut events) = SerialSession::new(NativePortOpener, config);
//!
//!     session.connect().await.unwrap();
//!     session.send("TEST").await.unwrap();
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             SessionEvent::Chunk { text, .. } => print!("{}", text),
//!             SessionEvent::Eof { .. } | SessionEvent::ReadFailed { .. } => break,
//!         }
//!     }
//!
//!     session.disconnect().await;
//! }
//! ```

mod config;
mod decoder;
mod error;
pub mod memory;
mod port;
mod session;

pub use config::{DEFAULT_BAUD_RATE, SerialConfig};
pub use decoder::Utf8StreamDecoder;
pub use error::SessionError;
pub use memory::MemoryPortOpener;
pub use port::{NativePortOpener, OpenedPort, PortInfo, PortOpener, PortReader, PortWriter};
pub use session::{ConnectionId, ConnectionState, SerialSession, SessionEvent};
