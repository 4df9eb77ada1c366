use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SerialConfig;
use crate::decoder::Utf8StreamDecoder;
use crate::error::SessionError;
use crate::port::{PortInfo, PortOpener, PortReader, PortWriter};

const READ_BUFFER_SIZE: usize = 4096;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Identifies one open connection. Each successful connect gets a new id,
/// so events from a torn-down read loop can be told apart.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Output of the read loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Decoded text from one read
    Chunk { id: ConnectionId, text: String },
    /// The device closed the stream
    Eof { id: ConnectionId },
    /// A read failed; the loop has stopped
    ReadFailed { id: ConnectionId, error: String },
}

impl SessionEvent {
    pub fn connection(&self) -> ConnectionId {
        match self {
            SessionEvent::Chunk { id, .. }
            | SessionEvent::Eof { id }
            | SessionEvent::ReadFailed { id, .. } => *id,
        }
    }
}

/// The one serial connection of the process.
///
/// Owned by a single caller; every lifecycle method takes `&mut self`, so
/// at most one write is in flight at a time.
pub struct SerialSession<O: PortOpener> {
    opener: O,
    config: SerialConfig,
    state: ConnectionState,
    connection: Option<ConnectionId>,
    next_id: u64,
    port_name: Option<String>,
    writer: Option<PortWriter>,
    reader_task: Option<JoinHandle<()>>,
    keep_reading: Arc<AtomicBool>,
    cancel: Option<CancellationToken>,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl<O: PortOpener> SerialSession<O> {
    /// Create a disconnected session and the channel its read loops report on
    pub fn new(opener: O, config: SerialConfig) -> (Self, mpsc::Receiver<SessionEvent>) {
        Self::with_event_capacity(opener, config, EVENT_CHANNEL_CAPACITY)
    }

    fn with_event_capacity(
        opener: O,
        config: SerialConfig,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let session = Self {
            opener,
            config,
            state: ConnectionState::Disconnected,
            connection: None,
            next_id: 1,
            port_name: None,
            writer: None,
            reader_task: None,
            keep_reading: Arc::new(AtomicBool::new(false)),
            cancel: None,
            event_tx,
        };
        (session, event_rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Id of the open connection, if any
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Change the device used by the next connect
    pub fn set_port_path(&mut self, path: Option<String>) {
        self.config.path = path;
    }

    /// Whether the read loop of the open connection is still running
    pub fn is_reading(&self) -> bool {
        self.reader_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Check platform support for serial devices
    pub fn probe(&self) -> Result<(), SessionError> {
        self.opener.probe()
    }

    pub fn list_ports(&self) -> Result<Vec<PortInfo>, SessionError> {
        self.opener.list()
    }

    /// Open the configured device and start reading from it.
    ///
    /// On failure the session stays disconnected.
    pub async fn connect(&mut self) -> Result<ConnectionId, SessionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(SessionError::AlreadyConnected);
        }

        self.state = ConnectionState::Connecting;
        let opened = match self.opener.open(&self.config).await {
            Ok(opened) => opened,
            Err(e) => {
                error!("Failed to open serial port: {}", e);
                self.state = ConnectionState::Disconnected;
                return Err(e);
            }
        };

        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        // Fresh flag per connection so a stale loop can never be revived
        let keep_reading = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(read_loop(
            id,
            opened.reader,
            keep_reading.clone(),
            cancel.clone(),
            self.event_tx.clone(),
        ));

        info!(
            "Connected {} to {} at {} baud",
            id, opened.name, self.config.baud_rate
        );

        self.keep_reading = keep_reading;
        self.cancel = Some(cancel);
        self.reader_task = Some(task);
        self.writer = Some(opened.writer);
        self.port_name = Some(opened.name);
        self.connection = Some(id);
        self.state = ConnectionState::Connected;

        Ok(id)
    }

    /// Write `command` followed by a newline. Returns the bytes written.
    pub async fn send(&mut self, command: &str) -> Result<usize, SessionError> {
        let writer = self.writer.as_mut().ok_or(SessionError::NotConnected)?;

        let line = format!("{command}\n");
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SessionError::WriteFailed(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| SessionError::WriteFailed(e.to_string()))?;

        debug!("Sent {:?}", command);
        Ok(line.len())
    }

    /// Tear the connection down.
    ///
    /// Works from any state, including half-open or already closed. Each
    /// step runs even if an earlier one failed; failures are returned for
    /// reporting, never raised.
    pub async fn disconnect(&mut self) -> Vec<SessionError> {
        let mut failures = Vec::new();

        self.keep_reading.store(false, Ordering::SeqCst);

        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }

        if let Some(task) = self.reader_task.take() {
            if let Err(e) = task.await {
                warn!("Read loop did not stop cleanly: {}", e);
                failures.push(SessionError::CloseFailed(format!("reader: {e}")));
            }
        }

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                warn!("Failed to close serial writer: {}", e);
                failures.push(SessionError::CloseFailed(format!("writer: {e}")));
            }
        }

        if let Some(name) = self.port_name.take() {
            info!("Closed serial port {}", name);
        }

        self.connection = None;
        self.state = ConnectionState::Disconnected;
        failures
    }
}

/// Deliver one event unless the loop is cancelled first. Returns false when
/// the loop should stop.
async fn publish(
    events: &mpsc::Sender<SessionEvent>,
    cancel: &CancellationToken,
    event: SessionEvent,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}

async fn read_loop(
    id: ConnectionId,
    mut reader: PortReader,
    keep_reading: Arc<AtomicBool>,
    cancel: CancellationToken,
    events: mpsc::Sender<SessionEvent>,
) {
    let mut decoder = Utf8StreamDecoder::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    while keep_reading.load(Ordering::SeqCst) {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            read = reader.read(&mut buffer) => read,
        };

        match read {
            Ok(0) => {
                info!("Serial EOF on {}", id);
                let tail = decoder.finish();
                if !tail.is_empty() {
                    let event = SessionEvent::Chunk { id, text: tail };
                    if !publish(&events, &cancel, event).await {
                        break;
                    }
                }
                publish(&events, &cancel, SessionEvent::Eof { id }).await;
                break;
            }
            Ok(n) => {
                let text = decoder.decode(&buffer[..n]);
                if text.is_empty() {
                    continue;
                }
                if !publish(&events, &cancel, SessionEvent::Chunk { id, text }).await {
                    debug!("Read loop for {} stopped while delivering output", id);
                    break;
                }
            }
            Err(e) => {
                error!("Error reading serial port on {}: {}", id, e);
                let event = SessionEvent::ReadFailed {
                    id,
                    error: e.to_string(),
                };
                publish(&events, &cancel, event).await;
                break;
            }
        }
    }

    debug!("Read loop for {} exiting", id);
}
