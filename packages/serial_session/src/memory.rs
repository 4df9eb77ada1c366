//! In-memory serial transport.
//!
//! Every `open` creates a duplex pipe: the session gets one end, the other
//! end is kept as the "device" and can be taken with
//! [`MemoryPortOpener::take_device`] to script the firmware side.

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

use crate::config::SerialConfig;
use crate::error::SessionError;
use crate::port::{OpenedPort, PortInfo, PortOpener, PortReader, PortWriter};

const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Default)]
struct MemoryState {
    unsupported: bool,
    fail_next: Option<String>,
    read_error: Option<String>,
    write_error: Option<String>,
    devices: Vec<DuplexStream>,
    opened: usize,
}

/// Opener backed by `tokio::io::duplex` pipes
#[derive(Clone, Default)]
pub struct MemoryPortOpener {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make `probe` and `list` report the platform as unsupported
    pub fn set_unsupported(&self) {
        self.lock().unsupported = true;
    }

    /// Make the next `open` fail with `reason`
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        self.lock().fail_next = Some(reason.into());
    }

    /// Every read on the next opened port fails with `reason`
    pub fn fail_reads(&self, reason: impl Into<String>) {
        self.lock().read_error = Some(reason.into());
    }

    /// Every write on the next opened port fails with `reason`
    pub fn fail_writes(&self, reason: impl Into<String>) {
        self.lock().write_error = Some(reason.into());
    }

    /// Device end of the most recently opened pipe
    pub fn take_device(&self) -> Option<DuplexStream> {
        self.lock().devices.pop()
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        self.lock().opened
    }
}

impl PortOpener for MemoryPortOpener {
    fn probe(&self) -> Result<(), SessionError> {
        if self.lock().unsupported {
            return Err(SessionError::Unsupported("memory transport disabled".into()));
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<PortInfo>, SessionError> {
        self.probe()?;
        Ok(vec![PortInfo {
            name: "memory".into(),
            usb: false,
            product: None,
            manufacturer: None,
        }])
    }

    async fn open(&self, config: &SerialConfig) -> Result<OpenedPort, SessionError> {
        let mut state = self.lock();
        if let Some(reason) = state.fail_next.take() {
            return Err(SessionError::ConnectFailed(reason));
        }

        let (host, device) = tokio::io::duplex(PIPE_CAPACITY);
        state.devices.push(device);
        state.opened += 1;

        let (reader, writer) = tokio::io::split(host);
        let reader: PortReader = match state.read_error.take() {
            Some(reason) => Box::new(BrokenLink(reason)),
            None => Box::new(reader),
        };
        let writer: PortWriter = match state.write_error.take() {
            Some(reason) => Box::new(BrokenLink(reason)),
            None => Box::new(writer),
        };
        Ok(OpenedPort {
            name: config.path.clone().unwrap_or_else(|| "memory".to_string()),
            reader,
            writer,
        })
    }
}

/// Port half whose I/O always fails. Closing it succeeds.
struct BrokenLink(String);

impl BrokenLink {
    fn error(&self) -> io::Error {
        io::Error::new(io::ErrorKind::BrokenPipe, self.0.clone())
    }
}

impl AsyncRead for BrokenLink {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(self.error()))
    }
}

impl AsyncWrite for BrokenLink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(self.error()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(self.error()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
