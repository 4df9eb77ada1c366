/// Errors that can occur during serial session operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Serial ports cannot be accessed on this platform
    #[error("serial ports are not supported here: {0}")]
    Unsupported(String),

    /// No device could be selected
    #[error("no serial device selected: {0}")]
    NoDevice(String),

    /// The device could not be opened
    #[error("failed to open serial port: {0}")]
    ConnectFailed(String),

    /// A connection is already open
    #[error("already connected")]
    AlreadyConnected,

    /// No connection is open
    #[error("not connected")]
    NotConnected,

    /// Reading from the device failed
    #[error("failed to read from serial port: {0}")]
    ReadFailed(String),

    /// Writing to the device failed
    #[error("failed to write to serial port: {0}")]
    WriteFailed(String),

    /// A teardown step failed
    #[error("failed to close {0}")]
    CloseFailed(String),
}
