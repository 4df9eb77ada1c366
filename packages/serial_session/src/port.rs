use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::config::SerialConfig;
use crate::error::SessionError;

pub type PortReader = Box<dyn AsyncRead + Send + Unpin>;
pub type PortWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// An open device, split into its read and write halves
pub struct OpenedPort {
    pub name: String,
    pub reader: PortReader,
    pub writer: PortWriter,
}

/// A serial port visible to the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub usb: bool,
    pub product: Option<String>,
    pub manufacturer: Option<String>,
}

impl PortInfo {
    /// USB-UART bridges found on ESP32 dev boards
    pub fn is_likely_esp32(&self) -> bool {
        if !self.usb {
            return false;
        }
        let product = self.product.as_deref().unwrap_or("").to_lowercase();
        let manufacturer = self.manufacturer.as_deref().unwrap_or("").to_lowercase();
        product.contains("cp210")
            || product.contains("ch340")
            || product.contains("esp32")
            || manufacturer.contains("silicon")
            || manufacturer.contains("wch")
    }
}

/// Platform access to serial devices.
///
/// `probe` and `list` default to "supported, nothing listed" so test
/// transports only need `open`.
pub trait PortOpener: Send + Sync {
    /// Check that serial devices can be accessed at all
    fn probe(&self) -> Result<(), SessionError> {
        Ok(())
    }

    /// Enumerate visible ports
    fn list(&self) -> Result<Vec<PortInfo>, SessionError> {
        Ok(Vec::new())
    }

    /// Select and open a device
    fn open(
        &self,
        config: &SerialConfig,
    ) -> impl Future<Output = Result<OpenedPort, SessionError>> + Send;
}

/// Pick a port when none was configured: the one ESP32-looking adapter,
/// else the one USB port.
pub(crate) fn select_port(ports: &[PortInfo]) -> Result<String, SessionError> {
    let esp32: Vec<_> = ports.iter().filter(|p| p.is_likely_esp32()).collect();
    if let [only] = esp32.as_slice() {
        return Ok(only.name.clone());
    }

    let usb: Vec<_> = ports.iter().filter(|p| p.usb).collect();
    if esp32.is_empty() {
        if let [only] = usb.as_slice() {
            return Ok(only.name.clone());
        }
    }

    let names: Vec<_> = ports.iter().map(|p| p.name.as_str()).collect();
    if names.is_empty() {
        Err(SessionError::NoDevice("no serial ports found".into()))
    } else {
        Err(SessionError::NoDevice(format!(
            "cannot choose between {}; pass a port path",
            names.join(", ")
        )))
    }
}

/// Host serial ports through tokio-serial
#[derive(Clone, Copy, Debug, Default)]
pub struct NativePortOpener;

impl PortOpener for NativePortOpener {
    fn probe(&self) -> Result<(), SessionError> {
        tokio_serial::available_ports()
            .map(|_| ())
            .map_err(|e| SessionError::Unsupported(e.to_string()))
    }

    fn list(&self) -> Result<Vec<PortInfo>, SessionError> {
        let ports = tokio_serial::available_ports()
            .map_err(|e| SessionError::Unsupported(e.to_string()))?;

        Ok(ports
            .into_iter()
            .map(|port| match port.port_type {
                SerialPortType::UsbPort(usb) => PortInfo {
                    name: port.port_name,
                    usb: true,
                    product: usb.product,
                    manufacturer: usb.manufacturer,
                },
                _ => PortInfo {
                    name: port.port_name,
                    usb: false,
                    product: None,
                    manufacturer: None,
                },
            })
            .collect())
    }

    async fn open(&self, config: &SerialConfig) -> Result<OpenedPort, SessionError> {
        let path = match &config.path {
            Some(path) => path.clone(),
            None => {
                let path = select_port(&self.list()?)?;
                info!("Auto-selected serial port {}", path);
                path
            }
        };

        debug!("Opening {} at {} baud (8N1)", path, config.baud_rate);
        let stream = tokio_serial::new(path.as_str(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| SessionError::ConnectFailed(format!("{path}: {e}")))?;

        let (reader, writer) = tokio::io::split(stream);
        Ok(OpenedPort {
            name: path,
            reader: Box::new(reader),
            writer: Box::new(writer),
        })
    }
}
