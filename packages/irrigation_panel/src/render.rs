use std::io::{self, Write};

use irrigation_protocol::{LogEntry, SensorId, Severity, StatusClass};
use serial_session::PortInfo;

use crate::state::{PanelState, SensorCard};

const RESET: &str = "\x1b[0m";
const BAR_WIDTH: usize = 20;

fn severity_rgb(severity: &Severity) -> (u8, u8, u8) {
    match severity {
        Severity::Success => (0x2e, 0xcc, 0x71),
        Severity::Error => (0xe7, 0x4c, 0x3c),
        Severity::Command => (0x34, 0x98, 0xdb),
        Severity::Warning => (0xf3, 0x9c, 0x12),
        Severity::Raw => (0x95, 0xa5, 0xa6),
        Severity::Info | Severity::Other(_) => (0xbd, 0xc3, 0xc7),
    }
}

fn class_rgb(class: StatusClass) -> (u8, u8, u8) {
    match class {
        StatusClass::Danger => (0xe7, 0x4c, 0x3c),
        StatusClass::Secondary => (0x34, 0x98, 0xdb),
        StatusClass::Primary => (0x2e, 0xcc, 0x71),
    }
}

/// `[#####...............]`, clamped to 0..=100 %
pub fn progress_bar(percent: f64) -> String {
    let clamped = if percent.is_finite() {
        percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let filled = ((clamped / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// Plain-text front-end writing to a terminal
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    fn paint(&self, (r, g, b): (u8, u8, u8), text: &str) -> String {
        if self.color {
            format!("\x1b[38;2;{r};{g};{b}m{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn entry(&mut self, entry: &LogEntry) -> io::Result<()> {
        let line = self.paint(severity_rgb(&entry.severity), &entry.format_line());
        writeln!(self.out, "{line}")
    }

    pub fn entries<'a>(&mut self, entries: impl IntoIterator<Item = &'a LogEntry>) -> io::Result<()> {
        for entry in entries {
            self.entry(entry)?;
        }
        self.out.flush()
    }

    fn card(&mut self, id: SensorId, card: &SensorCard, irrigating: bool) -> io::Result<()> {
        let status = self.paint(class_rgb(card.class), &card.status);
        let watering = if irrigating { "  Irrigating..." } else { "" };
        writeln!(
            self.out,
            "  Sensor {}: {:>6}  {} {:>5}%  {}{}",
            id.number(),
            card.value,
            progress_bar(card.humidity_percent),
            card.humidity_percent,
            status,
            watering
        )
    }

    pub fn status(&mut self, state: &PanelState, port: Option<&str>) -> io::Result<()> {
        let connection = match (state.connected, port) {
            (true, Some(port)) => self.paint((0x2e, 0xcc, 0x71), &format!("Connected ({port})")),
            (true, None) => self.paint((0x2e, 0xcc, 0x71), "Connected"),
            (false, _) if !state.connect_enabled => {
                self.paint((0xf3, 0x9c, 0x12), "Serial unavailable")
            }
            (false, _) => self.paint((0xbd, 0xc3, 0xc7), "Disconnected"),
        };
        writeln!(self.out, "Connection: {connection}")?;

        for id in SensorId::ALL {
            self.card(id, state.sensor(id), state.is_irrigating(id))?;
        }

        let field = |value: &str| {
            if value.is_empty() {
                "-".to_string()
            } else {
                value.to_string()
            }
        };
        writeln!(
            self.out,
            "  Dry limit: {}  Wet limit: {}  Interval: {}",
            field(&state.config.dry_limit),
            field(&state.config.wet_limit),
            field(&state.config.read_interval)
        )?;
        self.out.flush()
    }

    pub fn ports(&mut self, ports: &[PortInfo]) -> io::Result<()> {
        if ports.is_empty() {
            writeln!(self.out, "No serial ports found")?;
        }
        for port in ports {
            let description = match (&port.manufacturer, &port.product) {
                (Some(m), Some(p)) => format!("{m} {p}"),
                (Some(d), None) | (None, Some(d)) => d.clone(),
                (None, None) if port.usb => "USB".to_string(),
                (None, None) => String::new(),
            };
            let hint = if port.is_likely_esp32() { "  (ESP32?)" } else { "" };
            writeln!(self.out, "  {}  {}{}", port.name, description, hint)?;
        }
        self.out.flush()
    }

    pub fn message(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
