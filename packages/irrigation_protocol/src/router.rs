use crate::inbound::{ConfigMessage, DataMessage, InboundMessage, LogMessage, Record, Scalar, classify_line};
use crate::severity::Severity;
use crate::status::StatusClass;

/// Prefix put in front of every line that originated on the device
pub const DEVICE_PREFIX: &str = "ESP32: ";

/// Which soil sensor an update targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SensorId {
    One,
    Two,
}

impl SensorId {
    pub const ALL: [SensorId; 2] = [SensorId::One, SensorId::Two];

    /// 1-based plant number, as used by `IRRIGAR`
    pub fn number(self) -> u8 {
        match self {
            SensorId::One => 1,
            SensorId::Two => 2,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(SensorId::One),
            2 => Some(SensorId::Two),
            _ => None,
        }
    }
}

/// New readings for one sensor card
#[derive(Clone, Debug, PartialEq)]
pub struct SensorUpdate {
    pub sensor: SensorId,
    pub value: String,
    pub status: String,
    pub humidity_percent: f64,
    pub class: StatusClass,
}

/// Config fields reported by the device. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigUpdate {
    pub dry_limit: Option<String>,
    pub wet_limit: Option<String>,
    pub read_interval: Option<String>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.dry_limit.is_none() && self.wet_limit.is_none() && self.read_interval.is_none()
    }
}

/// What the presentation layer should do in response to inbound text
#[derive(Clone, Debug, PartialEq)]
pub enum PanelEvent {
    Sensor(SensorUpdate),
    Config(ConfigUpdate),
    Log { severity: Severity, message: String },
}

/// Split a chunk into trimmed, non-empty lines
pub fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(str::trim).filter(|line| !line.is_empty())
}

/// Route every line of a chunk, in order
pub fn route_chunk(text: &str) -> Vec<PanelEvent> {
    let mut events = Vec::new();
    for line in split_lines(text) {
        route_line_into(line, &mut events);
    }
    events
}

/// Route a single line. Leading and trailing whitespace is ignored.
pub fn route_line(line: &str) -> Vec<PanelEvent> {
    let mut events = Vec::new();
    let line = line.trim();
    if !line.is_empty() {
        route_line_into(line, &mut events);
    }
    events
}

fn route_line_into(line: &str, events: &mut Vec<PanelEvent>) {
    match classify_line(line) {
        Record::Message(InboundMessage::Data(data)) => sensor_updates(&data, events),
        Record::Message(InboundMessage::Log(log)) => events.push(device_log(&log)),
        Record::Message(InboundMessage::Config(cfg)) => {
            let update = config_update(&cfg);
            if !update.is_empty() {
                events.push(PanelEvent::Config(update));
            }
        }
        Record::Raw(text) => events.push(PanelEvent::Log {
            severity: Severity::Raw,
            message: format!("{DEVICE_PREFIX}{text}"),
        }),
        Record::Ignored => {}
    }
}

fn sensor_updates(data: &DataMessage, events: &mut Vec<PanelEvent>) {
    let cards = [
        (SensorId::One, &data.sensor1, &data.humidity1, &data.status1),
        (SensorId::Two, &data.sensor2, &data.humidity2, &data.status2),
    ];

    for (sensor, value, humidity, status) in cards {
        // A card is only touched when its reading is present
        let Some(value) = value else { continue };
        // Empty status reads as absent
        let status = status
            .as_ref()
            .map(Scalar::to_string)
            .filter(|s| !s.is_empty());
        events.push(PanelEvent::Sensor(SensorUpdate {
            sensor,
            value: value.to_string(),
            class: StatusClass::from_status(status.as_deref()),
            status: status.unwrap_or_else(|| "OK".to_string()),
            humidity_percent: humidity.as_ref().and_then(Scalar::as_f64).unwrap_or(0.0),
        }));
    }
}

fn device_log(log: &LogMessage) -> PanelEvent {
    let message = log.message.as_ref().map(Scalar::to_string).unwrap_or_default();
    let level = log.level.as_ref().map(Scalar::to_string).unwrap_or_default();
    PanelEvent::Log {
        severity: Severity::from_level(&level),
        message: format!("{DEVICE_PREFIX}{message}"),
    }
}

fn config_update(cfg: &ConfigMessage) -> ConfigUpdate {
    ConfigUpdate {
        dry_limit: cfg.dry_limit.as_ref().map(Scalar::to_string),
        wet_limit: cfg.wet_limit.as_ref().map(Scalar::to_string),
        read_interval: cfg.read_interval.as_ref().map(Scalar::to_string),
    }
}

/// Holds back a trailing partial line until its newline arrives, so a
/// record split across two reads is routed whole.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every complete line received so far,
    /// newline-terminated. Returns an empty string when no line is complete.
    pub fn push(&mut self, chunk: &str) -> String {
        self.pending.push_str(chunk);
        match self.pending.rfind('\n') {
            Some(idx) => {
                let rest = self.pending.split_off(idx + 1);
                std::mem::replace(&mut self.pending, rest)
            }
            None => String::new(),
        }
    }

    /// Take whatever partial line is buffered
    pub fn flush(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }
}
