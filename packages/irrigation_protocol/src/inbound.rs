use std::fmt;

use serde::Deserialize;
use tracing::debug;

/// A displayed field value. The firmware sends numbers, but any JSON
/// scalar is accepted and shown as-is.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
    Bool(bool),
}

impl Scalar {
    /// Numeric reading of the value; text is parsed, anything else is `None`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => n.as_f64(),
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Periodic sensor report (`"type": "data"`)
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct DataMessage {
    #[serde(default)]
    pub sensor1: Option<Scalar>,
    #[serde(default)]
    pub humidity1: Option<Scalar>,
    #[serde(default)]
    pub status1: Option<Scalar>,
    #[serde(default)]
    pub sensor2: Option<Scalar>,
    #[serde(default)]
    pub humidity2: Option<Scalar>,
    #[serde(default)]
    pub status2: Option<Scalar>,
}

/// Firmware log line (`"type": "log"`)
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LogMessage {
    #[serde(default)]
    pub message: Option<Scalar>,
    #[serde(default)]
    pub level: Option<Scalar>,
}

/// Current firmware settings (`"type": "config"`)
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ConfigMessage {
    #[serde(default, rename = "limiteSecoAtual")]
    pub dry_limit: Option<Scalar>,
    #[serde(default, rename = "limiteUmidoAtual")]
    pub wet_limit: Option<Scalar>,
    #[serde(default, rename = "intervaloAtual")]
    pub read_interval: Option<Scalar>,
}

/// Structured record, discriminated by its `type` field
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    Data(DataMessage),
    Log(LogMessage),
    Config(ConfigMessage),
}

/// Classification of one trimmed, non-empty line
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Message(InboundMessage),
    /// Free text, or a JSON-shaped line that failed to parse
    Raw(String),
    /// Valid JSON object whose `type` is not one we handle
    Ignored,
}

const KNOWN_TYPES: [&str; 3] = ["data", "log", "config"];

/// Classify a single line. The caller trims and drops empty lines.
pub fn classify_line(line: &str) -> Record {
    if !(line.starts_with('{') && line.ends_with('}')) {
        return Record::Raw(line.to_string());
    }

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            debug!("Unparsable JSON-shaped line ({}): {}", e, line);
            return Record::Raw(line.to_string());
        }
    };

    let known = value
        .get("type")
        .and_then(|t| t.as_str())
        .is_some_and(|t| KNOWN_TYPES.contains(&t));
    if !known {
        debug!("Ignoring record with unhandled type: {}", line);
        return Record::Ignored;
    }

    match serde_json::from_value::<InboundMessage>(value) {
        Ok(msg) => Record::Message(msg),
        Err(e) => {
            debug!("Record fields did not match its type ({}): {}", e, line);
            Record::Raw(line.to_string())
        }
    }
}
