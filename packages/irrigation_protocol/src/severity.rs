use std::fmt;

/// Severity tag of a panel log entry.
///
/// Device-supplied levels outside the known set are kept verbatim in
/// [`Severity::Other`] and styled like `info`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Error,
    Command,
    Warning,
    Raw,
    Other(String),
}

impl Severity {
    /// Map a level string as sent by the device. Empty means `info`.
    pub fn from_level(level: &str) -> Self {
        match level {
            "" | "info" => Severity::Info,
            "success" => Severity::Success,
            "error" => Severity::Error,
            "command" => Severity::Command,
            "warning" => Severity::Warning,
            "raw" => Severity::Raw,
            other => Severity::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Command => "command",
            Severity::Warning => "warning",
            Severity::Raw => "raw",
            Severity::Other(level) => level,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
