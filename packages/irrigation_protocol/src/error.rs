/// Errors raised while building an outbound command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Free-text command was empty after trimming
    #[error("command is empty")]
    Empty,

    /// Free-text command would span several wire lines
    #[error("command must be a single line")]
    MultiLine,

    /// A numeric argument could not be parsed
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    /// A required argument is missing
    #[error("missing value for {0}")]
    MissingValue(&'static str),
}
