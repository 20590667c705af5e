use std::fmt;

/// Errors surfaced by sweeps, configuration files and result writers.
///
/// Out-of-bounds neighbours are not represented here: the models treat them
/// as invalid moves and carry on.
#[derive(Debug)]
pub enum Error {
    /// A sweep or trial was configured with values the models cannot run.
    InvalidConfiguration { field: &'static str, reason: String },
    /// File system failure while reading or writing configs and results.
    Io(std::io::Error),
    /// JSON (de)serialization failed.
    Json(serde_json::Error),
    /// GIF encoding failed.
    Gif(gif::EncodingError),
    /// Preset lookup or storage failed.
    Preset(String),
}

impl Error {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration { field, reason } => {
                write!(f, "Invalid configuration for `{field}`: {reason}")
            }
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::Gif(e) => write!(f, "GIF encoding error: {e}"),
            Error::Preset(msg) => write!(f, "Preset error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Gif(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<gif::EncodingError> for Error {
    fn from(e: gif::EncodingError) -> Self {
        Error::Gif(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
