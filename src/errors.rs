//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Start request rejected before any process was created.
    Validation(String),
    /// A bot process is already running; the slot is occupied.
    AlreadyRunning,
    /// No bot process is running; nothing to stop or write to.
    NotRunning,
    /// Underlying OS process-creation failure.
    Spawn(String),
    /// Failure writing to a live child's standard input.
    Io(String),
    /// Query output did not contain the expected payload.
    Parse(String),
    /// Auxiliary query exceeded its bound and was killed.
    Timeout(String),
    /// IPC communication failure.
    Ipc(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::AlreadyRunning => write!(f, "bot is already running"),
            Self::NotRunning => write!(f, "bot is not running"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Ipc(msg) => write!(f, "ipc: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

// Required by the line codec: `Decoder::Error` must absorb raw I/O errors.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
