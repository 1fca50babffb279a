use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Failures while talking to the serial device.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device sent bytes that are not valid UTF-8")]
    InvalidUtf8,
}

/// A data line that does not decode into a sample.
#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error("Expected '<millis> <angle>', got {line:?}")]
    MissingField { line: String },

    #[error("Bad timestamp {token:?}: {source}")]
    BadTimestamp {
        token: String,
        source: ParseIntError,
    },

    #[error("Bad angle {token:?}: {source}")]
    BadAngle {
        token: String,
        source: ParseFloatError,
    },
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Read(#[from] ReaderError),

    #[error("Malformed data line: {0}")]
    Sample(#[from] SampleError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    #[error("Handshake failed: {0}")]
    Handshake(#[source] ReaderError),

    #[error("GUI error: {0}")]
    Gui(#[from] iced::Error),
}
