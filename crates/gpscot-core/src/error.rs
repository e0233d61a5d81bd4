//! Error types for the gpscot relay.
//!
//! Every failure the relay can observe is represented as an explicit value
//! rather than an unwinding panic. Each error exposes an [`ErrorKind`] so the
//! relay can decide, in one place, whether a failure is recoverable for the
//! current transport mode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias using GpsCotError as the error type.
pub type Result<T> = std::result::Result<T, GpsCotError>;

/// Classification of every failure path in the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Serial device could not be opened or failed mid-read
    Device,
    /// A candidate fix sentence was malformed
    Parse,
    /// A cycle produced no usable fix
    NoFix,
    /// Socket connect, address resolution, TLS setup or handshake failed
    TransportConnect,
    /// A send on an established transport failed
    TransportSend,
    /// The configured protocol selector names no known transport
    UnsupportedProtocol,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Device => write!(f, "DeviceError"),
            ErrorKind::Parse => write!(f, "ParseError"),
            ErrorKind::NoFix => write!(f, "NoFixError"),
            ErrorKind::TransportConnect => write!(f, "TransportConnectError"),
            ErrorKind::TransportSend => write!(f, "TransportSendError"),
            ErrorKind::UnsupportedProtocol => write!(f, "UnsupportedProtocolError"),
        }
    }
}

/// Top-level error type for all gpscot operations.
#[derive(Debug, Error)]
pub enum GpsCotError {
    /// Serial device errors
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Fix sentence parse errors
    #[error("Parse error: {0}")]
    Sentence(#[from] SentenceError),

    /// Fix acquisition errors
    #[error("Fix error: {0}")]
    Fix(#[from] FixError),

    /// Transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl GpsCotError {
    /// Returns the failure classification, if the error belongs to the relay taxonomy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            GpsCotError::Device(e) => Some(e.kind()),
            GpsCotError::Sentence(e) => Some(e.kind()),
            GpsCotError::Fix(e) => Some(e.kind()),
            GpsCotError::Transport(e) => Some(e.kind()),
            GpsCotError::Config(_) => None,
        }
    }
}

/// Errors raised by the serial device holding the GPS receiver.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device could not be opened
    #[error("Failed to open {path} at {baud_rate} baud: {reason}")]
    OpenFailed {
        path: String,
        baud_rate: u32,
        reason: String,
    },

    /// An I/O error occurred while reading an open device
    #[error("Read from {path} failed: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The device stopped producing data (end of stream)
    #[error("Device {path} closed")]
    Closed { path: String },
}

impl DeviceError {
    /// Creates an open failed error.
    pub fn open_failed(path: impl Into<String>, baud_rate: u32, reason: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            baud_rate,
            reason: reason.into(),
        }
    }

    /// Creates a read error.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Device
    }
}

/// Errors raised while parsing a GGA fix sentence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SentenceError {
    /// The line is not an NMEA sentence at all
    #[error("Malformed sentence: {reason}")]
    Malformed { reason: String },

    /// The sentence checksum does not match its contents
    #[error("Checksum mismatch: sentence says {expected:02X}, computed {actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The checksum suffix is not two hex digits
    #[error("Invalid checksum field: {value:?}")]
    InvalidChecksum { value: String },

    /// A required field is empty or absent
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// A numeric field does not parse
    #[error("Invalid number in field '{field}': {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// A hemisphere indicator is not one of N/S/E/W
    #[error("Invalid hemisphere in field '{field}': {value:?}")]
    InvalidHemisphere { field: &'static str, value: String },

    /// A coordinate is outside its valid range
    #[error("Value out of range for field '{field}': {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

impl SentenceError {
    /// Creates a malformed sentence error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Creates an invalid number error.
    pub fn invalid_number(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            field,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Parse
    }
}

/// Reasons a single fix acquisition produced no fix.
#[derive(Debug, Error)]
pub enum FixError {
    /// The serial device failed
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// No complete fix sentence arrived before the read timeout
    #[error("No fix sentence within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The acquisition task did not complete
    #[error("Fix acquisition interrupted: {reason}")]
    Interrupted { reason: String },
}

impl FixError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FixError::Device(e) => e.kind(),
            FixError::Timeout { .. } | FixError::Interrupted { .. } => ErrorKind::NoFix,
        }
    }
}

/// Errors raised while connecting to or delivering to the TAK server.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured protocol selector is not UDP, TCP or TLS
    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    /// The destination could not be resolved to a socket address
    #[error("Failed to resolve {addr}: {reason}")]
    AddressResolution { addr: String, reason: String },

    /// Connecting the socket failed
    #[error("Failed to connect to {addr}: {reason}")]
    ConnectFailed { addr: String, reason: String },

    /// Connecting the socket did not finish in time
    #[error("Connection to {addr} timed out after {timeout_ms}ms")]
    ConnectTimeout { addr: String, timeout_ms: u64 },

    /// TLS material or configuration could not be loaded
    #[error("TLS configuration error: {reason}")]
    TlsConfig { reason: String },

    /// The TLS handshake failed
    #[error("TLS handshake with {addr} failed: {reason}")]
    TlsHandshake { addr: String, reason: String },

    /// Sending on an established transport failed
    #[error("{transport} send error: {reason}")]
    SendFailed {
        transport: &'static str,
        reason: String,
    },

    /// Sending on an established transport did not finish in time
    #[error("{transport} send timed out after {timeout_ms}ms")]
    SendTimeout {
        transport: &'static str,
        timeout_ms: u64,
    },
}

impl TransportError {
    /// Creates a connect failed error.
    pub fn connect_failed(addr: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ConnectFailed {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a TLS configuration error.
    pub fn tls_config(reason: impl fmt::Display) -> Self {
        Self::TlsConfig {
            reason: reason.to_string(),
        }
    }

    /// Creates a send failed error.
    pub fn send_failed(transport: &'static str, reason: impl fmt::Display) -> Self {
        Self::SendFailed {
            transport,
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::UnsupportedProtocol { .. } => ErrorKind::UnsupportedProtocol,
            TransportError::SendFailed { .. } | TransportError::SendTimeout { .. } => {
                ErrorKind::TransportSend
            }
            TransportError::AddressResolution { .. }
            | TransportError::ConnectFailed { .. }
            | TransportError::ConnectTimeout { .. }
            | TransportError::TlsConfig { .. }
            | TransportError::TlsHandshake { .. } => ErrorKind::TransportConnect,
        }
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
