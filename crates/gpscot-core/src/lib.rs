//! # gpscot Core
//!
//! Core types, error handling, diagnostics and configuration for the gpscot
//! USB GPS to Cursor-on-Target relay.
//!
//! - **Types**: `Fix`, `Identity` and the closed `Protocol` selector.
//! - **Errors**: `thiserror` enums for every failure mode, each tagged with an
//!   [`ErrorKind`] so the relay can apply its recoverable-vs-fatal policy.
//! - **Diagnostics**: the [`DiagnosticSink`] capability that the fix reader,
//!   transports and relay report failures through.
//! - **Configuration**: YAML files with environment variable overrides and
//!   validation.
//!
//! ## Example
//!
//! ```
//! use gpscot_core::types::{Fix, Identity, Protocol};
//!
//! let identity = Identity::new("abc-123", "Test");
//! let fix = Fix::new(34.052, -118.243, 71.0);
//!
//! assert_eq!(identity.callsign(), "Test");
//! assert!(fix.is_finite());
//! assert_eq!(Protocol::parse("tls", true).unwrap(), Protocol::Tls { persistent: true });
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod types;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, NullSink, Severity, TracingSink};
pub use error::{
    ConfigError, DeviceError, ErrorKind, FixError, GpsCotError, Result, SentenceError,
    TransportError,
};
pub use types::{Fix, Identity, Protocol};
