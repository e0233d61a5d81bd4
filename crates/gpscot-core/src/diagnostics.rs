//! Diagnostics sink capability.
//!
//! The fix reader, the transports and the relay never log failures through a
//! global. They receive an `Arc<dyn DiagnosticSink>` and report every failure
//! path through it. The binary decides where diagnostics end up:
//! [`TracingSink`] forwards them to `tracing`, [`MemorySink`] keeps them for
//! inspection and [`NullSink`] drops them.

use crate::error::ErrorKind;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// Severity of a reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The failure was recovered and the relay keeps running
    Error,
    /// The failure ends the run
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn fatal(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.message)
    }
}

/// Destination for failure reports.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);

    /// Reports a recoverable failure.
    fn error(&self, kind: ErrorKind, message: String) {
        self.report(Diagnostic::error(kind, message));
    }

    /// Reports a failure that ends the run.
    fn fatal(&self, kind: ErrorKind, message: String) {
        self.report(Diagnostic::fatal(kind, message));
    }
}

/// Forwards diagnostics to the installed `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn shared() -> Arc<dyn DiagnosticSink> {
        Arc::new(Self)
    }
}

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => error!(kind = %diagnostic.kind, "{}", diagnostic.message),
            Severity::Fatal => {
                error!(kind = %diagnostic.kind, fatal = true, "{}", diagnostic.message)
            }
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything reported so far.
    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.lock().clone()
    }

    /// Counts reports of the given kind.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.records.lock().iter().filter(|d| d.kind == kind).count()
    }

    /// Counts reports of the given severity.
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        self.records.lock().push(diagnostic);
    }
}

/// Drops every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _diagnostic: Diagnostic) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.error(ErrorKind::Parse, "GPS parse error: bad checksum".to_string());
        sink.fatal(ErrorKind::TransportSend, "TLS send error: reset".to_string());

        assert_eq!(sink.count(ErrorKind::Parse), 1);
        assert_eq!(sink.count(ErrorKind::TransportSend), 1);
        assert_eq!(sink.count_severity(Severity::Fatal), 1);
        assert_eq!(
            sink.records()[1].to_string(),
            "[fatal] TransportSendError: TLS send error: reset"
        );
    }

    #[test]
    fn test_sinks_as_trait_objects() {
        let sinks: Vec<Arc<dyn DiagnosticSink>> = vec![
            TracingSink::shared(),
            Arc::new(NullSink),
            Arc::new(MemorySink::new()),
        ];
        for sink in sinks {
            sink.error(ErrorKind::NoFix, "Invalid GPS fix.".to_string());
        }
    }
}
