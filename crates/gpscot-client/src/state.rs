use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// Connection state of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session is open
    Disconnected,
    /// A connect or handshake is in progress
    Connecting,
    /// A session is open
    Connected,
    /// The last connect or send failed
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

/// Delivery counters for a transport
#[derive(Debug, Clone)]
pub struct ConnectionMetrics {
    /// Total framed bytes sent
    bytes_sent: Arc<AtomicU64>,
    /// Total events delivered
    messages_sent: Arc<AtomicU64>,
    /// Total connect and send failures
    errors: Arc<AtomicU64>,
    /// Number of sessions opened (connections or TLS handshakes)
    sessions_opened: Arc<AtomicU64>,
    /// Last successful delivery
    last_delivery: Arc<parking_lot::RwLock<Option<SystemTime>>>,
}

impl Default for ConnectionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMetrics {
    pub fn new() -> Self {
        Self {
            bytes_sent: Arc::new(AtomicU64::new(0)),
            messages_sent: Arc::new(AtomicU64::new(0)),
            errors: Arc::new(AtomicU64::new(0)),
            sessions_opened: Arc::new(AtomicU64::new(0)),
            last_delivery: Arc::new(parking_lot::RwLock::new(None)),
        }
    }

    /// Record one delivered event of `bytes` framed bytes
    pub fn record_delivery(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        *self.last_delivery.write() = Some(SystemTime::now());
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark a session as established
    pub fn mark_connected(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened.load(Ordering::Relaxed)
    }

    pub fn last_delivery(&self) -> Option<SystemTime> {
        *self.last_delivery.read()
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_sent: self.bytes_sent(),
            messages_sent: self.messages_sent(),
            errors: self.errors(),
            sessions_opened: self.sessions_opened(),
            last_delivery: self.last_delivery(),
        }
    }
}

/// Snapshot of delivery metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_sent: u64,
    pub messages_sent: u64,
    pub errors: u64,
    pub sessions_opened: u64,
    pub last_delivery: Option<SystemTime>,
}

impl MetricsSnapshot {
    /// Failures per attempted delivery
    pub fn error_rate(&self) -> f64 {
        let attempts = self.messages_sent + self.errors;
        if attempts > 0 {
            self.errors as f64 / attempts as f64
        } else {
            0.0
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events ({} bytes) sent, {} errors, {} sessions opened",
            self.messages_sent, self.bytes_sent, self.errors, self.sessions_opened
        )
    }
}

/// Combined connection state and metrics
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    state: Arc<parking_lot::RwLock<ConnectionState>>,
    metrics: ConnectionMetrics,
    error_message: Arc<parking_lot::RwLock<Option<String>>>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(parking_lot::RwLock::new(ConnectionState::Disconnected)),
            metrics: ConnectionMetrics::new(),
            error_message: Arc::new(parking_lot::RwLock::new(None)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.metrics
    }

    /// Record a failure and move to the failed state
    pub fn set_error(&self, error: String) {
        *self.error_message.write() = Some(error);
        self.metrics.record_error();
        self.set_state(ConnectionState::Failed);
    }

    pub fn clear_error(&self) {
        *self.error_message.write() = None;
    }

    pub fn error_message(&self) -> Option<String> {
        self.error_message.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state(), ConnectionState::Connected)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state(), ConnectionState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(ConnectionState::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = ConnectionMetrics::new();

        metrics.mark_connected();
        metrics.record_delivery(100);
        metrics.record_delivery(50);
        metrics.record_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.bytes_sent, 150);
        assert_eq!(snapshot.messages_sent, 2);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.sessions_opened, 1);
        assert!(snapshot.last_delivery.is_some());
        assert!((snapshot.error_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(
            snapshot.to_string(),
            "2 events (150 bytes) sent, 1 errors, 1 sessions opened"
        );
    }

    #[test]
    fn test_connection_status() {
        let status = ConnectionStatus::new();

        assert_eq!(status.state(), ConnectionState::Disconnected);
        assert!(!status.is_connected());

        status.set_state(ConnectionState::Connected);
        assert!(status.is_connected());

        status.set_error("TLS send error: broken pipe".to_string());
        assert!(status.is_failed());
        assert_eq!(status.metrics().errors(), 1);
        assert_eq!(
            status.error_message(),
            Some("TLS send error: broken pipe".to_string())
        );

        status.clear_error();
        assert!(status.error_message().is_none());
    }
}
