use crate::state::ConnectionStatus;
use async_trait::async_trait;
use gpscot_core::{AppConfig, TransportError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::lookup_host;
use tokio::time::timeout;

/// Destination and timeouts shared by every transport
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// TAK server host name or IP address
    pub host: String,
    /// TAK server port
    pub port: u16,
    /// Bound on address resolution, TCP connect and TLS handshake
    pub connect_timeout: Duration,
    /// Bound on writing one framed event
    pub write_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8087,
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Builds the client configuration from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            host: config.destination.host.clone(),
            port: config.destination.port,
            connect_timeout: config.timing.connect_timeout(),
            write_timeout: config.timing.write_timeout(),
        }
    }

    /// Returns the destination for log and error messages
    pub fn server_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Resolves the destination to its first socket address.
    pub async fn resolve(&self) -> Result<SocketAddr, TransportError> {
        let addr = self.server_addr();
        let host = self.host.trim_start_matches('[').trim_end_matches(']');

        let mut addrs = timeout(self.connect_timeout, lookup_host((host, self.port)))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                addr: addr.clone(),
                timeout_ms: self.connect_timeout.as_millis() as u64,
            })?
            .map_err(|e| TransportError::AddressResolution {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;

        addrs.next().ok_or_else(|| TransportError::AddressResolution {
            addr,
            reason: "no addresses found".to_string(),
        })
    }
}

/// Capability to deliver encoded CoT events to a TAK server
///
/// Per-event transports open and close whatever they need inside
/// [`deliver`](CotSender::deliver); persistent transports establish their
/// session in [`connect`](CotSender::connect) and reuse it.
#[async_trait]
pub trait CotSender: Send {
    /// Establish a long-lived session, if the transport keeps one
    ///
    /// The default is a no-op for transports without a session.
    async fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Frame and deliver one encoded event
    ///
    /// # Returns
    /// * `Ok(())` once the framed bytes were handed to the network
    /// * `Err` if connecting or sending failed
    async fn deliver(&mut self, event: &str) -> Result<(), TransportError>;

    /// Release any open session
    async fn disconnect(&mut self) {}

    /// Whether one session is held for the whole run
    fn is_persistent(&self) -> bool {
        false
    }

    /// Short transport name used in diagnostics
    fn name(&self) -> &'static str;

    /// Connection state and delivery counters
    fn status(&self) -> &ConnectionStatus;
}
