use crate::client::{ClientConfig, CotSender};
use crate::state::ConnectionStatus;
use crate::tcp::TcpSender;
use crate::tls::{TlsOptions, TlsSender};
use crate::udp::UdpSender;
use async_trait::async_trait;
use gpscot_core::{AppConfig, DiagnosticSink, Protocol, TransportError};
use std::sync::Arc;
use tracing::info;

/// The configured transport, selected once at startup
pub enum Transport {
    Udp(UdpSender),
    Tcp(TcpSender),
    Tls(TlsSender),
}

impl Transport {
    /// Create the sender for `protocol`.
    ///
    /// TLS material is loaded here, so a bad certificate path fails before
    /// the first cycle.
    pub fn new(
        protocol: Protocol,
        config: ClientConfig,
        tls: &TlsOptions,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, TransportError> {
        info!(
            protocol = %protocol,
            addr = %config.server_addr(),
            persistent = protocol.is_persistent(),
            "Configuring transport"
        );

        match protocol {
            Protocol::Udp => Ok(Transport::Udp(UdpSender::new(config))),
            Protocol::Tcp => Ok(Transport::Tcp(TcpSender::new(config, sink))),
            Protocol::Tls { persistent } => Ok(Transport::Tls(TlsSender::new(
                config, tls, persistent, sink,
            )?)),
        }
    }

    /// Create the sender described by the application configuration.
    ///
    /// Fails with [`TransportError::UnsupportedProtocol`] when the selector
    /// names no known transport.
    pub fn from_app_config(
        config: &AppConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, TransportError> {
        let protocol = config.protocol()?;
        Self::new(
            protocol,
            ClientConfig::from_app_config(config),
            &TlsOptions::from(&config.tls),
            sink,
        )
    }

    fn sender(&self) -> &dyn CotSender {
        match self {
            Transport::Udp(sender) => sender,
            Transport::Tcp(sender) => sender,
            Transport::Tls(sender) => sender,
        }
    }

    fn sender_mut(&mut self) -> &mut dyn CotSender {
        match self {
            Transport::Udp(sender) => sender,
            Transport::Tcp(sender) => sender,
            Transport::Tls(sender) => sender,
        }
    }
}

#[async_trait]
impl CotSender for Transport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.sender_mut().connect().await
    }

    async fn deliver(&mut self, event: &str) -> Result<(), TransportError> {
        self.sender_mut().deliver(event).await
    }

    async fn disconnect(&mut self) {
        self.sender_mut().disconnect().await
    }

    fn is_persistent(&self) -> bool {
        self.sender().is_persistent()
    }

    fn name(&self) -> &'static str {
        self.sender().name()
    }

    fn status(&self) -> &ConnectionStatus {
        self.sender().status()
    }
}
