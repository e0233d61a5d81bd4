use crate::client::{ClientConfig, CotSender};
use crate::framing::{frame_event, write_frame};
use crate::state::{ConnectionState, ConnectionStatus};
use async_trait::async_trait;
use gpscot_core::{DiagnosticSink, ErrorKind, TransportError};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument};

const TRANSPORT: &str = "TCP";

/// Opens a TCP connection to the destination within the connect timeout.
pub(crate) async fn connect_tcp(config: &ClientConfig) -> Result<TcpStream, TransportError> {
    let remote = config.resolve().await?;
    let addr = config.server_addr();

    let stream = timeout(config.connect_timeout, TcpStream::connect(remote))
        .await
        .map_err(|_| TransportError::ConnectTimeout {
            addr: addr.clone(),
            timeout_ms: config.connect_timeout.as_millis() as u64,
        })?
        .map_err(|e| TransportError::connect_failed(addr, e))?;

    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "Failed to set TCP_NODELAY");
    }

    Ok(stream)
}

/// TCP sender for TAK server inputs
///
/// Opens a connection per event, writes the framed event and shuts the
/// connection down again.
pub struct TcpSender {
    config: ClientConfig,
    status: ConnectionStatus,
    sink: Arc<dyn DiagnosticSink>,
}

impl TcpSender {
    pub fn new(config: ClientConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            config,
            status: ConnectionStatus::new(),
            sink,
        }
    }

    #[instrument(skip(self, event), fields(addr = %self.config.server_addr()))]
    async fn send_once(&self, event: &str) -> Result<usize, TransportError> {
        self.status.set_state(ConnectionState::Connecting);
        let mut stream = connect_tcp(&self.config).await?;
        self.status.set_state(ConnectionState::Connected);
        self.status.metrics().mark_connected();

        let frame = frame_event(event);
        write_frame(&mut stream, &frame, self.config.write_timeout, TRANSPORT).await?;
        debug!(bytes = frame.len(), "Sent CoT event over TCP");

        // The event is already on the wire; a failed shutdown does not undo it
        if let Err(e) = stream.shutdown().await {
            self.sink.error(
                ErrorKind::TransportSend,
                format!("TCP shutdown error: {}", e),
            );
        }

        Ok(frame.len())
    }
}

#[async_trait]
impl CotSender for TcpSender {
    async fn deliver(&mut self, event: &str) -> Result<(), TransportError> {
        let result = self.send_once(event).await;

        match result {
            Ok(sent) => {
                self.status.set_state(ConnectionState::Disconnected);
                self.status.metrics().record_delivery(sent as u64);
                Ok(())
            }
            Err(e) => {
                self.status.set_error(e.to_string());
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        TRANSPORT
    }

    fn status(&self) -> &ConnectionStatus {
        &self.status
    }
}
