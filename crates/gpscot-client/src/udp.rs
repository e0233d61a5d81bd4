use crate::client::{ClientConfig, CotSender};
use crate::framing::frame_event;
use crate::state::{ConnectionState, ConnectionStatus};
use async_trait::async_trait;
use gpscot_core::TransportError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

const TRANSPORT: &str = "UDP";

/// UDP sender for TAK server inputs
///
/// UDP is connectionless: every delivery binds a fresh ephemeral socket,
/// sends one datagram and drops the socket.
pub struct UdpSender {
    config: ClientConfig,
    status: ConnectionStatus,
}

impl UdpSender {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            status: ConnectionStatus::new(),
        }
    }

    async fn send_datagram(&self, event: &str) -> Result<usize, TransportError> {
        let remote = self.config.resolve().await?;
        let local = match remote {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| TransportError::send_failed(TRANSPORT, e))?;

        let frame = frame_event(event);
        let sent = timeout(self.config.write_timeout, socket.send_to(&frame, remote))
            .await
            .map_err(|_| TransportError::SendTimeout {
                transport: TRANSPORT,
                timeout_ms: self.config.write_timeout.as_millis() as u64,
            })?
            .map_err(|e| TransportError::send_failed(TRANSPORT, e))?;

        if sent != frame.len() {
            return Err(TransportError::send_failed(
                TRANSPORT,
                format!("datagram truncated to {} of {} bytes", sent, frame.len()),
            ));
        }

        debug!(remote = %remote, bytes = sent, "Sent CoT datagram");
        Ok(sent)
    }
}

#[async_trait]
impl CotSender for UdpSender {
    async fn deliver(&mut self, event: &str) -> Result<(), TransportError> {
        match self.send_datagram(event).await {
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

#[cfg(test)]
mod tests {
    use super::*;
    use gpscot_core::ErrorKind;

    #[tokio::test]
    async fn test_unresolvable_host() {
        let mut sender = UdpSender::new(ClientConfig::new("host.invalid", 8087));
        let err = sender.deliver("<event/>").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportConnect);
        assert!(sender.status().is_failed());
    }
}
