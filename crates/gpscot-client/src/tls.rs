use crate::cert::{load_root_store, ClientIdentity};
use crate::client::{ClientConfig, CotSender};
use crate::framing::{frame_event, write_frame};
use crate::state::{ConnectionState, ConnectionStatus};
use crate::tcp::connect_tcp;
use crate::verify::{AcceptAnyServerCert, SkipHostnameVerifier};
use async_trait::async_trait;
use gpscot_core::config::TlsSettings;
use gpscot_core::{DiagnosticSink, ErrorKind, TransportError};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::ServerName;
use rustls::ClientConfig as RustlsConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, instrument, warn};

const TRANSPORT: &str = "TLS";

/// TLS material and verification policy
#[derive(Debug, Clone)]
pub struct TlsOptions {
    /// PEM client certificate for mutual TLS
    pub client_cert: Option<PathBuf>,
    /// PEM private key for `client_cert`
    pub client_key: Option<PathBuf>,
    /// PEM CA bundle; the bundled webpki roots are used when absent
    pub ca_cert: Option<PathBuf>,
    /// Verify the server certificate chain; when false any certificate is accepted
    pub verify_chain: bool,
    /// Check the server name against the certificate SAN/CN
    pub verify_hostname: bool,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            client_cert: None,
            client_key: None,
            ca_cert: None,
            verify_chain: true,
            verify_hostname: true,
        }
    }
}

impl From<&TlsSettings> for TlsOptions {
    fn from(settings: &TlsSettings) -> Self {
        Self {
            client_cert: settings.client_cert.clone(),
            client_key: settings.client_key.clone(),
            ca_cert: settings.ca_cert.clone(),
            verify_chain: settings.verify_server_cert,
            verify_hostname: !settings.skip_hostname_verify,
        }
    }
}

/// Build the rustls client configuration for `options`.
pub fn build_tls_config(options: &TlsOptions) -> Result<RustlsConfig, TransportError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = RustlsConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(TransportError::tls_config)?;

    let builder = if !options.verify_chain {
        warn!("Server certificate verification is DISABLED - any certificate is accepted");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert::new(provider)))
    } else {
        let root_store = load_root_store(options.ca_cert.as_deref())?;
        if options.verify_hostname {
            builder.with_root_certificates(root_store)
        } else {
            warn!("Server hostname verification is disabled; the chain is still verified");
            let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(root_store), provider)
                .build()
                .map_err(TransportError::tls_config)?;
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(SkipHostnameVerifier::new(inner)))
        }
    };

    let tls_config = match (&options.client_cert, &options.client_key) {
        (Some(cert_path), Some(key_path)) => {
            let identity = ClientIdentity::from_files(cert_path, key_path)?;
            builder
                .with_client_auth_cert(identity.certs, identity.private_key)
                .map_err(|e| {
                    TransportError::tls_config(format!(
                        "Failed to build TLS config with client auth: {}",
                        e
                    ))
                })?
        }
        _ => builder.with_no_client_auth(),
    };

    Ok(tls_config)
}

/// TLS sender for TAK server inputs
///
/// In per-event mode every delivery connects, handshakes, sends and closes.
/// In persistent mode the session opened by [`CotSender::connect`] is
/// reused; a failed send drops it and the next delivery reconnects.
pub struct TlsSender {
    config: ClientConfig,
    connector: TlsConnector,
    server_name: ServerName<'static>,
    persistent: bool,
    session: Option<TlsStream<TcpStream>>,
    status: ConnectionStatus,
    sink: Arc<dyn DiagnosticSink>,
}

impl TlsSender {
    /// Create a new TLS sender; certificate material is loaded here.
    pub fn new(
        config: ClientConfig,
        options: &TlsOptions,
        persistent: bool,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, TransportError> {
        let tls_config = build_tls_config(options)?;
        Self::with_rustls_config(config, Arc::new(tls_config), persistent, sink)
    }

    /// Create a TLS sender from a prepared rustls configuration.
    pub fn with_rustls_config(
        config: ClientConfig,
        tls_config: Arc<RustlsConfig>,
        persistent: bool,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, TransportError> {
        let host = config.host.trim_start_matches('[').trim_end_matches(']');
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| TransportError::tls_config(format!("Invalid server name {}: {}", host, e)))?;

        Ok(Self {
            config,
            connector: TlsConnector::from(tls_config),
            server_name,
            persistent,
            session: None,
            status: ConnectionStatus::new(),
            sink,
        })
    }

    /// Returns true while a session is held open
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    #[instrument(skip(self), fields(addr = %self.config.server_addr()))]
    async fn open_session(&mut self) -> Result<TlsStream<TcpStream>, TransportError> {
        self.status.set_state(ConnectionState::Connecting);
        let addr = self.config.server_addr();
        let tcp_stream = connect_tcp(&self.config).await?;

        let tls_stream = timeout(
            self.config.connect_timeout,
            self.connector.connect(self.server_name.clone(), tcp_stream),
        )
        .await
        .map_err(|_| TransportError::ConnectTimeout {
            addr: addr.clone(),
            timeout_ms: self.config.connect_timeout.as_millis() as u64,
        })?
        .map_err(|e| TransportError::TlsHandshake {
            addr,
            reason: e.to_string(),
        })?;

        debug!("TLS handshake successful");
        self.status.set_state(ConnectionState::Connected);
        self.status.metrics().mark_connected();
        Ok(tls_stream)
    }

    async fn close_session(&mut self, mut stream: TlsStream<TcpStream>) {
        // Sends close_notify before the TCP shutdown
        if let Err(e) = stream.shutdown().await {
            self.sink
                .error(ErrorKind::TransportSend, format!("TLS close error: {}", e));
        }
    }

    async fn deliver_persistent(&mut self, event: &str) -> Result<usize, TransportError> {
        if self.session.is_none() {
            info!("Reconnecting TLS session to {}", self.config.server_addr());
            self.session = Some(self.open_session().await?);
        }

        let frame = frame_event(event);
        let Some(stream) = self.session.as_mut() else {
            return Err(TransportError::send_failed(TRANSPORT, "no session"));
        };

        match write_frame(stream, &frame, self.config.write_timeout, TRANSPORT).await {
            Ok(()) => Ok(frame.len()),
            Err(e) => {
                // The session is unusable after a failed write
                self.session = None;
                Err(e)
            }
        }
    }

    async fn deliver_once(&mut self, event: &str) -> Result<usize, TransportError> {
        let mut stream = self.open_session().await?;
        let frame = frame_event(event);
        let result = write_frame(&mut stream, &frame, self.config.write_timeout, TRANSPORT).await;
        self.close_session(stream).await;
        self.status.set_state(ConnectionState::Disconnected);
        result.map(|()| frame.len())
    }
}

#[async_trait]
impl CotSender for TlsSender {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if !self.persistent || self.session.is_some() {
            return Ok(());
        }

        match self.open_session().await {
            Ok(stream) => {
                info!("TLS session established with {}", self.config.server_addr());
                self.session = Some(stream);
                Ok(())
            }
            Err(e) => {
                self.status.set_error(e.to_string());
                Err(e)
            }
        }
    }

    async fn deliver(&mut self, event: &str) -> Result<(), TransportError> {
        let result = if self.persistent {
            self.deliver_persistent(event).await
        } else {
            self.deliver_once(event).await
        };

        match result {
            Ok(sent) => {
                self.status.metrics().record_delivery(sent as u64);
                debug!(bytes = sent, "Sent CoT event over TLS");
                Ok(())
            }
            Err(e) => {
                self.status.set_error(e.to_string());
                Err(e)
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(stream) = self.session.take() {
            info!("Closing TLS session to {}", self.config.server_addr());
            self.close_session(stream).await;
            self.status.set_state(ConnectionState::Disconnected);
        }
    }

    fn is_persistent(&self) -> bool {
        self.persistent
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
    use gpscot_core::NullSink;

    #[test]
    fn test_options_from_settings() {
        let settings = TlsSettings {
            skip_hostname_verify: true,
            ..TlsSettings::default()
        };
        let options = TlsOptions::from(&settings);
        assert!(options.verify_chain);
        assert!(!options.verify_hostname);
    }

    #[test]
    fn test_build_config_variants() {
        assert!(build_tls_config(&TlsOptions::default()).is_ok());

        let relaxed = TlsOptions {
            verify_chain: false,
            ..TlsOptions::default()
        };
        assert!(build_tls_config(&relaxed).is_ok());

        let no_hostname = TlsOptions {
            verify_hostname: false,
            ..TlsOptions::default()
        };
        assert!(build_tls_config(&no_hostname).is_ok());
    }

    #[test]
    fn test_missing_client_material() {
        let options = TlsOptions {
            client_cert: Some(PathBuf::from("/nonexistent/client.pem")),
            client_key: Some(PathBuf::from("/nonexistent/client.key")),
            ..TlsOptions::default()
        };
        let err = build_tls_config(&options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportConnect);
    }

    #[tokio::test]
    async fn test_per_event_mode_has_no_session() {
        let mut sender = TlsSender::new(
            ClientConfig::new("127.0.0.1", 8089),
            &TlsOptions::default(),
            false,
            Arc::new(NullSink),
        )
        .unwrap();

        assert!(!sender.is_persistent());
        sender.connect().await.unwrap();
        assert!(!sender.has_session());
    }
}
