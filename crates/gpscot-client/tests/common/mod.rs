//! Throwaway PKI and TLS listeners for the TLS transport tests

#![allow(dead_code)]

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose,
};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

/// A certificate together with its key pair
pub struct Issued {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Issued {
    pub fn private_key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key.serialize_der()))
    }
}

/// Creates a self-signed certificate authority
pub fn certificate_authority(name: &str) -> Issued {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    Issued { cert, key }
}

/// Issues a server certificate for `names` signed by `ca`
pub fn server_certificate(ca: &Issued, names: &[&str]) -> Issued {
    leaf(ca, names, ExtendedKeyUsagePurpose::ServerAuth)
}

/// Issues a client certificate signed by `ca`
pub fn client_certificate(ca: &Issued, name: &str) -> Issued {
    leaf(ca, &[name], ExtendedKeyUsagePurpose::ClientAuth)
}

fn leaf(ca: &Issued, names: &[&str], usage: ExtendedKeyUsagePurpose) -> Issued {
    let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    let mut params = CertificateParams::new(names.clone()).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, names[0].as_str());
    params.extended_key_usages = vec![usage];
    let key = KeyPair::generate().unwrap();
    let cert = params.signed_by(&key, &ca.cert, &ca.key).unwrap();
    Issued { cert, key }
}

/// PEM files written to a temporary directory
pub struct PemFiles {
    pub dir: TempDir,
}

impl PemFiles {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn write_cert(&self, name: &str, issued: &Issued) -> PathBuf {
        self.write(name, &issued.cert.pem())
    }

    pub fn write_key(&self, name: &str, issued: &Issued) -> PathBuf {
        self.write(name, &issued.key.serialize_pem())
    }
}

/// Builds a TLS acceptor; when `client_ca` is given the client must present
/// a certificate issued by it.
pub fn acceptor(server: &Issued, client_ca: Option<&Issued>) -> TlsAcceptor {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .unwrap();

    let builder = match client_ca {
        Some(ca) => {
            let mut roots = RootCertStore::empty();
            roots.add(ca.cert.der().clone()).unwrap();
            let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
                .build()
                .unwrap();
            builder.with_client_cert_verifier(verifier)
        }
        None => builder.with_no_client_auth(),
    };

    let mut config = builder
        .with_single_cert(vec![server.cert.der().clone()], server.private_key())
        .unwrap();
    // No post-handshake tickets racing the client's close
    config.send_tls13_tickets = 0;

    TlsAcceptor::from(Arc::new(config))
}

/// What a TLS listener saw on one accepted session
#[derive(Debug)]
pub struct Session {
    pub received: Vec<u8>,
    pub client_cert_presented: bool,
}

/// Accepts `sessions` TLS sessions and reads each to EOF.
pub async fn serve(
    acceptor: TlsAcceptor,
    sessions: usize,
) -> (u16, JoinHandle<Vec<io::Result<Session>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let mut results = Vec::with_capacity(sessions);
        for _ in 0..sessions {
            let (tcp, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    results.push(Err(e));
                    continue;
                }
            };
            let result = async {
                let mut tls = acceptor.accept(tcp).await?;
                let client_cert_presented = tls.get_ref().1.peer_certificates().is_some();
                let mut received = Vec::new();
                tls.read_to_end(&mut received).await?;
                Ok::<_, io::Error>(Session {
                    received,
                    client_cert_presented,
                })
            }
            .await;
            results.push(result);
        }
        results
    });

    (port, handle)
}

/// Completes one handshake and drops that session without reading, then
/// accepts a second session and reads it to EOF.
///
/// The receiver fires once the first session is gone.
pub async fn serve_drop_then_accept(
    acceptor: TlsAcceptor,
) -> (u16, oneshot::Receiver<()>, JoinHandle<io::Result<Session>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (dropped_tx, dropped_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await?;
        let first = acceptor.accept(tcp).await?;
        drop(first);
        let _ = dropped_tx.send(());

        let (tcp, _) = listener.accept().await?;
        let mut tls = acceptor.accept(tcp).await?;
        let client_cert_presented = tls.get_ref().1.peer_certificates().is_some();
        let mut received = Vec::new();
        tls.read_to_end(&mut received).await?;
        Ok::<_, io::Error>(Session {
            received,
            client_cert_presented,
        })
    });

    (port, dropped_rx, handle)
}
