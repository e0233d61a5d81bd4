//! Loading of PEM certificates, private keys and trust roots.

use gpscot_core::TransportError;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::RootCertStore;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tracing::info;

/// Client certificate chain and private key for mutual TLS
#[derive(Debug)]
pub struct ClientIdentity {
    /// Client certificates (leaf first)
    pub certs: Vec<CertificateDer<'static>>,
    /// Private key for the leaf certificate
    pub private_key: PrivateKeyDer<'static>,
}

impl Clone for ClientIdentity {
    fn clone(&self) -> Self {
        Self {
            certs: self.certs.clone(),
            private_key: self.private_key.clone_key(),
        }
    }
}

impl ClientIdentity {
    /// Create a client identity from PEM-encoded data
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, TransportError> {
        let certs = certs_from_pem(cert_pem, "client certificate")?;

        let mut key_reader = BufReader::new(Cursor::new(key_pem));
        let private_key = rustls_pemfile::private_key(&mut key_reader)
            .map_err(|e| TransportError::tls_config(format!("Failed to read private key: {}", e)))?
            .ok_or_else(|| TransportError::tls_config("No private key found in PEM data"))?;

        info!("Loaded {} client certificate(s) and private key", certs.len());

        Ok(Self { certs, private_key })
    }

    /// Load a client identity from PEM files
    pub fn from_files(cert_path: &Path, key_path: &Path) -> Result<Self, TransportError> {
        let cert_pem = read_file(cert_path, "client certificate")?;
        let key_pem = read_file(key_path, "private key")?;
        Self::from_pem(&cert_pem, &key_pem)
    }
}

/// Parse every certificate in a PEM document; an empty document is an error.
pub fn certs_from_pem(
    pem: &[u8],
    what: &str,
) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    let mut reader = BufReader::new(Cursor::new(pem));
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::tls_config(format!("Failed to parse {}: {}", what, e)))?;

    if certs.is_empty() {
        return Err(TransportError::tls_config(format!(
            "No certificates found in {}",
            what
        )));
    }

    Ok(certs)
}

/// Build a trust store from PEM CA certificates
pub fn root_store_from_pem(ca_pem: &[u8]) -> Result<RootCertStore, TransportError> {
    let mut root_store = RootCertStore::empty();
    for cert in certs_from_pem(ca_pem, "CA certificate")? {
        root_store.add(cert).map_err(|e| {
            TransportError::tls_config(format!("Failed to add CA certificate to root store: {}", e))
        })?;
    }
    Ok(root_store)
}

/// Load the trust store: the CA file when given, the bundled webpki roots otherwise
pub fn load_root_store(ca_path: Option<&Path>) -> Result<RootCertStore, TransportError> {
    match ca_path {
        Some(path) => {
            let root_store = root_store_from_pem(&read_file(path, "CA certificate")?)?;
            info!(
                "Loaded {} CA certificate(s) from {}",
                root_store.len(),
                path.display()
            );
            Ok(root_store)
        }
        None => {
            let mut root_store = RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            info!("Using bundled webpki root certificates");
            Ok(root_store)
        }
    }
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>, TransportError> {
    std::fs::read(path).map_err(|e| {
        TransportError::tls_config(format!(
            "Failed to open {} file {}: {}",
            what,
            path.display(),
            e
        ))
    })
}
