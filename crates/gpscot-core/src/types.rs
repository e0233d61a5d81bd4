//! Core types shared by the fix reader, encoder, transports and relay.

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single resolved GPS position reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Latitude in signed decimal degrees (south is negative)
    pub latitude: f64,
    /// Longitude in signed decimal degrees (west is negative)
    pub longitude: f64,
    /// Altitude above mean sea level in meters
    pub altitude: f64,
}

impl Fix {
    /// Creates a new fix.
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    /// Returns true if every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite() && self.altitude.is_finite()
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6}, {:.6} @ {:.1}m",
            self.latitude, self.longitude, self.altitude
        )
    }
}

/// Run-scoped identity carried by every emitted event.
///
/// Created once when the relay starts and shared read-only afterwards, so
/// every event of a run carries the same uid.
///
/// # Examples
///
/// ```
/// use gpscot_core::types::Identity;
///
/// let identity = Identity::generate("GPS Receiver");
/// assert_eq!(identity.uid().len(), 36);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    uid: String,
    callsign: String,
}

impl Identity {
    /// Creates an identity with an explicit uid.
    pub fn new(uid: impl Into<String>, callsign: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            callsign: callsign.into(),
        }
    }

    /// Creates an identity with a random UUID v4 uid.
    pub fn generate(callsign: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), callsign)
    }

    /// Returns the unique identifier.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns the display callsign.
    pub fn callsign(&self) -> &str {
        &self.callsign
    }
}

/// Transport used to reach the TAK server.
///
/// - Udp: connectionless datagram per event
/// - Tcp: fresh stream connection per event
/// - Tls: TLS over TCP, either one session per event or one session per run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Unencrypted UDP datagrams
    Udp,
    /// Unencrypted TCP connection per event
    Tcp,
    /// TLS-encrypted TCP connection
    Tls {
        /// Reuse one session for the whole run
        persistent: bool,
    },
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Protocol {
    /// Parses a configuration selector ("UDP", "TCP", "TLS", any case).
    ///
    /// `persistent_tls` picks the TLS lifecycle and is ignored for UDP and TCP.
    pub fn parse(selector: &str, persistent_tls: bool) -> Result<Self, TransportError> {
        match selector.trim().to_ascii_uppercase().as_str() {
            "UDP" => Ok(Protocol::Udp),
            "TCP" => Ok(Protocol::Tcp),
            "TLS" => Ok(Protocol::Tls {
                persistent: persistent_tls,
            }),
            _ => Err(TransportError::UnsupportedProtocol {
                protocol: selector.to_string(),
            }),
        }
    }

    /// Short upper-case name used in log messages.
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Udp => "UDP",
            Protocol::Tcp => "TCP",
            Protocol::Tls { .. } => "TLS",
        }
    }

    /// Returns true if one session is held open for the whole run.
    pub fn is_persistent(&self) -> bool {
        matches!(self, Protocol::Tls { persistent: true })
    }

    /// Returns the conventional TAK server port for this protocol.
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Udp => 8087,
            Protocol::Tcp => 8088,
            Protocol::Tls { .. } => 8089,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_protocol_parse() {
        assert_eq!(Protocol::parse("UDP", true).unwrap(), Protocol::Udp);
        assert_eq!(Protocol::parse("tcp", true).unwrap(), Protocol::Tcp);
        assert_eq!(
            Protocol::parse(" Tls ", false).unwrap(),
            Protocol::Tls { persistent: false }
        );

        let err = Protocol::parse("FOO", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedProtocol);
        assert!(err.to_string().contains("FOO"));
    }

    #[test]
    fn test_protocol_properties() {
        assert!(Protocol::Tls { persistent: true }.is_persistent());
        assert!(!Protocol::Tls { persistent: false }.is_persistent());
        assert!(!Protocol::Tcp.is_persistent());
        assert_eq!(Protocol::Udp.default_port(), 8087);
        assert_eq!(Protocol::Tls { persistent: true }.to_string(), "TLS");
    }

    #[test]
    fn test_identity_generation() {
        let a = Identity::generate("GPS Receiver");
        let b = Identity::generate("GPS Receiver");
        assert_ne!(a.uid(), b.uid());
        assert!(Uuid::parse_str(a.uid()).is_ok());
        assert_eq!(a.callsign(), "GPS Receiver");
    }

    #[test]
    fn test_fix_finite() {
        assert!(Fix::new(34.052, -118.243, 71.0).is_finite());
        assert!(!Fix::new(f64::NAN, 0.0, 0.0).is_finite());
        assert_eq!(
            Fix::new(34.052, -118.243, 71.0).to_string(),
            "34.052000, -118.243000 @ 71.0m"
        );
    }
}
