//! Transports that deliver CoT events to a TAK server.
//!
//! Every transport frames an event the same way (`0xBF 0x00 0xBF` followed
//! by the UTF-8 XML) and differs only in how the bytes reach the server:
//!
//! - [`UdpSender`]: one datagram from a fresh ephemeral socket per event
//! - [`TcpSender`]: one short-lived connection per event
//! - [`TlsSender`]: TLS over TCP, either one session per event or one
//!   session held for the whole run
//!
//! [`Transport`] wraps the three behind the single [`CotSender`] capability.

pub mod cert;
pub mod client;
pub mod framing;
pub mod state;
pub mod tcp;
pub mod tls;
pub mod transport;
pub mod udp;
pub mod verify;

pub use client::{ClientConfig, CotSender};
pub use framing::{frame_event, FRAME_MARKER};
pub use state::{ConnectionMetrics, ConnectionState, ConnectionStatus, MetricsSnapshot};
pub use tcp::TcpSender;
pub use tls::{build_tls_config, TlsOptions, TlsSender};
pub use transport::Transport;
pub use udp::UdpSender;
