//! The gpscot relay loop.
//!
//! A [`Relay`] repeatedly acquires a fix, encodes it as a CoT position
//! event and hands it to the configured transport, sleeping a fixed interval
//! between cycles. Failures are reported through the injected
//! [`DiagnosticSink`](gpscot_core::DiagnosticSink) and are recoverable,
//! except on a persistent TLS session where a connect or send failure ends
//! the run.

pub mod relay;

pub use relay::{build_relay, Relay, RelayError, RelaySettings, RunReport};
