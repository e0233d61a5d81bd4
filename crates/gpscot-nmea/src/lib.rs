//! GPS fix acquisition for gpscot.
//!
//! This crate turns the NMEA 0183 stream of a USB GPS receiver into
//! [`Fix`](gpscot_core::Fix) values.
//!
//! - [`parser`]: GGA sentence parsing and checksum verification
//! - [`reader`]: the [`FixSource`] trait and the serial-port backed [`SerialFixReader`]
//!
//! # Example
//!
//! ```rust
//! use gpscot_nmea::parser::parse_gga;
//!
//! let fix = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47").unwrap();
//! assert!((fix.latitude - 48.1173).abs() < 1e-9);
//! assert_eq!(fix.altitude, 545.4);
//! ```

pub mod parser;
pub mod reader;

pub use parser::{checksum, is_fix_sentence, parse_gga};
pub use reader::{scan_for_fix, FixSource, SerialFixReader, StopFlag};
