//! Cursor-on-Target encoding of GPS fixes.
//!
//! Turns a [`Fix`](gpscot_core::Fix) and the run's
//! [`Identity`](gpscot_core::Identity) into the CoT XML document sent to the
//! TAK server. Encoding is a pure function of its inputs: the caller supplies
//! the instant, so the same inputs always produce the same bytes.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use gpscot_core::{Fix, Identity};
//! use gpscot_cot::encode_event;
//!
//! let identity = Identity::new("abc-123", "Test");
//! let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! let xml = encode_event(&identity, &Fix::new(34.052, -118.243, 71.0), now);
//!
//! assert!(xml.contains(r#"stale="2024-01-01T00:02:00Z""#));
//! assert!(xml.contains(r#"hae="71.0""#));
//! ```

pub mod encoder;
pub mod event;
pub mod serializer;

pub use encoder::{encode_event, CotEncoder, EncoderError, DEFAULT_STALE_AFTER};
pub use event::{Point, PositionEvent};
pub use serializer::serialize_event;
