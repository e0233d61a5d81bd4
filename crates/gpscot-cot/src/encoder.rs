//! Fix to CoT document encoding.

use crate::event::PositionEvent;
use crate::serializer::serialize_event;
use chrono::{DateTime, TimeDelta, Utc};
use gpscot_core::{Fix, Identity};
use std::time::Duration;
use thiserror::Error;

/// Validity window of an event when none is configured
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(120);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncoderError {
    #[error("Stale window of {secs}s is out of range")]
    StaleOutOfRange { secs: u64 },
}

/// Encodes fixes with a fixed validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CotEncoder {
    stale_after: TimeDelta,
}

impl Default for CotEncoder {
    fn default() -> Self {
        Self {
            stale_after: TimeDelta::seconds(DEFAULT_STALE_AFTER.as_secs() as i64),
        }
    }
}

impl CotEncoder {
    /// Creates an encoder whose events go stale `stale_after` past their start.
    pub fn new(stale_after: Duration) -> Result<Self, EncoderError> {
        let stale_after = TimeDelta::from_std(stale_after).map_err(|_| {
            EncoderError::StaleOutOfRange {
                secs: stale_after.as_secs(),
            }
        })?;
        Ok(Self { stale_after })
    }

    /// Returns the validity window.
    pub fn stale_after(&self) -> TimeDelta {
        self.stale_after
    }

    /// Builds the event for `fix` observed at `now`.
    pub fn event(&self, identity: &Identity, fix: &Fix, now: DateTime<Utc>) -> PositionEvent {
        let stale = now
            .checked_add_signed(self.stale_after)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        PositionEvent::new(identity, fix, now, stale)
    }

    /// Encodes `fix` observed at `now` to a CoT XML document.
    pub fn encode(&self, identity: &Identity, fix: &Fix, now: DateTime<Utc>) -> String {
        serialize_event(&self.event(identity, fix, now))
    }
}

/// Encodes `fix` at `now` with the default two minute validity window.
pub fn encode_event(identity: &Identity, fix: &Fix, now: DateTime<Utc>) -> String {
    CotEncoder::default().encode(identity, fix, now)
}
