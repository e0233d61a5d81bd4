//! XML serialization for position events

use crate::event::{PositionEvent, COT_VERSION, EVENT_HOW, EVENT_TYPE, REMARKS};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;

/// Serialize a position event to its CoT XML document.
///
/// The layout is fixed: the `event` start tag wraps its timestamps onto a
/// continuation line indented by seven spaces, children are indented by four
/// spaces per level, and there is no XML declaration or trailing newline.
pub fn serialize_event(event: &PositionEvent) -> String {
    format!(
        r#"<event version="{version}" uid="{uid}" type="{event_type}" how="{how}"
       time="{time}" start="{start}" stale="{stale}">
    <point lat="{lat}" lon="{lon}" hae="{hae}" ce="{ce}" le="{le}"/>
    <detail>
        <contact callsign="{callsign}"/>
        <remarks>{remarks}</remarks>
    </detail>
</event>"#,
        version = COT_VERSION,
        uid = escape(event.uid.as_str()),
        event_type = EVENT_TYPE,
        how = EVENT_HOW,
        time = format_timestamp(&event.time),
        start = format_timestamp(&event.start),
        stale = format_timestamp(&event.stale),
        lat = format_number(event.point.lat),
        lon = format_number(event.point.lon),
        hae = format_number(event.point.hae),
        ce = format_number(event.point.ce),
        le = format_number(event.point.le),
        callsign = escape(event.callsign.as_str()),
        remarks = REMARKS,
    )
}

/// ISO-8601 UTC with a `Z` suffix; sub-second digits only when non-zero.
pub fn format_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Shortest round-trip decimal form, always with a fractional part.
pub fn format_number(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(71.0), "71.0");
        assert_eq!(format_number(34.052), "34.052");
        assert_eq!(format_number(-118.243), "-118.243");
        assert_eq!(format_number(9999999.0), "9999999.0");
        assert_eq!(format_number(0.00001), "0.00001");
        assert_eq!(format_number(-0.0), "-0.0");
    }

    #[test]
    fn test_format_timestamp() {
        let whole = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(&whole), "2024-01-01T00:00:00Z");

        let millis = whole + chrono::Duration::milliseconds(250);
        assert_eq!(format_timestamp(&millis), "2024-01-01T00:00:00.250Z");

        let micros = whole + chrono::Duration::microseconds(123456);
        assert_eq!(format_timestamp(&micros), "2024-01-01T00:00:00.123456Z");
    }
}
