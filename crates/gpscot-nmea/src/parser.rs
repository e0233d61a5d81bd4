//! Parser for NMEA 0183 GGA (fix data) sentences.
//!
//! Only the fields needed for a position are read:
//!
//! ```text
//! $GPGGA,hhmmss.ss,llll.ll,a,yyyyy.yy,a,q,nn,h.h,a.a,M,g.g,M,,*hh
//!                  2       3 4        5          9
//! ```

use gpscot_core::{Fix, SentenceError};

/// Sentence prefixes recognized as fix sentences
pub const FIX_SENTENCE_PREFIXES: [&str; 2] = ["$GPGGA", "$GNGGA"];

const FIELD_LATITUDE: usize = 2;
const FIELD_LAT_HEMISPHERE: usize = 3;
const FIELD_LONGITUDE: usize = 4;
const FIELD_LON_HEMISPHERE: usize = 5;
const FIELD_ALTITUDE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn field(self) -> &'static str {
        match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        }
    }

    fn hemisphere_field(self) -> &'static str {
        match self {
            Axis::Latitude => "latitude hemisphere",
            Axis::Longitude => "longitude hemisphere",
        }
    }

    fn limit(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    /// Returns the sign for a hemisphere indicator, or None if it does not belong to this axis.
    fn sign(self, hemisphere: &str) -> Option<f64> {
        match (self, hemisphere) {
            (Axis::Latitude, "N") | (Axis::Longitude, "E") => Some(1.0),
            (Axis::Latitude, "S") | (Axis::Longitude, "W") => Some(-1.0),
            _ => None,
        }
    }
}

/// Returns true if the line is a candidate fix sentence.
pub fn is_fix_sentence(line: &str) -> bool {
    FIX_SENTENCE_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// Computes the NMEA checksum: XOR of every byte between `$` and `*`.
pub fn checksum(data: &str) -> u8 {
    data.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Parses a GGA sentence into a fix.
///
/// The `*hh` checksum is verified when present; a sentence without one is
/// accepted. Any missing or invalid position field fails the whole sentence,
/// so a partial fix is never produced.
pub fn parse_gga(line: &str) -> Result<Fix, SentenceError> {
    let line = line.trim();
    let body = line
        .strip_prefix('$')
        .ok_or_else(|| SentenceError::malformed("missing '$' start delimiter"))?;

    let data = match body.split_once('*') {
        Some((data, suffix)) => {
            verify_checksum(data, suffix)?;
            data
        }
        None => body,
    };

    let fields: Vec<&str> = data.split(',').collect();
    match fields.first() {
        Some(&"GPGGA") | Some(&"GNGGA") => {}
        Some(other) => {
            return Err(SentenceError::malformed(format!(
                "not a GGA sentence: {}",
                other
            )))
        }
        None => return Err(SentenceError::malformed("empty sentence")),
    }

    let latitude = parse_coordinate(
        required(&fields, FIELD_LATITUDE, "latitude")?,
        required(&fields, FIELD_LAT_HEMISPHERE, "latitude hemisphere")?,
        Axis::Latitude,
    )?;
    let longitude = parse_coordinate(
        required(&fields, FIELD_LONGITUDE, "longitude")?,
        required(&fields, FIELD_LON_HEMISPHERE, "longitude hemisphere")?,
        Axis::Longitude,
    )?;
    let altitude = parse_number("altitude", required(&fields, FIELD_ALTITUDE, "altitude")?)?;

    Ok(Fix::new(latitude, longitude, altitude))
}

fn verify_checksum(data: &str, suffix: &str) -> Result<(), SentenceError> {
    let suffix = suffix.trim();
    if suffix.len() != 2 || !suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SentenceError::InvalidChecksum {
            value: suffix.to_string(),
        });
    }

    let expected = u8::from_str_radix(suffix, 16).map_err(|_| SentenceError::InvalidChecksum {
        value: suffix.to_string(),
    })?;
    let actual = checksum(data);

    if expected != actual {
        return Err(SentenceError::ChecksumMismatch { expected, actual });
    }

    Ok(())
}

fn required<'a>(
    fields: &[&'a str],
    index: usize,
    name: &'static str,
) -> Result<&'a str, SentenceError> {
    fields
        .get(index)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or(SentenceError::MissingField { field: name })
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, SentenceError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SentenceError::invalid_number(field, value))
}

/// Converts `[d]ddmm.mmmm` plus a hemisphere into signed decimal degrees.
///
/// The minutes always occupy the two digits before the decimal point, so the
/// degree width does not need to be known per axis.
fn parse_coordinate(value: &str, hemisphere: &str, axis: Axis) -> Result<f64, SentenceError> {
    if !value.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(SentenceError::invalid_number(axis.field(), value));
    }

    let dot = value.find('.').unwrap_or(value.len());
    if dot < 2 {
        return Err(SentenceError::invalid_number(axis.field(), value));
    }

    let (degrees, minutes) = value.split_at(dot - 2);
    let degrees = if degrees.is_empty() {
        0.0
    } else {
        parse_number(axis.field(), degrees)?
    };
    let minutes = parse_number(axis.field(), minutes)?;

    if minutes >= 60.0 {
        return Err(SentenceError::OutOfRange {
            field: axis.field(),
            value: minutes,
        });
    }

    let magnitude = degrees + minutes / 60.0;
    if magnitude > axis.limit() {
        return Err(SentenceError::OutOfRange {
            field: axis.field(),
            value: magnitude,
        });
    }

    let sign = axis
        .sign(hemisphere)
        .ok_or_else(|| SentenceError::InvalidHemisphere {
            field: axis.hemisphere_field(),
            value: hemisphere.to_string(),
        })?;

    Ok(sign * magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_checksum(data: &str) -> String {
        format!("${}*{:02X}", data, checksum(data))
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_parse_reference_sentence() {
        let fix =
            parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n")
                .unwrap();
        assert_close(fix.latitude, 48.1173);
        assert_close(fix.longitude, 11.0 + 31.0 / 60.0);
        assert_eq!(fix.altitude, 545.4);
    }

    #[test]
    fn test_parse_southwest_fix() {
        let line = with_checksum("GPGGA,000000,3403.12,N,11814.58,W,1,08,0.9,71.0,M,,M,,");
        let fix = parse_gga(&line).unwrap();
        assert_close(fix.latitude, 34.052);
        assert_close(fix.longitude, -118.243);
        assert_eq!(fix.altitude, 71.0);

        let line = with_checksum("GNGGA,000000,3351.00,S,15112.30,E,1,08,0.9,-3.5,M,,M,,");
        let fix = parse_gga(&line).unwrap();
        assert_close(fix.latitude, -33.85);
        assert_close(fix.longitude, 151.205);
        assert_eq!(fix.altitude, -3.5);
    }

    #[test]
    fn test_sentence_without_checksum_is_accepted() {
        let fix = parse_gga("$GPGGA,000000,3403.12,N,11814.58,W,1,08,0.9,71.0,M,,M,,").unwrap();
        assert_close(fix.latitude, 34.052);
    }

    #[test]
    fn test_checksum_mismatch() {
        let err =
            parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48")
                .unwrap_err();
        assert_eq!(
            err,
            SentenceError::ChecksumMismatch {
                expected: 0x48,
                actual: 0x47
            }
        );

        let err = parse_gga("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,,M,,*G1")
            .unwrap_err();
        assert!(matches!(err, SentenceError::InvalidChecksum { .. }));
    }

    #[test]
    fn test_no_fix_sentence_is_missing_fields() {
        // Receivers emit empty position fields until they have a fix
        let line = with_checksum("GPGGA,235947.000,,,,,0,00,,,M,,M,,");
        let err = parse_gga(&line).unwrap_err();
        assert_eq!(err, SentenceError::MissingField { field: "latitude" });
    }

    #[test]
    fn test_missing_altitude() {
        let line = with_checksum("GPGGA,000000,3403.12,N,11814.58,W,1,08,0.9,,M,,M,,");
        let err = parse_gga(&line).unwrap_err();
        assert_eq!(err, SentenceError::MissingField { field: "altitude" });

        let err = parse_gga("$GPGGA,000000,3403.12,N,11814.58,W").unwrap_err();
        assert_eq!(err, SentenceError::MissingField { field: "altitude" });
    }

    #[test]
    fn test_invalid_fields() {
        let err = parse_gga("$GPGGA,000000,34x3.12,N,11814.58,W,1,08,0.9,71.0,M,,M,,").unwrap_err();
        assert!(matches!(
            err,
            SentenceError::InvalidNumber {
                field: "latitude",
                ..
            }
        ));

        let err = parse_gga("$GPGGA,000000,3403.12,E,11814.58,W,1,08,0.9,71.0,M,,M,,").unwrap_err();
        assert!(matches!(err, SentenceError::InvalidHemisphere { .. }));

        let err = parse_gga("$GPGGA,000000,9503.12,N,11814.58,W,1,08,0.9,71.0,M,,M,,").unwrap_err();
        assert!(matches!(
            err,
            SentenceError::OutOfRange {
                field: "latitude",
                ..
            }
        ));

        let err = parse_gga("$GPGGA,000000,3475.00,N,11814.58,W,1,08,0.9,71.0,M,,M,,").unwrap_err();
        assert!(matches!(err, SentenceError::OutOfRange { .. }));

        let err = parse_gga("$GPGGA,000000,3403.12,N,11814.58,W,1,08,0.9,high,M,,M,,").unwrap_err();
        assert!(matches!(
            err,
            SentenceError::InvalidNumber {
                field: "altitude",
                ..
            }
        ));
    }

    #[test]
    fn test_not_a_gga_sentence() {
        let err = parse_gga("$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W")
            .unwrap_err();
        assert!(matches!(err, SentenceError::Malformed { .. }));

        let err = parse_gga("GPGGA,123519").unwrap_err();
        assert!(matches!(err, SentenceError::Malformed { .. }));
    }

    #[test]
    fn test_is_fix_sentence() {
        assert!(is_fix_sentence("$GPGGA,123519"));
        assert!(is_fix_sentence("$GNGGA,123519"));
        assert!(!is_fix_sentence("$GPRMC,123519"));
        assert!(!is_fix_sentence("garbage $GPGGA"));
    }
}
