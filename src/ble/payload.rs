//! Decoding of configuration-characteristic writes.
//!
//! Pure byte parsing, no SoftDevice types, so it is also built into the
//! host library and tested there.
//!
//! Time characteristic: `u64` little-endian Unix seconds, optionally
//! followed by a `u32` little-endian microseconds field.
//!
//! Location characteristic:
//!
//! ```text
//! | lat: f32 LE | lon: f32 LE | timezone (UTF-8) | 0x00 | city (UTF-8) |
//! ```
//!
//! Over-long strings are truncated to the [`Location`] capacities.

use crate::config::{SECS_YR_2000, SECS_YR_2100};
use crate::error::Error;
use crate::event::{Location, TimeValue};

const COORDS_LEN: usize = 8;

/// Decode a time characteristic write. Times outside 2000-2099 are
/// refused.
pub fn decode_time(data: &[u8]) -> Result<TimeValue, Error> {
    let (secs, micros) = match data.len() {
        8 => (le_u64(&data[..8]), 0),
        12 => (le_u64(&data[..8]), le_u32(&data[8..12])),
        _ => return Err(Error::RequestFailed),
    };

    if !(SECS_YR_2000..SECS_YR_2100).contains(&secs) || micros >= 1_000_000 {
        return Err(Error::RequestFailed);
    }
    Ok(TimeValue { secs, micros })
}

/// Decode a location characteristic write.
pub fn decode_location(data: &[u8]) -> Result<Location, Error> {
    if data.len() < COORDS_LEN {
        return Err(Error::RequestFailed);
    }

    let lat = f32::from_bits(le_u32(&data[0..4]));
    let lon = f32::from_bits(le_u32(&data[4..8]));
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::RequestFailed);
    }

    let text = core::str::from_utf8(&data[COORDS_LEN..]).map_err(|_| Error::RequestFailed)?;
    let (timezone, city) = text.split_once('\0').ok_or(Error::RequestFailed)?;
    if timezone.is_empty() {
        return Err(Error::RequestFailed);
    }

    Ok(Location::new(lat, lon, timezone, city))
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    u32::from_le_bytes(raw)
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location_bytes(lat: f32, lon: f32, text: &[u8]) -> heapless::Vec<u8, 128> {
        let mut out = heapless::Vec::new();
        out.extend_from_slice(&lat.to_le_bytes()).unwrap();
        out.extend_from_slice(&lon.to_le_bytes()).unwrap();
        out.extend_from_slice(text).unwrap();
        out
    }

    #[test]
    fn time_with_and_without_micros() {
        let secs: u64 = 1_800_000_000;
        assert_eq!(
            decode_time(&secs.to_le_bytes()),
            Ok(TimeValue::from_secs(secs))
        );

        let mut long = [0u8; 12];
        long[..8].copy_from_slice(&secs.to_le_bytes());
        long[8..].copy_from_slice(&250_000u32.to_le_bytes());
        assert_eq!(
            decode_time(&long),
            Ok(TimeValue {
                secs,
                micros: 250_000
            })
        );
    }

    #[test]
    fn time_rejects_bad_lengths_and_old_dates() {
        assert_eq!(decode_time(&[0; 4]), Err(Error::RequestFailed));
        assert_eq!(decode_time(&[]), Err(Error::RequestFailed));
        assert_eq!(
            decode_time(&1_000u64.to_le_bytes()),
            Err(Error::RequestFailed)
        );
    }

    #[test]
    fn time_rejects_dates_past_the_rtc_calendar() {
        assert_eq!(
            decode_time(&u64::MAX.to_le_bytes()),
            Err(Error::RequestFailed)
        );
        assert_eq!(
            decode_time(&SECS_YR_2100.to_le_bytes()),
            Err(Error::RequestFailed)
        );
        let last = SECS_YR_2100 - 1;
        assert_eq!(
            decode_time(&last.to_le_bytes()),
            Ok(TimeValue::from_secs(last))
        );
    }

    #[test]
    fn location_decodes_fields() {
        let raw = location_bytes(-37.8136, 144.9631, b"AEST-10AEDT,M10.1.0,M4.1.0/3\0Melbourne");
        let loc = decode_location(&raw).unwrap();
        assert_eq!(loc.city.as_str(), "Melbourne");
        assert_eq!(loc.timezone.as_str(), "AEST-10AEDT,M10.1.0,M4.1.0/3");
        assert_eq!(loc.lat, -37.8136);
    }

    #[test]
    fn location_allows_empty_city() {
        let raw = location_bytes(0.0, 0.0, b"UTC0\0");
        assert_eq!(decode_location(&raw).unwrap().city.as_str(), "");
    }

    #[test]
    fn location_rejects_malformed_writes() {
        assert!(decode_location(&[0; 5]).is_err());
        assert!(decode_location(&location_bytes(91.0, 0.0, b"UTC0\0x")).is_err());
        assert!(decode_location(&location_bytes(0.0, 0.0, b"UTC0 no separator")).is_err());
        assert!(decode_location(&location_bytes(0.0, 0.0, b"\0city")).is_err());
        assert!(decode_location(&location_bytes(0.0, 0.0, &[0xFF, 0, b'x'])).is_err());
    }
}
