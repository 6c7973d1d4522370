//! Encoded polyline codec for route geometries.
//!
//! Coordinates are stored as signed deltas from the previous point, scaled
//! by `10^precision` and written as 5-bit chunks offset into printable ASCII.
//! OSRM emits precision 5 by default and precision 6 for `polyline6`.

use thiserror::Error;

use crate::waypoint::Coordinate;

const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION: i64 = 0x20;
const ASCII_OFFSET: i64 = 63;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolylineError {
    #[error("polyline truncated at byte {0}")]
    Truncated(usize),

    #[error("invalid polyline character {character:?} at byte {position}")]
    InvalidCharacter { position: usize, character: char },

    #[error("polyline value starting at byte {0} does not fit in 64 bits")]
    Overflow(usize),
}

/// Decode an encoded polyline into coordinates, in order.
///
/// An empty string yields an empty sequence. A chunk sequence cut short, or
/// a latitude without its longitude, is an error rather than a shorter
/// result.
pub fn decode(encoded: &str, precision: u32) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let factor = 10f64.powi(precision as i32);
    let mut points = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        let lat_start = index;
        let (lat_delta, lng_start) = read_value(bytes, lat_start)?;
        if lng_start >= bytes.len() {
            return Err(PolylineError::Truncated(lng_start));
        }
        let (lng_delta, next) = read_value(bytes, lng_start)?;
        index = next;

        lat = lat.checked_add(lat_delta).ok_or(PolylineError::Overflow(lat_start))?;
        lng = lng.checked_add(lng_delta).ok_or(PolylineError::Overflow(lng_start))?;
        points.push(Coordinate::new(lat as f64 / factor, lng as f64 / factor));
    }

    Ok(points)
}

/// Encode coordinates at the given precision.
pub fn encode(points: &[Coordinate], precision: u32) -> String {
    let factor = 10f64.powi(precision as i32);
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in points {
        let lat = (point.lat * factor).round() as i64;
        let lng = (point.lng * factor).round() as i64;
        write_value(lat - prev_lat, &mut out);
        write_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn read_value(bytes: &[u8], start: usize) -> Result<(i64, usize), PolylineError> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    let mut index = start;

    loop {
        let Some(&byte) = bytes.get(index) else {
            return Err(PolylineError::Truncated(index));
        };
        let chunk = byte as i64 - ASCII_OFFSET;
        if !(0..=CHUNK_MASK | CONTINUATION).contains(&chunk) {
            return Err(PolylineError::InvalidCharacter {
                position: index,
                character: byte as char,
            });
        }
        if shift > 60 {
            return Err(PolylineError::Overflow(start));
        }

        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;
        index += 1;

        if chunk & CONTINUATION == 0 {
            break;
        }
    }

    let value = if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Ok((value, index))
}

fn write_value(delta: i64, out: &mut String) {
    let mut value = delta << 1;
    if delta < 0 {
        value = !value;
    }
    while value >= CONTINUATION {
        out.push(((CONTINUATION | (value & CHUNK_MASK)) + ASCII_OFFSET) as u8 as char);
        value >>= CHUNK_BITS;
    }
    out.push((value + ASCII_OFFSET) as u8 as char);
}
