//! InfluxDB line protocol encoding, shared by both sink families.
//!
//! `measurement[,tag=value...] field=value[,field=value...] timestamp_ns`

use std::fmt::Write as _;
use std::time::UNIX_EPOCH;

use tracing::warn;

use crate::point::{FieldValue, Point};

/// Encode a batch, one line per point, newline terminated.
///
/// Points left without any encodable field are skipped.
#[must_use]
pub fn encode(points: &[&Point]) -> String {
    let mut body = String::new();
    for point in points {
        if let Some(line) = encode_point(point) {
            body.push_str(&line);
            body.push('\n');
        }
    }
    body
}

/// Encode a single point without a trailing newline.
///
/// Tags with an empty key or value are dropped, as are non-finite floats.
/// Returns `None` when no field remains.
#[must_use]
pub fn encode_point(point: &Point) -> Option<String> {
    let mut line = escape(&point.measurement, &[',', ' ']);

    for (key, value) in &point.tags {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let _ = write!(
            line,
            ",{}={}",
            escape(key, &[',', '=', ' ']),
            escape(value, &[',', '=', ' '])
        );
    }

    let mut separator = ' ';
    for (key, value) in &point.fields {
        let encoded = match value {
            FieldValue::Integer(v) => format!("{v}i"),
            FieldValue::Float(v) if v.is_finite() => format!("{v}"),
            FieldValue::Float(v) => {
                warn!("{}: dropping non-finite field {}={}", point.measurement, key, v);
                continue;
            }
            FieldValue::Boolean(v) => v.to_string(),
            FieldValue::String(v) => format!("\"{}\"", escape(v, &['"', '\\'])),
        };
        let _ = write!(line, "{separator}{}={encoded}", escape(key, &[',', '=', ' ']));
        separator = ',';
    }
    if separator == ' ' {
        warn!("{}: point has no fields, not sent", point.measurement);
        return None;
    }

    if let Ok(since_epoch) = point.timestamp.duration_since(UNIX_EPOCH) {
        let _ = write!(line, " {}", since_epoch.as_nanos());
    }
    Some(line)
}

/// Backslash-escape `special`. Line breaks are always written as `\n` and
/// `\r` so a value never splits its line.
fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}
