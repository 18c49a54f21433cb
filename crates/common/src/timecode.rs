//! Timecode parsing and formatting.
//!
//! User-facing timestamps arrive as `HH:MM:SS(.ff)`, `MM:SS(.ff)`, or plain
//! seconds. Internally every timestamp is an `f64` number of seconds.

use crate::error::InputValidationError;

/// Parse a user timecode into seconds.
///
/// Empty input means "unset" and yields `0.0`. Anything else that does not
/// parse is rejected rather than silently treated as zero.
pub fn parse_timecode(field: &str, raw: &str) -> Result<f64, InputValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    let invalid = || InputValidationError::InvalidTimecode {
        field: field.to_string(),
        value: raw.to_string(),
    };

    let parts: Vec<&str> = trimmed.split(':').collect();
    let secs = match parts.as_slice() {
        [h, m, s] => {
            let h: u64 = h.parse().map_err(|_| invalid())?;
            let m: u64 = m.parse().map_err(|_| invalid())?;
            let s: f64 = s.parse().map_err(|_| invalid())?;
            (h * 3600 + m * 60) as f64 + s
        }
        [m, s] => {
            let m: u64 = m.parse().map_err(|_| invalid())?;
            let s: f64 = s.parse().map_err(|_| invalid())?;
            (m * 60) as f64 + s
        }
        [s] => s.parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if !secs.is_finite() || secs < 0.0 {
        return Err(invalid());
    }
    Ok(secs)
}

/// Format seconds as `HH:MM:SS.ss`.
pub fn format_timecode(secs: f64) -> String {
    let secs = secs.max(0.0);
    let h = (secs / 3600.0).floor() as u64;
    let m = ((secs % 3600.0) / 60.0).floor() as u64;
    let s = secs % 60.0;
    format!("{h:02}:{m:02}:{s:05.2}")
}
