// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Playback time conversions.

/// Convert a playback position in seconds to whole milliseconds.
///
/// Rounds to the nearest millisecond; negative and non-finite inputs map
/// to zero.
pub fn seconds_to_ms(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).round() as u64
}

pub fn ms_to_seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

/// Format a millisecond offset as `MM:SS.mmm`.
///
/// Minutes are not wrapped into hours, so an 83 minute offset reads
/// `83:00.000`.
pub fn format_ms(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms / 1000) % 60;
    let millis = ms % 1000;
    format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
}

/// Format a position in seconds as `MM:SS.mmm`, or `00:00.000` when unset.
pub fn format_seconds(seconds: Option<f64>) -> String {
    format_ms(seconds.map(seconds_to_ms).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_time_rounds_to_nearest_ms() {
        assert_eq!(seconds_to_ms(12.3456), 12346);
        assert_eq!(seconds_to_ms(12.3454), 12345);
        assert_eq!(seconds_to_ms(0.0), 0);
        assert_eq!(seconds_to_ms(-1.0), 0);
        assert_eq!(seconds_to_ms(f64::NAN), 0);
    }

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(12346), "00:12.346");
        assert_eq!(format_ms(0), "00:00.000");
        assert_eq!(format_ms(61_005), "01:01.005");
        assert_eq!(format_ms(83 * 60_000), "83:00.000");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(Some(12.3456)), "00:12.346");
        assert_eq!(format_seconds(None), "00:00.000");
    }
}
