//! Formatting and parsing helpers.
//!
//! Human-readable durations and sizes for the CLI summary, the fixed-precision
//! seconds ffmpeg receives on its command line, and the `HH:MM:SS.ms` stamps
//! it reports back in progress lines.

/// Formats seconds as `HH:MM:SS`, truncating fractions. Invalid input gives `--:--:--`.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--:--".to_string();
    }
    let whole = seconds.trunc() as u64;
    format!("{:02}:{:02}:{:02}", whole / 3600, whole / 60 % 60, whole % 60)
}

/// Formats a byte count with binary units.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Seconds as passed to ffmpeg's `-ss` and `-t`: millisecond precision, never negative.
#[must_use]
pub fn format_seconds_arg(seconds: f64) -> String {
    format!("{:.3}", seconds.max(0.0))
}

/// Parses an ffmpeg `HH:MM:SS.ms` stamp into seconds.
#[must_use]
pub fn parse_ffmpeg_time(time: &str) -> Option<f64> {
    let mut fields = time.trim().split(':');
    let (h, m, s) = (fields.next()?, fields.next()?, fields.next()?);
    if fields.next().is_some() {
        return None;
    }
    let hours: f64 = h.parse().ok()?;
    let minutes: f64 = m.parse().ok()?;
    let secs: f64 = s.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(0.0), "00:00:00");
        assert_eq!(format_duration(3725.9), "01:02:05");
        assert_eq!(format_duration(-1.0), "--:--:--");
        assert_eq!(format_duration(f64::NAN), "--:--:--");
    }

    #[test]
    fn ffmpeg_time_stamps() {
        assert_eq!(parse_ffmpeg_time("00:00:12.50"), Some(12.5));
        assert_eq!(parse_ffmpeg_time("01:00:00.00"), Some(3600.0));
        assert_eq!(parse_ffmpeg_time("N/A"), None);
        assert_eq!(parse_ffmpeg_time("12.5"), None);
        assert_eq!(parse_ffmpeg_time("1:2:3:4"), None);
    }

    #[test]
    fn seconds_args_are_millisecond_precise() {
        assert_eq!(format_seconds_arg(3.0), "3.000");
        assert_eq!(format_seconds_arg(-0.2), "0.000");
        assert_eq!(format_seconds_arg(1.23456), "1.235");
    }

    #[test]
    fn byte_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GiB");
    }
}
