// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Shared CLI helpers: formatting and common argument handling.

use chrono::{DateTime, Utc};

/// CLI result type.
pub type Result<T> = anyhow::Result<T>;

/// Format a nanosecond timestamp as UTC wall-clock time.
pub fn format_timestamp(nanos: u64) -> String {
    match DateTime::<Utc>::from_timestamp(
        (nanos / 1_000_000_000) as i64,
        (nanos % 1_000_000_000) as u32,
    ) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => format!("{nanos}ns"),
    }
}

/// Format a nanosecond duration as seconds.
pub fn format_duration(nanos: u64) -> String {
    format!("{:.3}s", nanos as f64 / 1e9)
}

/// Format a byte count with a binary-unit suffix.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Convert a CLI seconds value to nanoseconds.
pub fn seconds_to_nanos(seconds: f64) -> u64 {
    (seconds * 1e9) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(1_500_000_000), "1.500s");
    }

    #[test]
    fn test_seconds_to_nanos() {
        assert_eq!(seconds_to_nanos(1.5), 1_500_000_000);
    }
}
