// src/supervisor/format.rs

//! Text formatting for supervisor log lines.

use std::time::Duration;

use chrono::Local;

/// `[HH:MM:SS.mmm LVL] <name>: <message>`
pub fn log_line(name: &str, level: &str, message: &str) -> String {
    format!(
        "[{} {level}] {name}: {message}",
        Local::now().format("%H:%M:%S%.3f")
    )
}

/// `hh:mm:ss.mmm`; hours keep growing past 24.
pub fn duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

pub fn megabytes(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_zero_padded() {
        assert_eq!(duration(Duration::from_millis(3_723_045)), "01:02:03.045");
        assert_eq!(duration(Duration::ZERO), "00:00:00.000");
    }

    #[test]
    fn megabytes_has_one_decimal() {
        assert_eq!(megabytes(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }

    #[test]
    fn log_line_carries_level_and_name() {
        let line = log_line("World", "WRN", "Killing process 42");
        assert!(line.starts_with('['));
        assert!(line.ends_with(" WRN] World: Killing process 42"));
    }
}
