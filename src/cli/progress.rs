//! Progress display module
//!
//! Handles displaying download progress in the CLI.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::dcc::TransferSnapshot;
use crate::supervisor::DownloadReport;

/// Download statistics for progress display
#[derive(Debug, Clone, Default)]
pub struct DownloadStats {
    /// Bytes on disk, including any resumed prefix
    pub downloaded: u64,
    /// Announced file size
    pub total: u64,
    /// Download speed in bytes per second
    pub download_speed: f64,
    /// Download progress (0.0 to 1.0)
    pub progress: f64,
}

impl DownloadStats {
    /// Create new download stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Format bytes to human readable string
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_index])
    }

    /// Format speed to human readable string
    pub fn format_speed(bytes_per_sec: f64) -> String {
        format!("{}/s", Self::format_bytes(bytes_per_sec as u64))
    }

    /// Format duration to human readable string
    pub fn format_duration(duration: Duration) -> String {
        let total_secs = duration.as_secs();
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Calculate ETA based on download speed and remaining bytes
    pub fn calculate_eta(downloaded: u64, total: u64, speed: f64) -> Option<Duration> {
        if speed <= 0.0 || downloaded >= total {
            return None;
        }

        let remaining = total.saturating_sub(downloaded) as f64;
        Some(Duration::from_secs_f64(remaining / speed))
    }
}

impl From<&TransferSnapshot> for DownloadStats {
    fn from(snapshot: &TransferSnapshot) -> Self {
        Self {
            downloaded: snapshot.progress,
            total: snapshot.filesize,
            download_speed: snapshot.bytes_per_sec,
            progress: snapshot.fraction(),
        }
    }
}

/// Progress display for CLI
pub struct ProgressDisplay {
    /// Start time of the download
    start_time: Instant,
    /// Last update time
    last_update: Option<Instant>,
    /// Update interval
    update_interval: Duration,
    /// Quiet mode (no progress output)
    quiet: bool,
}

impl ProgressDisplay {
    /// Create a new progress display
    pub fn new(quiet: bool) -> Self {
        Self::with_interval(quiet, Duration::from_millis(500))
    }

    /// Create a progress display with custom update interval
    pub fn with_interval(quiet: bool, interval: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            last_update: None,
            update_interval: interval,
            quiet,
        }
    }

    /// Redraw the progress line, at most once per interval
    pub fn update(&mut self, snapshot: &TransferSnapshot) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        let finished = snapshot.filesize > 0 && snapshot.progress >= snapshot.filesize;
        if let Some(last) = self.last_update {
            if last.elapsed() < self.update_interval && !finished {
                return Ok(());
            }
        }
        self.last_update = Some(Instant::now());

        let line = Self::render(&snapshot.filename, &DownloadStats::from(snapshot));
        print!("\r\x1b[2K{}", line);
        io::stdout().flush()
    }

    /// Build the same-line progress text
    pub fn render(filename: &str, stats: &DownloadStats) -> String {
        let progress_percent = stats.progress * 100.0;

        let bar_width: usize = 30;
        let filled = ((stats.progress * bar_width as f64) as usize).min(bar_width);
        let bar: String = "=".repeat(filled) + &" ".repeat(bar_width - filled);

        let eta_str = DownloadStats::calculate_eta(stats.downloaded, stats.total, stats.download_speed)
            .map(DownloadStats::format_duration)
            .unwrap_or_else(|| "∞".to_string());

        format!(
            "{} [{}] {:.1}% | {} / {} | {} | ETA: {}",
            filename,
            bar,
            progress_percent,
            DownloadStats::format_bytes(stats.downloaded),
            DownloadStats::format_bytes(stats.total),
            DownloadStats::format_speed(stats.download_speed),
            eta_str,
        )
    }

    /// Print the final line for one pack
    pub fn print_report(&self, report: &DownloadReport) -> io::Result<()> {
        print!("\r\x1b[2K");
        io::stdout().flush()?;

        if report.succeeded() {
            if !self.quiet {
                println!(
                    "Pack #{} from {}: download completed in {} seconds ({}, {} attempt{})",
                    report.pack,
                    report.bot,
                    report.elapsed_secs,
                    DownloadStats::format_bytes(report.bytes),
                    report.attempts,
                    if report.attempts == 1 { "" } else { "s" },
                );
            }
        } else {
            eprintln!(
                "Pack #{} from {}: download failed: {}",
                report.pack,
                report.bot,
                report.reason.as_deref().unwrap_or("unknown"),
            );
        }
        Ok(())
    }

    /// Print a status message
    pub fn print_status(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }

        println!("\r\x1b[2K{}", message);
        Ok(())
    }

    /// Print an error message
    pub fn print_error(&self, message: &str) -> io::Result<()> {
        eprintln!("\r\x1b[2KError: {}", message);
        Ok(())
    }

    /// Get the elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(DownloadStats::format_bytes(0), "0.00 B");
        assert_eq!(DownloadStats::format_bytes(1024), "1.00 KB");
        assert_eq!(DownloadStats::format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(DownloadStats::format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(DownloadStats::format_speed(1024.0), "1.00 KB/s");
        assert_eq!(DownloadStats::format_speed(1024.0 * 1024.0), "1.00 MB/s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(DownloadStats::format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(DownloadStats::format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(DownloadStats::format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_calculate_eta() {
        let eta = DownloadStats::calculate_eta(50, 100, 10.0);
        assert_eq!(eta, Some(Duration::from_secs(5)));

        // Already complete
        assert_eq!(DownloadStats::calculate_eta(100, 100, 10.0), None);

        // Zero speed
        assert_eq!(DownloadStats::calculate_eta(50, 100, 0.0), None);
    }

    #[test]
    fn test_stats_from_snapshot() {
        let snapshot = TransferSnapshot {
            filename: "a.bin".to_string(),
            progress: 40,
            filesize: 100,
            bytes_per_sec: 20.0,
        };
        let stats = DownloadStats::from(&snapshot);
        assert_eq!(stats.downloaded, 40);
        assert_eq!(stats.total, 100);
        assert_eq!(stats.progress, 0.4);
    }

    #[test]
    fn test_render_line() {
        let stats = DownloadStats {
            downloaded: 50,
            total: 100,
            download_speed: 10.0,
            progress: 0.5,
        };
        let line = ProgressDisplay::render("a.bin", &stats);
        assert!(line.starts_with("a.bin ["));
        assert!(line.contains("50.0%"));
        assert!(line.contains("50.00 B / 100.00 B"));
        assert!(line.contains("ETA: 5s"));
    }

    #[test]
    fn test_progress_display_quiet() {
        let mut display = ProgressDisplay::new(true);
        assert!(display.is_quiet());
        assert!(display.update(&TransferSnapshot::default()).is_ok());
    }
}
