//! Spinner shown while an external tool runs.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;
use packsafe_core::process::OutputSink;
use std::time::Duration;

/// CLI spinner implementing `OutputSink`.
///
/// Shows the most recent line the tool printed along with the byte count
/// and elapsed time. Automatically cleans up on drop.
pub struct CliSpinner {
    bar: ProgressBar,
    bytes_seen: u64,
    pending: Vec<u8>,
}

impl CliSpinner {
    /// Creates a spinner with a fixed prefix such as "Extracting".
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        let bar = ProgressBar::new_spinner();

        // Template: "⠋ Extracting [3s] 12.4 KB  inflating: Pack/model.obj"
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {prefix} [{elapsed}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(prefix.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            bytes_seen: 0,
            pending: Vec::new(),
        }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }

    fn latest_line(&mut self, chunk: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(chunk);
        let end = self.pending.iter().rposition(|&b| b == b'\n')?;
        let complete: Vec<u8> = self.pending.drain(..=end).collect();
        let text = String::from_utf8_lossy(&complete);
        text.lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_string())
    }
}

impl Drop for CliSpinner {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl OutputSink for CliSpinner {
    fn on_output(&mut self, chunk: &[u8]) {
        self.bytes_seen += chunk.len() as u64;
        let size = humanize_bytes(self.bytes_seen);
        match self.latest_line(chunk) {
            Some(line) => self.bar.set_message(format!("{size}  {line}")),
            None => self.bar.set_message(size),
        }
    }
}

/// Converts bytes to human-readable format (KB, MB, GB, TB).
fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_bytes() {
        assert_eq!(humanize_bytes(0), "0 B");
        assert_eq!(humanize_bytes(512), "512 B");
        assert_eq!(humanize_bytes(1024), "1.0 KB");
        assert_eq!(humanize_bytes(1536), "1.5 KB");
        assert_eq!(humanize_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(humanize_bytes(1024 * 1024 * 1024), "1.0 GB");
        assert_eq!(humanize_bytes(1024_u64.pow(4)), "1.0 TB");
    }

    #[test]
    fn test_spinner_tracks_latest_complete_line() {
        let mut spinner = CliSpinner::new("Testing");

        let chunk = b"  inflating: Pack/a.obj\n  inflat";
        spinner.on_output(chunk);
        assert_eq!(spinner.bytes_seen, chunk.len() as u64);
        assert_eq!(spinner.pending, b"  inflat");

        assert_eq!(
            spinner.latest_line(b"ing: Pack/b.png\n"),
            Some("inflating: Pack/b.png".to_string())
        );
        assert!(spinner.pending.is_empty());
    }

    #[test]
    fn test_spinner_partial_line_has_no_message() {
        let mut spinner = CliSpinner::new("Testing");
        assert_eq!(spinner.latest_line(b"no newline yet"), None);
    }
}
