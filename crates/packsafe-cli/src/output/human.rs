//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use super::formatter::PathCheck;
use anyhow::Result;
use console::Term;
use console::style;
use packsafe_core::ArchiveValidationResult;
use packsafe_core::extraction::AuditSummary;
use packsafe_core::process::ProcessResult;
use std::path::Path;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn headline(&self, ok: bool, text: &str) {
        let line = match (self.use_colors, ok) {
            (true, true) => format!("{} {text}", style("✓").green().bold()),
            (true, false) => format!("{} {text}", style("✗").red().bold()),
            (false, _) => text.to_string(),
        };
        let _ = self.term.write_line(&line);
    }

    fn warnings(&self, warnings: &[String]) {
        if warnings.is_empty() {
            return;
        }
        let _ = self.term.write_line("");
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{}", style("Warnings:").yellow().bold()));
        } else {
            let _ = self.term.write_line("Warnings:");
        }
        for warning in warnings {
            let _ = self.term.write_line(&format!("  - {warning}"));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_validation_result(
        &self,
        archive: &Path,
        result: &ArchiveValidationResult,
    ) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if result.valid {
            self.headline(true, &format!("Archive valid: {}", archive.display()));
        } else {
            self.headline(false, &format!("Archive rejected: {}", archive.display()));
        }

        let _ = self.term.write_line(&format!(
            "  Entries:          {}",
            Self::format_number(result.file_count)
        ));
        let _ = self.term.write_line(&format!(
            "  Uncompressed:     {}",
            Self::format_size(result.total_uncompressed_size)
        ));
        let _ = self.term.write_line(&format!(
            "  Compressed:       {}",
            Self::format_size(result.compressed_size)
        ));

        if self.verbose
            && let Some(ratio) = result.compression_ratio()
        {
            let _ = self
                .term
                .write_line(&format!("  Ratio:            {ratio:.1}:1"));
        }

        self.warnings(&result.warnings);
        Ok(())
    }

    fn format_extraction_result(
        &self,
        archive: &Path,
        extracted_dir: &Path,
        summary: &AuditSummary,
    ) -> Result<()> {
        // Quiet mode still prints the location so scripts can consume it.
        if self.quiet {
            let _ = self.term.write_line(&extracted_dir.display().to_string());
            return Ok(());
        }

        self.headline(true, &format!("Extracted: {}", archive.display()));
        let _ = self.term.write_line(&format!(
            "  Location:     {}",
            extracted_dir.display()
        ));
        let _ = self.term.write_line(&format!(
            "  Files:        {}",
            Self::format_number(summary.files)
        ));
        let _ = self.term.write_line(&format!(
            "  Directories:  {}",
            Self::format_number(summary.directories)
        ));
        let _ = self.term.write_line(&format!(
            "  Total size:   {}",
            Self::format_size(summary.total_size)
        ));

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Symlinks:     {}", summary.symlinks));
        }

        Ok(())
    }

    fn format_process_result(&self, program: &Path, result: &ProcessResult) -> Result<()> {
        // Output was already streamed to the terminal.
        if self.quiet || !self.verbose {
            return Ok(());
        }

        self.headline(
            result.success(),
            &format!("{}: {}", program.display(), result.summary()),
        );
        if result.output_truncated {
            let _ = self
                .term
                .write_line("  (captured output was truncated; the stream above is complete)");
        }
        Ok(())
    }

    fn format_path_check(&self, check: &PathCheck) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if check.safe {
            self.headline(true, &format!("Path is safe: {}", check.path));
        } else {
            self.headline(false, &format!("Path is unsafe: {:?}", check.path));
        }
        let _ = self.term.write_line(&format!(
            "  Valid filename: {}",
            if check.valid_filename { "yes" } else { "no" }
        ));
        let _ = self
            .term
            .write_line(&format!("  Shell-escaped:  {}", check.shell_escaped));
        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = self.term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_success(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(message);
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}
