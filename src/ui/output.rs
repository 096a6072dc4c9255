use crate::error::{ExportError, UserFriendlyError};
use crate::export::{ExportReport, ExportSummary};
use console::{style, Emoji, Term};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

static OK: Emoji = Emoji("✅ ", "✓ ");
static FAIL: Emoji = Emoji("❌ ", "✗ ");
static NOTE: Emoji = Emoji("ℹ️  ", "i ");
static CAUTION: Emoji = Emoji("⚠️  ", "! ");
static STEP: Emoji = Emoji("🚀 ", "> ");

/// All terminal output funnels through here so the three modes stay
/// consistent: styled text for humans, line-delimited JSON for machines,
/// undecorated text for logs.
pub struct OutputFormatter {
    mode: OutputMode,
    colors: bool,
    verbosity: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let colors = mode == OutputMode::Human
            && !quiet
            && Term::stdout().features().colors_supported();

        Self {
            mode,
            colors,
            verbosity: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Json => self.json_line("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
            OutputMode::Human if self.colors => {
                println!("{}{}", OK, style(message).green())
            }
            OutputMode::Human => println!("✓ {}", message),
        }
    }

    /// Errors always reach stderr; the run may still be salvageable and
    /// stdout may be piped somewhere.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Json => self.json_line("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
            OutputMode::Human if self.colors => {
                eprintln!("{}{}", FAIL, style(message).red().bold())
            }
            OutputMode::Human => eprintln!("✗ {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Json => self.json_line("warning", message),
            OutputMode::Plain => println!("WARNING: {}", message),
            OutputMode::Human if self.colors => {
                println!("{}{}", CAUTION, style(message).yellow())
            }
            OutputMode::Human => println!("! {}", message),
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity < 1 {
            return;
        }

        match self.mode {
            OutputMode::Json => self.json_line("info", message),
            OutputMode::Plain => println!("INFO: {}", message),
            OutputMode::Human if self.colors => println!("{}{}", NOTE, style(message).cyan()),
            OutputMode::Human => println!("i {}", message),
        }
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity < 2 {
            return;
        }

        match self.mode {
            OutputMode::Json => self.json_line("debug", message),
            OutputMode::Human if self.colors => println!("  {}", style(message).dim()),
            _ => println!("DEBUG: {}", message),
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Json => self.json_line("operation_start", operation),
            OutputMode::Plain => println!("STARTING: {}", operation),
            OutputMode::Human if self.colors => {
                println!("{}{}", STEP, style(operation).bold())
            }
            OutputMode::Human => println!("> {}", operation),
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Json => {
                self.json_object(&serde_json::json!({ "type": "header", "title": title }))
            }
            OutputMode::Plain => println!("=== {} ===", title),
            OutputMode::Human => {
                println!();
                if self.colors {
                    println!("{}", style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet || self.mode == OutputMode::Json {
            return;
        }

        if self.colors {
            println!("{}", style("─".repeat(60)).dim());
        } else {
            println!("{}", "-".repeat(60));
        }
    }

    pub fn print_user_friendly_error(&self, error: &ExportError) {
        self.error(&error.user_message());

        let suggestion = match error.suggestion() {
            Some(suggestion) => suggestion,
            None => return,
        };

        match self.mode {
            OutputMode::Json => self.json_object(&serde_json::json!({
                "type": "suggestion",
                "message": suggestion,
            })),
            OutputMode::Plain => println!("SUGGESTION: {}", suggestion),
            OutputMode::Human => {
                println!();
                if self.colors {
                    println!("{}{}", NOTE, style(format!("Suggestion: {}", suggestion)).cyan());
                } else {
                    println!("Suggestion: {}", suggestion);
                }
            }
        }
    }

    pub fn print_export_summary(&self, summary: &ExportSummary) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Json => self.json_object(&serde_json::json!({
                "type": "summary",
                "partitions": summary.artifacts.len(),
                "rows": summary.total_rows,
                "attachments": summary.total_attachments,
                "cell_errors": summary.cell_errors.len(),
                "duration_ms": summary.elapsed().as_millis(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
            OutputMode::Plain => {
                println!("COMPLETED: Export");
                println!("Partitions: {}", summary.artifacts.len());
                println!("Rows: {}", summary.total_rows);
                println!("Attachments: {}", summary.total_attachments);
                if !summary.cell_errors.is_empty() {
                    println!("Cell errors: {}", summary.cell_errors.len());
                }
            }
            OutputMode::Human => self.human_summary(summary),
        }
    }

    pub fn print_export_report(&self, report: &ExportReport) {
        match self.mode {
            OutputMode::Json => {
                let json = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".into());
                println!("{}", json);
            }
            OutputMode::Plain => {
                println!("REPORT: Export completed");
                println!("Tracker: {}", report.tracker_url);
                println!("Filter: {}", report.query);
                println!("Partitions: {}", report.artifacts.len());
                println!("Rows: {}", report.total_rows);
                println!("Attachments: {}", report.total_attachments);
                if !report.cell_errors.is_empty() {
                    println!("Cell errors: {}", report.cell_errors.len());
                }
            }
            OutputMode::Human => self.human_report(report),
        }
    }

    fn human_summary(&self, summary: &ExportSummary) {
        println!();
        self.print_separator();

        if self.colors {
            println!("{}{}", OK, style("Export completed!").green().bold());
        } else {
            println!("✓ Export completed!");
        }
        println!();

        self.stat_line("Partitions", &summary.artifacts.len().to_string());
        self.stat_line("Rows", &summary.total_rows.to_string());
        self.stat_line("Attachments", &summary.total_attachments.to_string());
        self.stat_line("Time taken", &format_duration(summary.elapsed()));
        if !summary.cell_errors.is_empty() {
            self.stat_line("Cell errors", &summary.cell_errors.len().to_string());
        }

        self.print_separator();
    }

    fn human_report(&self, report: &ExportReport) {
        self.print_header("Export Report");

        println!("Tracker: {}", report.tracker_url);
        println!("Filter: {}", report.query);
        println!(
            "Exported at: {}",
            report.exported_at.format("%Y-%m-%d %H:%M UTC")
        );
        println!();

        if !report.artifacts.is_empty() {
            println!("Artifacts:");
            for artifact in &report.artifacts {
                println!(
                    "  {} ({} rows, {} attachments)",
                    artifact.name, artifact.rows, artifact.attachments
                );
            }
            println!();
        }

        if !report.cell_errors.is_empty() {
            println!("Cells left unrewritten:");
            for error in &report.cell_errors {
                println!("  - {}", error);
            }
        }
    }

    fn stat_line(&self, label: &str, value: &str) {
        if self.colors {
            println!("  {:<12} {}", format!("{}:", label), style(value).cyan().bold());
        } else {
            println!("  {:<12} {}", format!("{}:", label), value);
        }
    }

    fn json_line(&self, level: &str, message: &str) {
        self.json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));
    }

    fn json_object(&self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string(value).unwrap_or_else(|_| "{}".into()));
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_silences_verbosity() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbosity, 0);
        assert!(formatter.quiet);
    }

    #[test]
    fn test_quiet_disables_colors() {
        let formatter = OutputFormatter::new(OutputMode::Human, 0, true);
        assert!(!formatter.colors);
    }

    #[test]
    fn test_machine_modes_never_color() {
        assert!(!OutputFormatter::new(OutputMode::Json, 0, false).colors);
        assert!(!OutputFormatter::new(OutputMode::Plain, 0, false).colors);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "61m 1s");
    }
}
