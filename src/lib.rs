pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod partition;
pub mod rewrite;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, ExportTarget, OutputFormat};
pub use config::{CliOverrides, Config, UserRename};
pub use error::{ExportError, Result, UserFriendlyError};

// Core functionality re-exports
pub use client::{Credentials, TrackerEndpoints, TrackerSession, WebClient};
pub use export::{ExportOrchestrator, ExportReport, ExportSummary, ExportWriter};
pub use partition::{Partition, Query, QueryPartitioner};
pub use rewrite::{AttachmentFetcher, CsvRewriter, RewriteOutcome, UserMapping};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use crate::export::ConfigSnapshot;
use crate::ui::prompt::{Confirmation, TerminalPrompt};
use chrono::Utc;
use std::path::Path;

/// Main library interface driving the export pipeline.
pub struct JiraDump {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
    quiet: bool,
}

impl JiraDump {
    /// Create a new JiraDump instance with the provided configuration
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
            quiet,
        })
    }

    /// Create a new JiraDump instance for testing (no signal handler conflicts)
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet);
        let shutdown = GracefulShutdown::new_for_test();

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
            quiet,
        }
    }

    /// Create JiraDump instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            crate::cli::OutputFormat::Human => OutputMode::Human,
            crate::cli::OutputFormat::Json => OutputMode::Json,
            crate::cli::OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Run the full export: connect, verify the server-side preconditions,
    /// split the filter into partitions, then download and rewrite each one.
    pub fn run_export(&self, target: &ExportTarget) -> Result<ExportReport> {
        self.shutdown.check_shutdown()?;

        self.output_formatter.start_operation("Starting issue export");

        if !self.quiet {
            self.confirm_permissions(target)?;
        }

        // Step 1: establish the authenticated session
        let session = self.connect(target)?;
        self.shutdown.check_shutdown()?;

        // Step 2: account locale, if requested; the CSV header names the
        // rewriter matches are locale-dependent
        if self.config.tracker.verify_locale {
            self.verify_locale(&session)?;
        }
        self.shutdown.check_shutdown()?;

        // Step 3: split the filter into partitions below the server ceiling
        let partitions = self.partition_query(&session, &target.query)?;
        self.shutdown.check_shutdown()?;

        if partitions.is_empty() {
            self.output_formatter
                .warning("The filter matched no issues; nothing to export.");
        } else {
            self.output_formatter.print_header(&format!(
                "Checked the filter and now starting to download CSV files for {} filter parts",
                partitions.len()
            ));
        }

        // Step 4: download, rewrite, and write one artifact per partition
        let summary = self.download_partitions(&session, &partitions, &target.base_label)?;

        // Step 5: persist the run report next to the artifacts
        let report = ExportReport {
            tracker_url: session.endpoints().base().to_string(),
            base_label: target.base_label.clone(),
            query: target.query.as_str().to_string(),
            exported_at: Utc::now(),
            artifacts: summary.artifacts.clone(),
            total_rows: summary.total_rows,
            total_attachments: summary.total_attachments,
            cell_errors: summary.cell_errors.clone(),
            config_used: ConfigSnapshot::from_config(&self.config),
        };
        report.save_json(&self.config.output.base_directory)?;

        self.output_formatter.print_export_summary(&summary);

        Ok(report)
    }

    /// The exporting account silently drops issues and attachments it cannot
    /// see, so make the operator vouch for its permissions up front.
    fn confirm_permissions(&self, target: &ExportTarget) -> Result<()> {
        let account = target
            .credentials
            .username
            .as_deref()
            .unwrap_or("your cookie-given user");
        let scope = if target.base_label == "custom" {
            "the project(s) of the given JQL".to_string()
        } else {
            format!("the project \"{}\"", target.base_label)
        };

        self.output_formatter.warning(&format!(
            "Did you ensure {} is permitted correctly within {}?",
            account, scope
        ));
        self.output_formatter.warning(
            "The easiest way to ensure that is to put them in every project role that does exist \
             within the project(s).",
        );

        let prompt = TerminalPrompt::new(!self.quiet);
        if !prompt.confirm("Continue?")? {
            return Err(ExportError::Cancelled);
        }

        Ok(())
    }

    fn connect(&self, target: &ExportTarget) -> Result<TrackerSession> {
        let spinner = self
            .progress_manager
            .create_spinner("Connecting to the tracker");

        let session = TrackerSession::connect(
            &target.base_url,
            target.credentials.clone(),
            self.config.request_timeout(),
        )?;
        session.ensure_logged_in()?;

        ui::progress::finish_progress_with_summary(
            &spinner,
            "Session established",
            spinner.elapsed(),
        );

        Ok(session)
    }

    fn verify_locale(&self, session: &TrackerSession) -> Result<()> {
        let username = match session.username() {
            Some(name) => name.to_string(),
            // Only known for form logins; cookie-only sessions skip the check.
            None => return Ok(()),
        };

        let prompt = TerminalPrompt::new(!self.quiet);

        loop {
            let body = session.fetch_html(&session.endpoints().user_api(&username))?;
            let locale = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .get("locale")
                        .and_then(|locale| locale.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_default();

            if locale == "en_US" {
                return Ok(());
            }

            self.output_formatter.warning(&format!(
                "Please ensure the user \"{}\" uses \"English (United States)\" as default language.",
                username
            ));
            self.output_formatter
                .warning("To change that, head to this URL and change the language settings:");
            self.output_formatter
                .warning(&session.endpoints().profile_page());

            if !prompt.confirm("Continue?")? {
                return Err(ExportError::Cancelled);
            }
        }
    }

    fn partition_query(&self, session: &TrackerSession, query: &Query) -> Result<Vec<Partition>> {
        self.output_formatter.start_operation("Analyzing filter size");

        let prompt = TerminalPrompt::new(!self.quiet);
        let partitioner = QueryPartitioner::new(
            session,
            session.endpoints(),
            &prompt,
            &self.output_formatter,
            self.config.tracker.max_issues,
        );

        let partitions = partitioner.partition(query)?;

        self.output_formatter
            .info(&format!("Split the filter into {} part(s)", partitions.len()));

        Ok(partitions)
    }

    fn download_partitions(
        &self,
        session: &TrackerSession,
        partitions: &[Partition],
        base_label: &str,
    ) -> Result<ExportSummary> {
        self.output_formatter
            .start_operation("Downloading CSV exports and attachments");

        let output_root = self.config.output.base_directory.clone();
        std::fs::create_dir_all(&output_root)?;

        let mapping = UserMapping::new(&self.config.mapping.users)?;
        let fetcher = AttachmentFetcher::new(
            session,
            session.endpoints(),
            &output_root,
            &self.config.export.destination_base_url,
        );
        let rewriter = CsvRewriter::new(&fetcher, &mapping, &self.config.tracker.nested_columns);
        let writer = ExportWriter::new(&output_root);
        let orchestrator = ExportOrchestrator::new(
            session,
            session.endpoints(),
            &rewriter,
            &writer,
            &self.output_formatter,
            &self.shutdown,
        );

        let progress_bar = self
            .progress_manager
            .create_partition_progress(partitions.len() as u64);
        let callback = {
            let pb = progress_bar.clone();
            move |summary: &ExportSummary| {
                ui::progress::update_partition_progress(&pb, summary);
            }
        };

        let summary = orchestrator.export(partitions, base_label, Some(&callback))?;

        ui::progress::finish_progress_with_summary(
            &progress_bar,
            &format!("Downloaded {} partition(s)", summary.artifacts.len()),
            summary.elapsed(),
        );

        Ok(summary)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(ExportError::Io)?;
        Ok(())
    }

    /// Get configuration reference
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get output formatter reference
    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    /// Get progress manager reference
    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &ExportError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Convenience function to export a whole project with minimal setup
pub fn export_project_simple(
    base_url: &str,
    username: &str,
    password: &str,
    project: &str,
    output_dir: Option<&Path>,
) -> Result<ExportReport> {
    let mut config = Config::default();

    if let Some(output_path) = output_dir {
        config.output.base_directory = output_path.to_path_buf();
    }

    let jiradump = JiraDump::new(config, OutputMode::Human, 0, true)?;

    let target = ExportTarget {
        base_url: base_url.to_string(),
        credentials: Credentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            cookies: Vec::new(),
        },
        base_label: project.to_string(),
        query: Query::for_project(project),
    };

    jiradump.run_export(&target)
}

/// Validate a tracker base URL
pub fn validate_export_url(url: &str) -> Result<String> {
    cli::validate_tracker_url(url).map_err(|msg| ExportError::InvalidUrl { url: msg })
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jiradump_creation() {
        let config = Config::default();
        let jiradump = JiraDump::new_for_test(config, OutputMode::Human, 1, false);

        assert!(jiradump.is_running());
        assert_eq!(jiradump.config().tracker.max_issues, 500);
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        let result = JiraDump::generate_sample_config(&config_path);
        assert!(result.is_ok());
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[tracker]"));
        assert!(content.contains("[output]"));
        assert!(content.contains("[export]"));
    }

    #[test]
    fn test_url_validation() {
        assert!(validate_export_url("https://jira.example.com").is_ok());
        assert!(validate_export_url("ftp://jira.example.com").is_err());
        assert!(validate_export_url("not-a-url").is_err());
    }

    #[test]
    fn test_version_info() {
        let version = version_info();
        assert!(!version.is_empty());
    }

    #[test]
    fn test_shutdown_handling() {
        let config = Config::default();
        let jiradump = JiraDump::new_for_test(config, OutputMode::Human, 0, true);

        assert!(jiradump.is_running());

        jiradump.request_shutdown();
        assert!(!jiradump.is_running());
    }
}
