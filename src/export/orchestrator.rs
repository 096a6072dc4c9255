use crate::client::{TrackerEndpoints, WebClient};
use crate::error::Result;
use crate::export::report::ArtifactInfo;
use crate::export::writer::ExportWriter;
use crate::partition::Partition;
use crate::rewrite::CsvRewriter;
use crate::ui::{GracefulShutdown, OutputFormatter};
use std::time::{Duration, Instant};

/// Aggregated counts across all processed partitions.
#[derive(Debug)]
pub struct ExportSummary {
    pub artifacts: Vec<ArtifactInfo>,
    pub total_rows: usize,
    pub total_attachments: usize,
    pub cell_errors: Vec<String>,
    start_time: Instant,
}

impl ExportSummary {
    pub fn new() -> Self {
        Self {
            artifacts: Vec::new(),
            total_rows: 0,
            total_attachments: 0,
            cell_errors: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn record(&mut self, artifact: ArtifactInfo, cell_errors: Vec<String>) {
        self.total_rows += artifact.rows;
        self.total_attachments += artifact.attachments;
        self.artifacts.push(artifact);
        self.cell_errors.extend(cell_errors);
    }
}

impl Default for ExportSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the per-partition sequence: fetch the CSV export, rewrite it,
/// write the artifact, report. Partitions are processed strictly in the
/// order the partitioner produced them, so concatenating the artifacts by
/// sequence number reconstructs the full ordered export.
pub struct ExportOrchestrator<'a> {
    web: &'a dyn WebClient,
    endpoints: &'a TrackerEndpoints,
    rewriter: &'a CsvRewriter<'a>,
    writer: &'a ExportWriter<'a>,
    formatter: &'a OutputFormatter,
    shutdown: &'a GracefulShutdown,
}

impl<'a> ExportOrchestrator<'a> {
    pub fn new(
        web: &'a dyn WebClient,
        endpoints: &'a TrackerEndpoints,
        rewriter: &'a CsvRewriter<'a>,
        writer: &'a ExportWriter<'a>,
        formatter: &'a OutputFormatter,
        shutdown: &'a GracefulShutdown,
    ) -> Self {
        Self {
            web,
            endpoints,
            rewriter,
            writer,
            formatter,
            shutdown,
        }
    }

    /// A failing partition fetch is fatal and propagates; artifacts already
    /// written stay on disk, re-runs overwrite them.
    pub fn export(
        &self,
        partitions: &[Partition],
        base_label: &str,
        progress: Option<&dyn Fn(&ExportSummary)>,
    ) -> Result<ExportSummary> {
        let mut summary = ExportSummary::new();

        for partition in partitions {
            self.shutdown.check_shutdown()?;

            let url = self.endpoints.csv_export(&partition.jql);
            let raw = self.web.fetch_csv(&url)?;

            let outcome = self.rewriter.rewrite(&raw, base_label)?;

            for error in &outcome.cell_errors {
                self.formatter
                    .error(&format!("Error while fetching attachment: {}", error));
            }

            let name = self.writer.write(
                &outcome.headers,
                &outcome.rows,
                base_label,
                partition.sequence,
            )?;

            self.formatter.success(&format!(
                "Finished downloading CSV file {} and {} corresponding attachments",
                name, outcome.attachments_fetched
            ));

            summary.record(
                ArtifactInfo {
                    name,
                    sequence: partition.sequence,
                    jql: partition.jql.clone(),
                    rows: outcome.rows.len(),
                    attachments: outcome.attachments_fetched,
                },
                outcome.cell_errors,
            );

            if let Some(callback) = progress {
                callback(&summary);
            }
        }

        Ok(summary)
    }
}
