use crate::export::ExportSummary;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(120);

/// Progress surfaces for the strictly sequential pipeline: a spinner per
/// preparatory step and one bar across the partition downloads. Quiet runs
/// get hidden bars so call sites stay unconditional.
pub struct ProgressManager {
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(TICK);
        spinner
    }

    pub fn create_partition_progress(&self, partitions: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(partitions);
        bar.set_style(
            ProgressStyle::with_template(
                "{bar:36.green/blue} part {pos}/{len} {msg} [{elapsed_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        bar.enable_steady_tick(TICK);
        bar
    }
}

pub fn update_partition_progress(bar: &ProgressBar, summary: &ExportSummary) {
    bar.set_position(summary.artifacts.len() as u64);
    bar.set_message(format!(
        "{} rows, {} attachments",
        summary.total_rows, summary.total_attachments
    ));
}

pub fn finish_progress_with_summary(bar: &ProgressBar, message: &str, duration: Duration) {
    bar.finish_with_message(format!("{} in {}", message, format_duration(duration)));
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
    fn test_quiet_runs_get_hidden_bars() {
        let manager = ProgressManager::new(false);

        assert!(manager.create_spinner("probe").is_hidden());
        assert!(manager.create_partition_progress(3).is_hidden());
    }

    #[test]
    fn test_partition_progress_tracks_summary() {
        let manager = ProgressManager::new(false);
        let bar = manager.create_partition_progress(3);

        let summary = ExportSummary::new();
        update_partition_progress(&bar, &summary);
        assert_eq!(bar.position(), 0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }
}
