use crate::config::Config;
use crate::error::{ExportError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub sequence: usize,
    pub jql: String,
    pub rows: usize,
    pub attachments: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub max_issues: usize,
    pub nested_columns: Vec<String>,
    pub destination_base_url: String,
    pub user_renames: usize,
}

impl ConfigSnapshot {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_issues: config.tracker.max_issues,
            nested_columns: config.tracker.nested_columns.clone(),
            destination_base_url: config.export.destination_base_url.clone(),
            user_renames: config.mapping.users.len(),
        }
    }
}

/// Machine-readable record of one export run, written next to the
/// artifacts it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub tracker_url: String,
    pub base_label: String,
    pub query: String,
    pub exported_at: DateTime<Utc>,
    pub artifacts: Vec<ArtifactInfo>,
    pub total_rows: usize,
    pub total_attachments: usize,
    pub cell_errors: Vec<String>,
    pub config_used: ConfigSnapshot,
}

impl ExportReport {
    pub fn save_json(&self, output_root: &Path) -> Result<PathBuf> {
        let path = output_root.join("export_report.json");

        let json = serde_json::to_string_pretty(self).map_err(|e| ExportError::Config {
            message: format!("Failed to serialize report to JSON: {}", e),
        })?;

        fs::write(&path, json)?;

        Ok(path)
    }
}
