use crate::error::Result;
use chrono::{Local, NaiveDateTime};
use csv::{QuoteStyle, WriterBuilder};
use std::fs;
use std::path::Path;

/// Deterministic artifact name: label, 1-based partition sequence, capture
/// timestamp to the second, all lowercased.
pub fn artifact_name(base_label: &str, sequence: usize, timestamp: &NaiveDateTime) -> String {
    format!(
        "{}_part-{}_{}.csv",
        base_label,
        sequence,
        timestamp.format("%Y%m%d_%H%M%S")
    )
    .to_lowercase()
}

/// Serializes rewritten rows into one CSV artifact per partition.
pub struct ExportWriter<'a> {
    output_root: &'a Path,
}

impl<'a> ExportWriter<'a> {
    pub fn new(output_root: &'a Path) -> Self {
        Self { output_root }
    }

    pub fn output_root(&self) -> &Path {
        self.output_root
    }

    pub fn write(
        &self,
        headers: &[String],
        rows: &[Vec<String>],
        base_label: &str,
        sequence: usize,
    ) -> Result<String> {
        self.write_at(
            headers,
            rows,
            base_label,
            sequence,
            Local::now().naive_local(),
        )
    }

    /// Like `write`, with the capture timestamp supplied by the caller.
    pub fn write_at(
        &self,
        headers: &[String],
        rows: &[Vec<String>],
        base_label: &str,
        sequence: usize,
        timestamp: NaiveDateTime,
    ) -> Result<String> {
        fs::create_dir_all(self.output_root)?;

        let name = artifact_name(base_label, sequence, &timestamp);
        let path = self.output_root.join(&name);

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .from_path(&path)?;

        writer.write_record(headers)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn fixed_timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    #[test]
    fn test_artifact_name_format() {
        let name = artifact_name("ABC", 2, &fixed_timestamp());
        assert_eq!(name, "abc_part-2_20240102_030405.csv");
    }

    #[test]
    fn test_artifact_name_lowercases_label() {
        let name = artifact_name("CuStOm", 11, &fixed_timestamp());
        assert!(name.starts_with("custom_part-11_"));
    }

    #[test]
    fn test_write_produces_header_first_minimal_quoting() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ExportWriter::new(temp_dir.path());

        let headers = vec!["Summary".to_string(), "Assignee".to_string()];
        let rows = vec![
            vec!["plain".to_string(), "bob".to_string()],
            vec!["needs, quoting".to_string(), "carol".to_string()],
        ];

        let name = writer
            .write_at(&headers, &rows, "ABC", 1, fixed_timestamp())
            .unwrap();

        let content = std::fs::read_to_string(temp_dir.path().join(&name)).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "Summary,Assignee");
        assert_eq!(lines[1], "plain,bob");
        assert_eq!(lines[2], "\"needs, quoting\",carol");
    }

    #[test]
    fn test_write_creates_output_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested_root = temp_dir.path().join("exports/run-1");
        let writer = ExportWriter::new(&nested_root);

        let headers = vec!["Summary".to_string()];
        let name = writer
            .write_at(&headers, &[], "ABC", 1, fixed_timestamp())
            .unwrap();

        assert!(nested_root.join(name).exists());
    }

    #[test]
    fn test_write_preserves_row_order() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ExportWriter::new(temp_dir.path());

        let headers = vec!["Key".to_string()];
        let rows: Vec<Vec<String>> = (1..=5).map(|i| vec![format!("ABC-{}", i)]).collect();

        let name = writer
            .write_at(&headers, &rows, "abc", 3, fixed_timestamp())
            .unwrap();

        let content = std::fs::read_to_string(temp_dir.path().join(&name)).unwrap();
        let keys: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(keys, vec!["ABC-1", "ABC-2", "ABC-3", "ABC-4", "ABC-5"]);
    }
}
