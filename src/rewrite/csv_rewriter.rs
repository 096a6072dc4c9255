use crate::error::{ExportError, Result};
use crate::rewrite::attachments::AttachmentFetcher;
use crate::rewrite::user_map::UserMapping;
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};

/// Header of the column whose nested records reference attachment files.
pub const ATTACHMENT_COLUMN: &str = "Attachment";

/// Nested attachment records carry at least date, author, filename, URL.
const ATTACHMENT_MIN_FIELDS: usize = 4;
const ATTACHMENT_URL_FIELD: usize = 3;

#[derive(Debug, Default)]
pub struct RewriteOutcome {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub attachments_fetched: usize,
    /// One entry per nested cell that could not be rewritten; the cell keeps
    /// its previous content.
    pub cell_errors: Vec<String>,
}

/// Transforms one raw CSV export: user references are remapped across the
/// whole text, then nested cells are parsed, attachment links re-pointed,
/// and the cells re-serialized in place.
pub struct CsvRewriter<'a> {
    fetcher: &'a AttachmentFetcher<'a>,
    mapping: &'a UserMapping,
    nested_columns: &'a [String],
}

impl<'a> CsvRewriter<'a> {
    pub fn new(
        fetcher: &'a AttachmentFetcher<'a>,
        mapping: &'a UserMapping,
        nested_columns: &'a [String],
    ) -> Self {
        Self {
            fetcher,
            mapping,
            nested_columns,
        }
    }

    /// Rewrites the export. The returned row count always equals the input
    /// data-row count and the header row passes through untouched; failures
    /// inside a single nested cell are recorded and skipped.
    pub fn rewrite(&self, raw: &[u8], project_label: &str) -> Result<RewriteOutcome> {
        let text = String::from_utf8(raw.to_vec())?;
        let text = self.mapping.apply(&text);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = reader.records();

        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => return Ok(RewriteOutcome::default()),
        };

        // The export repeats multi-valued headers, so one name can map to
        // several column indices.
        let nested_indices: Vec<(usize, bool)> = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| self.nested_columns.iter().any(|name| name == *header))
            .map(|(index, header)| (index, header == ATTACHMENT_COLUMN))
            .collect();

        let mut outcome = RewriteOutcome {
            headers,
            ..Default::default()
        };

        for record in records {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();

            for &(index, is_attachment) in &nested_indices {
                let cell = match row.get(index) {
                    Some(cell) if !cell.trim().is_empty() => cell.clone(),
                    _ => continue,
                };

                match self.rewrite_cell(&cell, is_attachment, project_label) {
                    Ok((rewritten, fetched)) => {
                        outcome.attachments_fetched += fetched;
                        row[index] = rewritten;
                    }
                    Err(error) => {
                        outcome
                            .cell_errors
                            .push(format!("Failed to rewrite cell '{}': {}", cell, error));
                    }
                }
            }

            outcome.rows.push(row);
        }

        Ok(outcome)
    }

    /// Rewrites one nested cell: parse its first semicolon-delimited record,
    /// re-point the attachment URL if this is an attachment column, then
    /// re-serialize with minimal quoting.
    fn rewrite_cell(
        &self,
        cell: &str,
        is_attachment: bool,
        project_label: &str,
    ) -> Result<(String, usize)> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(cell.as_bytes());

        let first = match reader.records().next() {
            Some(record) => record?,
            None => {
                return Err(ExportError::CsvParse {
                    message: "nested cell holds no record".to_string(),
                })
            }
        };

        let mut fields: Vec<String> = first.iter().map(str::to_string).collect();
        let mut fetched = 0;

        if is_attachment {
            if fields.len() < ATTACHMENT_MIN_FIELDS {
                return Err(ExportError::CsvParse {
                    message: format!(
                        "attachment record has {} fields, expected at least {}",
                        fields.len(),
                        ATTACHMENT_MIN_FIELDS
                    ),
                });
            }

            let public_url = self
                .fetcher
                .fetch_and_store(&fields[ATTACHMENT_URL_FIELD], project_label)?;
            fields[ATTACHMENT_URL_FIELD] = public_url;
            fetched = 1;
        }

        let mut writer = WriterBuilder::new()
            .delimiter(b';')
            .quote_style(QuoteStyle::Necessary)
            .from_writer(Vec::new());
        writer.write_record(&fields)?;

        let bytes = writer.into_inner().map_err(|e| ExportError::CsvParse {
            message: e.error().to_string(),
        })?;
        let serialized = String::from_utf8(bytes)?;

        Ok((serialized.trim_end().to_string(), fetched))
    }
}
