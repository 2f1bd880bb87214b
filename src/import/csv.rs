use csv::{ReaderBuilder, Trim};
use std::path::Path;
use tracing::info;

use crate::error::{ImportError, Result};
use crate::import::{parse_token, ImportFormat};

/// Header names recognized as the RR interval column.
const RR_COLUMN_NAMES: [&str; 6] = ["rr", "rr_ms", "rri", "rr_interval", "interval", "ibi"];

/// Importer for CSV recordings. When a header names an RR column that
/// column is used, otherwise the first numeric field of each record wins.
pub struct CsvImporter;

impl CsvImporter {
    pub fn new() -> Self {
        Self
    }

    fn normalize_column_name(name: &str) -> String {
        name.to_lowercase().replace([' ', '-'], "_")
    }
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for CsvImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        matches!(
            file_path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_lowercase())
                .as_deref(),
            Some("csv")
        )
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<u16>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_path(file_path)?;

        let mut intervals = Vec::new();
        let mut rr_column: Option<usize> = None;

        for (row, record) in reader.records().enumerate() {
            let record = record?;

            if row == 0 {
                rr_column = record.iter().position(|field| {
                    RR_COLUMN_NAMES.contains(&Self::normalize_column_name(field).as_str())
                });
                if rr_column.is_some() {
                    continue;
                }
            }

            let value = match rr_column {
                Some(idx) => record.get(idx).and_then(parse_token),
                None => record.iter().find_map(parse_token),
            };
            if let Some(rr) = value {
                intervals.push(rr);
            }
        }

        if intervals.is_empty() {
            return Err(ImportError::NoValidSamples {
                path: file_path.to_path_buf(),
            }
            .into());
        }

        info!(
            file = %file_path.display(),
            samples = intervals.len(),
            named_column = rr_column.is_some(),
            "csv recording imported"
        );
        Ok(intervals)
    }

    fn format_name(&self) -> &'static str {
        "csv"
    }
}
