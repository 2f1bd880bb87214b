use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{ImportError, Result};
use crate::import::{parse_token, ImportFormat};

/// Importer for plain text recordings: RR intervals in milliseconds,
/// separated by whitespace or commas.
pub struct TextImporter;

impl TextImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextImporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract valid intervals from separated-number text. Tokens that are not
/// numbers and values outside (0, 5000) ms are dropped.
pub(crate) fn parse_intervals(content: &str) -> Vec<u16> {
    content
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .filter_map(parse_token)
        .collect()
}

impl ImportFormat for TextImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        matches!(
            file_path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_lowercase())
                .as_deref(),
            Some("txt") | Some("text")
        )
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<u16>> {
        let content = fs::read_to_string(file_path)?;
        let intervals = parse_intervals(&content);

        if intervals.is_empty() {
            return Err(ImportError::NoValidSamples {
                path: file_path.to_path_buf(),
            }
            .into());
        }

        info!(
            file = %file_path.display(),
            samples = intervals.len(),
            "text recording imported"
        );
        Ok(intervals)
    }

    fn format_name(&self) -> &'static str {
        "text"
    }
}
