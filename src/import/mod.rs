use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ImportError, Result};

pub mod atds;
pub mod csv;
pub mod stream;
pub mod text;

/// Upper bound for intervals read from files, ms (exclusive). The device
/// transport uses a tighter bound, see [`stream`].
pub(crate) const FILE_RR_MAX_MS: u16 = 5000;

/// Parse one token as a file-sourced RR interval. Fractional values are
/// rounded, anything outside (0, 5000) ms is rejected.
pub(crate) fn parse_token(token: &str) -> Option<u16> {
    let n = token.parse::<f64>().ok()?;
    if !n.is_finite() {
        return None;
    }
    let rounded = n.round();
    if rounded > 0.0 && rounded < f64::from(FILE_RR_MAX_MS) {
        Some(rounded as u16)
    } else {
        None
    }
}

/// Trait for importing RR recordings from different file formats
pub trait ImportFormat: Send + Sync {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Import RR intervals from the file
    fn import_file(&self, file_path: &Path) -> Result<Vec<u16>>;

    /// Get the format name for this importer
    fn format_name(&self) -> &'static str;
}

/// Manager for coordinating different import formats
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat>>,
}

impl ImportManager {
    /// Create a new import manager with all available importers
    pub fn new() -> Self {
        let importers: Vec<Box<dyn ImportFormat>> = vec![
            Box::new(atds::AtdsImporter::new()),
            Box::new(csv::CsvImporter::new()),
            Box::new(text::TextImporter::new()),
        ];

        Self { importers }
    }

    /// Import a single file, auto-detecting the format. Files no importer
    /// claims are tried as plain text, matching how recordings from unknown
    /// apps usually arrive.
    pub fn import_file(&self, file_path: &Path) -> Result<Vec<u16>> {
        if !file_path.is_file() {
            return Err(ImportError::FileNotFound {
                path: file_path.to_path_buf(),
            }
            .into());
        }

        for importer in &self.importers {
            if importer.can_import(file_path) {
                debug!(
                    file = %file_path.display(),
                    format = importer.format_name(),
                    "importing recording"
                );
                return importer.import_file(file_path);
            }
        }

        warn!(
            file = %file_path.display(),
            "unrecognized extension, trying plain text"
        );
        text::TextImporter::new().import_file(file_path)
    }

    /// Import all recognized files from a directory in parallel. Files that
    /// fail to parse are logged and skipped rather than aborting the batch.
    pub fn import_directory(&self, dir_path: &Path) -> Result<Vec<(PathBuf, Vec<u16>)>> {
        let files = self.collect_importable_files(dir_path)?;

        if files.is_empty() {
            warn!(dir = %dir_path.display(), "no importable files found");
            return Ok(Vec::new());
        }

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );

        let results: Vec<(PathBuf, Result<Vec<u16>>)> = files
            .par_iter()
            .map(|file_path| {
                pb.set_message(format!(
                    "{}",
                    file_path.file_name().unwrap_or_default().to_string_lossy()
                ));
                let result = self.import_file(file_path);
                pb.inc(1);
                (file_path.clone(), result)
            })
            .collect();

        pb.finish_with_message("Import complete");

        let mut imported = Vec::new();
        for (path, result) in results {
            match result {
                Ok(intervals) => imported.push((path, intervals)),
                Err(e) => warn!(file = %path.display(), error = %e, "import failed"),
            }
        }

        Ok(imported)
    }

    /// Collect all files that can be imported from a directory
    fn collect_importable_files(&self, dir_path: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if !dir_path.is_dir() {
            return Err(ImportError::FileNotFound {
                path: dir_path.to_path_buf(),
            }
            .into());
        }

        for entry in std::fs::read_dir(dir_path)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() {
                for importer in &self.importers {
                    if importer.can_import(&path) {
                        files.push(path);
                        break;
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Check if this manager can import a given file
    pub fn can_import_file(&self, file_path: &Path) -> bool {
        self.importers
            .iter()
            .any(|importer| importer.can_import(file_path))
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}
