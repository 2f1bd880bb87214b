use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::error::{ImportError, Result};
use crate::import::{ImportFormat, FILE_RR_MAX_MS};
use crate::session::SessionFile;

/// Importer for `.atds` session containers: JSON with the recording under
/// `rrData` plus the athlete profile and threshold state.
pub struct AtdsImporter;

impl AtdsImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AtdsImporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the file content starts with a JSON object, regardless of its
/// extension. Exports from other tools often arrive without `.atds`.
fn looks_like_json(file_path: &Path) -> bool {
    let mut head = [0u8; 64];
    let Ok(mut file) = fs::File::open(file_path) else {
        return false;
    };
    let Ok(n) = file.read(&mut head) else {
        return false;
    };
    String::from_utf8_lossy(&head[..n])
        .trim_start()
        .starts_with('{')
}

/// Parse a session container from disk, validating the recording.
pub fn load_session(file_path: &Path) -> Result<SessionFile> {
    let content = fs::read_to_string(file_path)?;
    let session: SessionFile =
        serde_json::from_str(&content).map_err(|e| ImportError::ParseError {
            format: "atds".to_string(),
            reason: e.to_string(),
        })?;

    if session.rr_data.is_empty() {
        return Err(ImportError::NoValidSamples {
            path: file_path.to_path_buf(),
        }
        .into());
    }
    if session
        .rr_data
        .iter()
        .any(|&rr| rr == 0 || rr >= FILE_RR_MAX_MS)
    {
        return Err(ImportError::InvalidStructure {
            reason: "rrData contains intervals outside (0, 5000) ms".to_string(),
        }
        .into());
    }

    Ok(session)
}

impl ImportFormat for AtdsImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        let by_extension = matches!(
            file_path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_lowercase())
                .as_deref(),
            Some("atds") | Some("json")
        );
        by_extension || (file_path.is_file() && looks_like_json(file_path))
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<u16>> {
        let session = load_session(file_path)?;
        info!(
            file = %file_path.display(),
            samples = session.rr_data.len(),
            manual_at = ?session.analysis.manual_at,
            "session container imported"
        );
        Ok(session.rr_data)
    }

    fn format_name(&self) -> &'static str {
        "atds"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_file(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.atds");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_full_container_round_trip() {
        let (_dir, path) = write_file(
            r#"{
                "profile": {"age": 45, "gender": "female"},
                "analysis": {"manualAT": 140, "autoAT": 149},
                "rrData": [800, 810, 820]
            }"#,
        );

        let session = load_session(&path).unwrap();
        assert_eq!(session.rr_data, vec![800, 810, 820]);
        assert_eq!(session.profile.age, 45);
        assert_eq!(session.analysis.manual_at, Some(140));
    }

    #[test]
    fn test_missing_rr_data_errors() {
        let (_dir, path) = write_file(r#"{"profile": {"age": 45}}"#);
        assert!(load_session(&path).is_err());
    }

    #[test]
    fn test_empty_rr_data_errors() {
        let (_dir, path) = write_file(r#"{"rrData": []}"#);
        assert!(load_session(&path).is_err());
    }

    #[test]
    fn test_out_of_range_intervals_error() {
        let (_dir, path) = write_file(r#"{"rrData": [800, 0, 810]}"#);
        assert!(load_session(&path).is_err());

        let (_dir, path) = write_file(r#"{"rrData": [800, 5000]}"#);
        assert!(load_session(&path).is_err());
    }

    #[test]
    fn test_sniffs_json_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noext");
        std::fs::write(&path, r#"  {"rrData": [700]}"#).unwrap();
        assert!(AtdsImporter::new().can_import(&path));

        let text = dir.path().join("plain");
        std::fs::write(&text, "800 810").unwrap();
        assert!(!AtdsImporter::new().can_import(&text));
    }
}
