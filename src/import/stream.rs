use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ImportError, Result};

/// Upper bound for intervals arriving over the device transport, ms
/// (exclusive). Serial heart rate straps never report longer beats.
const STREAM_RR_MAX_MS: u16 = 2000;

/// One parsed line of a device stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A valid RR interval
    Sample(u16),
    /// Firmware banner the strap emits on connect
    Firmware(String),
    /// Noise, partial lines or out-of-range values
    Ignored,
}

/// Parse one line of the newline-separated device protocol.
///
/// Firmware banners contain `V1_5` or start with `BM-`. Everything else is
/// read as a leading integer, valid in (0, 2000) ms.
pub fn parse_line(line: &str) -> StreamEvent {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return StreamEvent::Ignored;
    }
    if trimmed.contains("V1_5") || trimmed.starts_with("BM-") {
        return StreamEvent::Firmware(trimmed.to_string());
    }

    let digits: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u16>() {
        Ok(rr) if rr > 0 && rr < STREAM_RR_MAX_MS => StreamEvent::Sample(rr),
        _ => StreamEvent::Ignored,
    }
}

/// Read a recorded device stream for replay, keeping valid samples in order.
pub fn read_replay(file_path: &Path) -> Result<Vec<u16>> {
    let content = fs::read_to_string(file_path)?;
    let mut samples = Vec::new();

    for line in content.lines() {
        match parse_line(line) {
            StreamEvent::Sample(rr) => samples.push(rr),
            StreamEvent::Firmware(banner) => {
                debug!(banner = %banner, "firmware banner in replay")
            }
            StreamEvent::Ignored => {}
        }
    }

    if samples.is_empty() {
        return Err(ImportError::NoValidSamples {
            path: file_path.to_path_buf(),
        }
        .into());
    }

    info!(
        file = %file_path.display(),
        samples = samples.len(),
        "replay stream loaded"
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_samples() {
        assert_eq!(parse_line("800"), StreamEvent::Sample(800));
        assert_eq!(parse_line("  812  "), StreamEvent::Sample(812));
        // Trailing device garbage after the digits is tolerated
        assert_eq!(parse_line("795;"), StreamEvent::Sample(795));
    }

    #[test]
    fn test_parse_firmware_banners() {
        assert_eq!(
            parse_line("BM-CS5R"),
            StreamEvent::Firmware("BM-CS5R".to_string())
        );
        assert_eq!(
            parse_line("FW V1_5 ready"),
            StreamEvent::Firmware("FW V1_5 ready".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_eq!(parse_line("0"), StreamEvent::Ignored);
        assert_eq!(parse_line("2000"), StreamEvent::Ignored);
        assert_eq!(parse_line("1999"), StreamEvent::Sample(1999));
        assert_eq!(parse_line(""), StreamEvent::Ignored);
        assert_eq!(parse_line("x800"), StreamEvent::Ignored);
    }

    #[test]
    fn test_read_replay_filters_noise() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("replay.txt");
        std::fs::write(&path, "BM-CS5R\n800\n812\n\ngarbage\n2500\n795\n").unwrap();

        assert_eq!(read_replay(&path).unwrap(), vec![800, 812, 795]);
    }

    #[test]
    fn test_read_replay_requires_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "BM-CS5R\nnothing\n").unwrap();
        assert!(read_replay(&path).is_err());
    }
}
