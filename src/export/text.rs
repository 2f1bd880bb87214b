use std::io::Write;
use std::path::Path;

use crate::batch::BatchSummary;
use crate::error::Result;
use crate::physio::FitnessClass;

/// Render the summary report block shared by the terminal output and the
/// text export.
pub fn render_report(summary: &BatchSummary, vo2: Option<(f64, FitnessClass)>) -> String {
    let vo2_line = match vo2 {
        Some((value, class)) => format!("{:.1} ({})", value, class),
        None => "--".to_string(),
    };

    format!(
        "ATDS Health Report Summary\n\
         --------------------------\n\
         Avg Heart Rate: {} BPM\n\
         Ti/Te Ratio: {:.2}\n\
         Breath Rate: {} breaths/min\n\
         HRV Amplitude: {} ms\n\
         VO2 Max Est: {}\n",
        summary.avg_heart_rate, summary.ti_te, summary.breath_rate, summary.hrv_amplitude, vo2_line,
    )
}

/// Export the summary report to a text file
pub fn export_report<P: AsRef<Path>>(
    summary: &BatchSummary,
    vo2: Option<(f64, FitnessClass)>,
    output_path: P,
) -> Result<()> {
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(render_report(summary, vo2).as_bytes())?;
    Ok(())
}

/// Export a plain RR interval list, one value per line
pub fn export_rr_series<P: AsRef<Path>>(rr_intervals: &[u16], output_path: P) -> Result<()> {
    let mut file = std::fs::File::create(output_path)?;
    for rr in rr_intervals {
        writeln!(file, "{}", rr)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch;
    use tempfile::NamedTempFile;

    #[test]
    fn test_report_block_format() {
        let summary = batch::analyze(&[800; 12]).unwrap();
        let report = render_report(&summary, Some((48.5, FitnessClass::Good)));

        let expected = "ATDS Health Report Summary\n\
                        --------------------------\n\
                        Avg Heart Rate: 75 BPM\n\
                        Ti/Te Ratio: 1.00\n\
                        Breath Rate: 0 breaths/min\n\
                        HRV Amplitude: 0 ms\n\
                        VO2 Max Est: 48.5 (Good)\n";
        assert_eq!(report, expected);
    }

    #[test]
    fn test_report_without_vo2() {
        let summary = batch::analyze(&[800; 12]).unwrap();
        let report = render_report(&summary, None);
        assert!(report.contains("VO2 Max Est: --"));
    }

    #[test]
    fn test_rr_series_export() {
        let file = NamedTempFile::new().unwrap();
        export_rr_series(&[800, 810, 820], file.path()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, "800\n810\n820\n");
    }
}
