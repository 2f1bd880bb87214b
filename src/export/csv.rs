use std::io::Write;
use std::path::Path;

use crate::batch::BatchSummary;
use crate::error::Result;
use crate::models::SampleOutput;

/// Export a live engine series to CSV, one row per processed sample.
pub fn export_sample_series<P: AsRef<Path>>(
    samples: &[SampleOutput],
    output_path: P,
) -> Result<()> {
    let mut file = std::fs::File::create(output_path)?;

    writeln!(
        file,
        "index,rr_ms,filtered_ms,timebase_ms,waveform,phase,breath_rate,hrv_amplitude,ti_te,heart_rate,zone,zone_progress,at"
    )?;

    for (index, sample) in samples.iter().enumerate() {
        writeln!(
            file,
            "{},{},{},{},{},{:?},{:.3},{},{},{},{},{},{}",
            index,
            sample.rr_ms,
            sample.filtered_ms,
            sample.timebase_ms,
            sample.waveform,
            sample.phase,
            sample.breath_rate,
            sample
                .hrv_amplitude
                .map_or(String::new(), |v| format!("{:.1}", v)),
            sample
                .ti_te
                .map_or(String::new(), |v| format!("{:.2}", v)),
            sample.heart_rate,
            sample.zone.code(),
            sample.zone_progress,
            sample.at.map_or(String::new(), |v| v.to_string()),
        )?;
    }

    Ok(())
}

/// Export batch summaries to CSV, one row per analyzed recording.
pub fn export_batch_summaries<P: AsRef<Path>>(
    rows: &[(String, BatchSummary)],
    output_path: P,
) -> Result<()> {
    let mut file = std::fs::File::create(output_path)?;

    writeln!(
        file,
        "file,samples,avg_heart_rate,ti_te,breath_rate,hrv_amplitude"
    )?;

    for (name, summary) in rows {
        writeln!(
            file,
            "{},{},{},{:.2},{},{}",
            name,
            summary.smoothed.len(),
            summary.avg_heart_rate,
            summary.ti_te,
            summary.breath_rate,
            summary.hrv_amplitude,
        )?;
    }

    Ok(())
}
