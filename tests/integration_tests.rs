use atdsrs::engine::AtdsEngine;
use atdsrs::import::ImportManager;
use atdsrs::models::{AthleteProfile, BreathPhase, FilterMode, Gender, Sport};
use atdsrs::session::Session;
use atdsrs::{batch, export, import, physio};

use std::sync::mpsc;
use std::thread;
use tempfile::tempdir;

/// Integration tests that cover the complete recording-to-report workflows

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// A breathing-modulated RR series: `cycle` beats per breath around
    /// `base` +/- `swing` ms.
    fn breathing_series(n: usize, base: f64, swing: f64, cycle: f64) -> Vec<u16> {
        (0..n)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * i as f64 / cycle;
                (base + swing * phase.sin()).round() as u16
            })
            .collect()
    }

    fn test_profile() -> AthleteProfile {
        let mut profile = AthleteProfile::default();
        profile.age = 45;
        profile.gender = Gender::Female;
        profile.weight = 62;
        profile.sport = Some(Sport::Jogging);
        profile
    }

    /// Test a plain text recording flowing through import into the batch
    /// analyzer and out as a summary CSV
    #[test]
    fn test_text_recording_to_batch_csv() {
        let dir = tempdir().unwrap();
        let series = breathing_series(60, 800.0, 40.0, 20.0);

        let recording = dir.path().join("morning.txt");
        let body: String = series.iter().map(|rr| format!("{rr}\n")).collect();
        std::fs::write(&recording, body).unwrap();

        let manager = ImportManager::new();
        let imported = manager.import_file(&recording).unwrap();
        assert_eq!(imported, series);

        let summary = batch::analyze(&imported).unwrap();
        assert_eq!(summary.avg_heart_rate, 75);
        assert_eq!(summary.breath_rate, 4);
        assert_eq!(summary.smoothed.len(), series.len());

        let out = dir.path().join("summary.csv");
        export::csv::export_batch_summaries(&[("morning.txt".to_string(), summary)], &out)
            .unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "file,samples,avg_heart_rate,ti_te,breath_rate,hrv_amplitude"
        );
        assert!(lines.next().unwrap().starts_with("morning.txt,60,75,"));
    }

    /// Test that a directory of mixed recordings imports every supported
    /// file and skips the rest
    #[test]
    fn test_directory_import_collects_supported_files() {
        let dir = tempdir().unwrap();
        let series = breathing_series(30, 800.0, 40.0, 20.0);

        let body: String = series.iter().map(|rr| format!("{rr}\n")).collect();
        std::fs::write(dir.path().join("a.txt"), &body).unwrap();
        std::fs::write(dir.path().join("b.csv"), &body).unwrap();
        std::fs::write(dir.path().join("notes.bin"), b"not a recording").unwrap();

        let manager = ImportManager::new();
        let results = manager.import_directory(dir.path()).unwrap();

        assert_eq!(results.len(), 2);
        // Results come back sorted by path
        assert!(results[0].0.ends_with("a.txt"));
        assert!(results[1].0.ends_with("b.csv"));
        assert!(results.iter().all(|(_, rr)| rr == &series));
    }

    /// Test the session lifecycle: load, profile, manual threshold, crop,
    /// save as .atds and reload through the import layer
    #[test]
    fn test_session_round_trip_through_atds_file() {
        let dir = tempdir().unwrap();
        let series = breathing_series(40, 800.0, 40.0, 20.0);

        let mut session = Session::new();
        session.set_profile(test_profile());
        session.load_data(&series);
        session.set_manual_at(150);
        session.crop(5, 34);
        assert_eq!(session.working().len(), 30);
        assert_eq!(session.raw().len(), 40);

        let path = dir.path().join("workout.atds");
        export::json::export_session(&session, &path).unwrap();

        // The generic import path sees only the RR series
        let manager = ImportManager::new();
        let rr = manager.import_file(&path).unwrap();
        assert_eq!(rr, session.working());

        // The session loader restores profile and threshold state
        let file = import::atds::load_session(&path).unwrap();
        let mut restored = Session::from_file(file);
        assert_eq!(restored.profile.age, 45);
        assert_eq!(restored.profile.gender, Gender::Female);
        assert_eq!(restored.at(), Some(150));
        assert_eq!(restored.working(), session.working());

        // Dropping the override falls back to the age-based estimate:
        // round((220 - 45) * 0.85) = 149
        assert_eq!(restored.reset_at(), Some(149));
    }

    /// Test a captured device transport log replayed through the live
    /// engine over a channel, exactly as the stream command wires it
    #[test]
    fn test_device_log_replay_over_channel() {
        let dir = tempdir().unwrap();
        let series = breathing_series(200, 800.0, 40.0, 20.0);

        let log = dir.path().join("capture.log");
        let mut body = String::from("BM-CS5R\nFW V1_5 ready\n");
        for rr in &series {
            body.push_str(&format!("{rr};\n"));
        }
        std::fs::write(&log, body).unwrap();

        let samples = import::stream::read_replay(&log).unwrap();
        assert_eq!(samples, series);

        let (tx, rx) = mpsc::channel::<u16>();
        let feeder = thread::spawn(move || {
            for rr in samples {
                if tx.send(rr).is_err() {
                    break;
                }
            }
        });

        let mut engine = AtdsEngine::new(Sport::None, FilterMode::Rest);
        let mut outputs = Vec::new();
        for rr in rx {
            if let Some(out) = engine.process(rr) {
                outputs.push(out);
            }
        }
        feeder.join().unwrap();

        // The smoother tolerates the 40 ms breathing swing, so every
        // sample makes it through
        assert_eq!(outputs.len(), series.len());
        assert!(outputs.iter().all(|o| o.waveform <= 999));

        // Ten breath cycles leave committed phases and an amplitude
        assert!(outputs.iter().any(|o| o.phase == BreathPhase::Inhale));
        assert!(outputs.iter().any(|o| o.phase == BreathPhase::Exhale));
        assert!(outputs.iter().any(|o| o.hrv_amplitude.is_some()));
        assert!(outputs.iter().any(|o| o.ti_te.is_some()));

        // Replaying the same file directly gives the identical series
        let mut direct = AtdsEngine::new(Sport::None, FilterMode::Rest);
        let again: Vec<_> = series.iter().filter_map(|&rr| direct.process(rr)).collect();
        assert_eq!(outputs, again);
    }

    /// Test that an externally supplied threshold classifies a descent into
    /// the endurance ladder without waiting for the automatic anchor
    #[test]
    fn test_external_threshold_drives_zones() {
        let mut engine = AtdsEngine::new(Sport::None, FilterMode::Exercise);
        engine.set_external_at(Some(168)); // end1 boundary at 515 ms
        assert_eq!(engine.at(), Some(168));

        // Work below the boundary long enough for the period average to
        // catch up; the zone must reach the endurance ladder
        let mut last = None;
        for _ in 0..300 {
            if let Some(out) = engine.process(450) {
                last = Some(out);
            }
        }
        let last = last.unwrap();
        assert!(last.zone.is_endurance());
        assert_eq!(last.at, Some(168));
    }

    /// Test the exported live series round-tripping as a plain RR text file
    #[test]
    fn test_exported_series_reimports() {
        let dir = tempdir().unwrap();
        let series = breathing_series(50, 800.0, 40.0, 20.0);

        let mut engine = AtdsEngine::new(Sport::None, FilterMode::Rest);
        let outputs: Vec<_> = series.iter().filter_map(|&rr| engine.process(rr)).collect();
        assert!(!outputs.is_empty());

        let path = dir.path().join("filtered.txt");
        let filtered: Vec<u16> = outputs.iter().map(|o| o.filtered_ms).collect();
        export::text::export_rr_series(&filtered, &path).unwrap();

        let manager = ImportManager::new();
        assert!(manager.can_import_file(&path));
        assert_eq!(manager.import_file(&path).unwrap(), filtered);
    }

    /// Test the physiological report produced from an imported recording
    #[test]
    fn test_recording_to_health_report() {
        let series = breathing_series(60, 800.0, 40.0, 20.0);
        let summary = batch::analyze(&series).unwrap();

        // The slowest beat is 840 ms: 60000 / 840 = 71.43 bpm resting
        let resting = physio::resting_hr_from_series(&series).unwrap();
        assert!((resting - 71.428571).abs() < 1e-4);

        // 15.3 * 190 / 71.43 rounds to 40.7, Fair for a 30 year old male
        let vo2 = physio::estimate_vo2max(30, Gender::Male, resting).unwrap();
        assert_eq!(vo2, 40.7);
        let class = physio::classify_vo2max(vo2, 30, Gender::Male);
        assert_eq!(class, physio::FitnessClass::Fair);

        let report = export::text::render_report(&summary, Some((vo2, class)));
        assert!(report.starts_with("ATDS Health Report Summary"));
        assert!(report.contains("Avg Heart Rate: 75 BPM"));
        assert!(report.contains("VO2 Max Est: 40.7 (Fair)"));
    }
}
