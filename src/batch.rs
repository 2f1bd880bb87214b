//! Stateless batch analysis of a recorded RR series.
//!
//! A pure function over a finite array: validity filter, 5-point centered
//! smoothing, then a single-pass fixed-threshold version of the phase
//! detector. None of the live engine's adaptive machinery is involved, so
//! the result depends only on the input array.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{MAX_PERIOD_MS, MIN_PERIOD_MS};

/// Minimum valid samples for a result.
const MIN_BATCH_SAMPLES: usize = 10;

/// Fixed hysteresis threshold of the batch phase detector, ms.
const BATCH_HYSTERESIS_MS: f64 = 15.0;

/// Centered smoothing window; edge samples pass through raw.
const SMOOTHING_WINDOW: usize = 5;

/// Aggregate result of a batch analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Average heart rate over the valid samples, beats/min
    pub avg_heart_rate: u16,
    /// Inhale/exhale duration ratio, rounded to 2 decimals; 1.00 when no
    /// exhale time was accumulated
    pub ti_te: f64,
    /// Detected breath cycles per minute, rounded
    pub breath_rate: u16,
    /// Mean peak-to-valley amplitude per breath cycle, ms
    pub hrv_amplitude: u16,
    /// The smoothed series the phase detection ran on
    pub smoothed: Vec<f64>,
}

/// Analyze a finite RR series. Returns `None` when fewer than 10 samples
/// survive the validity filter.
pub fn analyze(rr_intervals: &[u16]) -> Option<BatchSummary> {
    let clean: Vec<u16> = rr_intervals
        .iter()
        .copied()
        .filter(|&rr| (MIN_PERIOD_MS..=MAX_PERIOD_MS).contains(&rr))
        .collect();
    if clean.len() < MIN_BATCH_SAMPLES {
        debug!(
            total = rr_intervals.len(),
            valid = clean.len(),
            "batch analysis skipped, not enough valid samples"
        );
        return None;
    }

    let half = SMOOTHING_WINDOW / 2;
    let smoothed: Vec<f64> = (0..clean.len())
        .map(|i| {
            if i >= half && i < clean.len() - half {
                clean[i - half..=i + half]
                    .iter()
                    .map(|&rr| f64::from(rr))
                    .sum::<f64>()
                    / SMOOTHING_WINDOW as f64
            } else {
                f64::from(clean[i])
            }
        })
        .collect();

    let mut inhale = true;
    let mut max_inv = 0.0_f64;
    let mut min_inv = 9999.0_f64; // above any possible inverted period
    let mut ti_sum = 0.0;
    let mut te_sum = 0.0;
    let mut breath_count = 0u32;
    let mut amp_sum = 0.0;
    let mut phase_start = 0.0;
    let mut now = 0.0;

    for &rr in &smoothed {
        let inv = f64::from(MAX_PERIOD_MS) - rr;

        if inv > max_inv {
            max_inv = inv;
        }
        if inv < min_inv {
            min_inv = inv;
        }

        if inhale {
            if inv < max_inv - BATCH_HYSTERESIS_MS {
                inhale = false;
                ti_sum += now - phase_start;
                phase_start = now;
                min_inv = inv;
            }
        } else if inv > min_inv + BATCH_HYSTERESIS_MS {
            inhale = true;
            te_sum += now - phase_start;
            breath_count += 1;
            amp_sum += max_inv - min_inv;
            phase_start = now;
            max_inv = inv;
        }

        now += rr;
    }

    let total: f64 = clean.iter().map(|&rr| f64::from(rr)).sum();
    let mean_rr = total / clean.len() as f64;
    let duration_min = total / 60_000.0;

    Some(BatchSummary {
        avg_heart_rate: (60_000.0 / mean_rr).round() as u16,
        ti_te: if te_sum > 0.0 {
            round2(ti_sum / te_sum)
        } else {
            1.0
        },
        breath_rate: (f64::from(breath_count) / duration_min).round() as u16,
        hrv_amplitude: (amp_sum / f64::from(breath_count.max(1))).round() as u16,
        smoothed,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
