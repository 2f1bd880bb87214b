//! Time-domain HRV statistics over a recorded RR series.
//!
//! These are the standard descriptive metrics (SDNN, RMSSD, pNN50 and the
//! Poincare axes) computed over an already-validated slice. They complement
//! the breath-oriented batch analysis rather than feeding the live engine.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Histogram bin width for RR distribution, ms.
const HISTOGRAM_BIN_MS: u16 = 50;

/// Successive-difference threshold for pNN50, ms.
const PNN_THRESHOLD_MS: f64 = 50.0;

/// Time-domain HRV summary of an RR series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrvStatistics {
    /// Number of intervals the statistics cover
    pub sample_count: usize,
    /// Mean RR interval, ms
    pub mean_rr_ms: f64,
    /// Mean heart rate, beats/min
    pub mean_heart_rate: f64,
    /// Standard deviation of all intervals, ms
    pub sdnn_ms: f64,
    /// Root mean square of successive differences, ms
    pub rmssd_ms: f64,
    /// Share of successive differences above 50 ms, percent
    pub pnn50_pct: f64,
    /// Poincare short-axis deviation, ms
    pub sd1_ms: f64,
    /// Poincare long-axis deviation, ms
    pub sd2_ms: f64,
    /// RR distribution in 50 ms bins
    pub histogram: Vec<HistogramBin>,
}

/// One bin of the RR interval distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower edge of the bin, ms
    pub lower_ms: u16,
    pub count: u32,
}

/// Compute time-domain HRV statistics. Returns `None` for series shorter
/// than two intervals, which have no successive differences to work with.
pub fn hrv_statistics(rr_intervals: &[u16]) -> Option<HrvStatistics> {
    if rr_intervals.len() < 2 {
        return None;
    }

    let series: Vec<f64> = rr_intervals.iter().map(|&rr| f64::from(rr)).collect();
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let mean_rr = series.iter().mean();
    let sdnn = series.iter().std_dev();

    let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt();
    let over_threshold = diffs
        .iter()
        .filter(|d| d.abs() > PNN_THRESHOLD_MS)
        .count();
    let pnn50 = 100.0 * over_threshold as f64 / diffs.len() as f64;

    // SD1^2 = var(diff) / 2, SD2^2 = 2 * SDNN^2 - SD1^2
    let sd1 = (diffs.iter().variance() / 2.0).sqrt();
    let sd2 = (2.0 * sdnn * sdnn - sd1 * sd1).max(0.0).sqrt();

    Some(HrvStatistics {
        sample_count: rr_intervals.len(),
        mean_rr_ms: mean_rr,
        mean_heart_rate: 60_000.0 / mean_rr,
        sdnn_ms: sdnn,
        rmssd_ms: rmssd,
        pnn50_pct: pnn50,
        sd1_ms: sd1,
        sd2_ms: sd2,
        histogram: histogram(rr_intervals),
    })
}

fn histogram(rr_intervals: &[u16]) -> Vec<HistogramBin> {
    let mut bins: std::collections::BTreeMap<u16, u32> = std::collections::BTreeMap::new();
    for &rr in rr_intervals {
        let lower = (rr / HISTOGRAM_BIN_MS) * HISTOGRAM_BIN_MS;
        *bins.entry(lower).or_insert(0) += 1;
    }
    bins.into_iter()
        .map(|(lower_ms, count)| HistogramBin { lower_ms, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short_returns_none() {
        assert_eq!(hrv_statistics(&[]), None);
        assert_eq!(hrv_statistics(&[800]), None);
    }

    #[test]
    fn test_constant_series() {
        let stats = hrv_statistics(&[800; 10]).unwrap();
        assert_eq!(stats.sample_count, 10);
        assert_eq!(stats.mean_rr_ms, 800.0);
        assert_eq!(stats.mean_heart_rate, 75.0);
        assert_eq!(stats.sdnn_ms, 0.0);
        assert_eq!(stats.rmssd_ms, 0.0);
        assert_eq!(stats.pnn50_pct, 0.0);
        assert_eq!(stats.sd1_ms, 0.0);
        assert_eq!(stats.sd2_ms, 0.0);
        assert_eq!(
            stats.histogram,
            vec![HistogramBin {
                lower_ms: 800,
                count: 10
            }]
        );
    }

    #[test]
    fn test_alternating_series() {
        // Successive differences are all +/-60 ms
        let series = [800u16, 860, 800, 860, 800, 860, 800, 860, 800, 860];
        let stats = hrv_statistics(&series).unwrap();

        assert_eq!(stats.mean_rr_ms, 830.0);
        assert!((stats.rmssd_ms - 60.0).abs() < 1e-9);
        assert_eq!(stats.pnn50_pct, 100.0);
    }

    #[test]
    fn test_pnn50_needs_strictly_more_than_50ms() {
        // Differences of exactly 50 ms do not count
        let series = [800u16, 850, 800, 850, 800, 850];
        let stats = hrv_statistics(&series).unwrap();
        assert_eq!(stats.pnn50_pct, 0.0);
        assert!((stats.rmssd_ms - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_bins() {
        let stats = hrv_statistics(&[740, 760, 800, 849, 850]).unwrap();
        assert_eq!(
            stats.histogram,
            vec![
                HistogramBin {
                    lower_ms: 700,
                    count: 1
                },
                HistogramBin {
                    lower_ms: 750,
                    count: 1
                },
                HistogramBin {
                    lower_ms: 800,
                    count: 2
                },
                HistogramBin {
                    lower_ms: 850,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_poincare_axes_relate_to_sdnn() {
        // A trend-dominated series: the overall spread dwarfs the successive
        // differences, so the long axis stays real
        let series = [760u16, 785, 770, 810, 820, 850, 840, 880];
        let stats = hrv_statistics(&series).unwrap();

        // SD2^2 = 2 * SDNN^2 - SD1^2 whenever the right side is nonnegative
        let lhs = stats.sd2_ms * stats.sd2_ms;
        let rhs = 2.0 * stats.sdnn_ms * stats.sdnn_ms - stats.sd1_ms * stats.sd1_ms;
        assert!((lhs - rhs).abs() < 1e-9);
        assert!(stats.sd1_ms > 0.0);
        assert!(stats.sd2_ms > stats.sd1_ms);
    }
}
