//! Display waveform derived from the inverted heartbeat period.
//!
//! The inverted period is centered on a slowly recentering offset, scaled by
//! an automatic gain and shifted onto a 0..999 band around 500. The gain
//! shrinks when the wave clips the band and grows when a committed breath
//! extremum lands too close to the center, so the wave fills the band without
//! clipping for whatever amplitude the wearer is breathing at.

use crate::models::{MAX_PERIOD_MS, TYPICAL_PERIOD_MS};

/// Midpoint of the output band.
const WAVE_CENTER: f64 = 500.0;

/// Top of the output band.
const WAVE_MAX: f64 = 999.0;

/// Fixed gain applied before the automatic multiplier.
const WAVE_GAIN: f64 = 2.0;

/// Committed extrema closer to the center than this raise the multiplier.
const BOOST_LIMIT: f64 = 400.0;

/// Multiplier adjustment per sample.
const GAIN_STEP: f64 = 0.1;

/// Offset moves only when the extrema midpoint is further away than this, ms.
const RECENTER_DEADBAND_MS: f64 = 10.0;

/// Distance beyond which the offset takes the large recenter step, ms.
const RECENTER_FAR_MS: f64 = 250.0;

/// Recenter step divisor for distant midpoints.
const RECENTER_FAR_DIVISOR: f64 = 4.0;

/// Recenter step divisor for nearby midpoints; the step is at least 1 ms.
const RECENTER_NEAR_DIVISOR: f64 = 20.0;

/// Offset-and-gain stage turning inverted periods into display samples.
#[derive(Debug, Clone)]
pub struct WaveformGenerator {
    /// Center of the inverted-period band; 0 until seeded
    offset: f64,
    multiplier: f64,
}

impl WaveformGenerator {
    pub fn new() -> Self {
        Self {
            offset: 0.0,
            multiplier: 1.0,
        }
    }

    /// Move the offset toward the committed extrema midpoint. Called on every
    /// peak and valley commit.
    ///
    /// The first call seeds the offset from the sample itself, weighted 2:1
    /// against the typical heartbeat period so an extreme first breath does
    /// not pin the wave to an edge.
    pub fn recenter(&mut self, inv: i32, extrema_mid: f64) {
        if self.offset == 0.0 {
            let rr = f64::from(MAX_PERIOD_MS) - f64::from(inv);
            self.offset =
                f64::from(MAX_PERIOD_MS) - (2.0 * rr + f64::from(TYPICAL_PERIOD_MS)) / 3.0;
            return;
        }

        let distance = (extrema_mid - self.offset).abs();
        if distance <= RECENTER_DEADBAND_MS {
            return;
        }
        let step = if distance > RECENTER_FAR_MS {
            distance / RECENTER_FAR_DIVISOR
        } else {
            (distance / RECENTER_NEAR_DIVISOR).max(1.0)
        };
        if extrema_mid > self.offset {
            self.offset += step;
        } else {
            self.offset -= step;
        }
    }

    /// Produce one display sample. `at_peak`/`at_valley` flag whether this
    /// sample committed a breath extremum, which is when the gain may grow.
    pub fn sample(&mut self, inv: i32, at_peak: bool, at_valley: bool) -> u16 {
        let centered = (f64::from(inv) - self.offset) * WAVE_GAIN;
        let value = centered * self.multiplier;

        if value > WAVE_CENTER || value < -WAVE_CENTER {
            self.multiplier -= GAIN_STEP;
        } else if (at_peak && value > 0.0 && value < BOOST_LIMIT)
            || (at_valley && value < 0.0 && value > -BOOST_LIMIT)
        {
            self.multiplier += GAIN_STEP;
        }

        let scaled = centered * self.multiplier + WAVE_CENTER;
        scaled.clamp(0.0, WAVE_MAX).round() as u16
    }

    pub fn reset(&mut self) {
        self.offset = 0.0;
        self.multiplier = 1.0;
    }
}

impl Default for WaveformGenerator {
    fn default() -> Self {
        Self::new()
    }
}
