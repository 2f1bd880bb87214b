//! Input conditioning for the live RR stream.
//!
//! Two stages run in series: a spike filter that drops single-sample
//! outliers, and an adaptive smoother whose acceptance band follows the
//! current breathing amplitude. Both stages force a resync after
//! [`REJECT_RESYNC_LIMIT`] consecutive rejections so a genuine level shift
//! (sensor reattached, posture change) cannot lock the stream out forever.

use tracing::{debug, trace};

use crate::models::{
    FilterMode, MAX_PERIOD_MS, MIN_PERIOD_MS, REJECT_RESYNC_LIMIT, TYPICAL_AMPLITUDE,
};

/// Fixed widening of the rest-mode acceptance band, ms.
const REST_BAND_DIFF_MS: f64 = 200.0;

/// Fixed widening of the exercise-mode acceptance band, ms.
const EXERCISE_BAND_DIFF_MS: f64 = 5.0;

/// History weight of the smoother's amplitude average on a breath-cycle blend.
const AMP_BLEND_SAMPLES: f64 = 6.0;

/// Amplitude average installed by a seed or a forced resync.
const RESYNC_AMPLITUDE: f64 = 2.0 * TYPICAL_AMPLITUDE;

/// Drops RR samples that are outside the physiological window or more than
/// twice the running reference.
#[derive(Debug, Clone)]
pub struct SpikeFilter {
    /// Reference period the next sample is judged against; 0 until seeded
    reference: f64,
    reject_count: u8,
}

impl SpikeFilter {
    pub fn new() -> Self {
        Self {
            reference: 0.0,
            reject_count: 0,
        }
    }

    /// Filter one sample. `None` means the tick produced no usable sample.
    pub fn filter(&mut self, rr: u16) -> Option<u16> {
        if self.reference == 0.0 {
            self.reference = f64::from(rr);
        }

        let out_of_range = rr < MIN_PERIOD_MS || rr > MAX_PERIOD_MS;
        if out_of_range || f64::from(rr) > 2.0 * self.reference {
            self.reject_count += 1;
            if self.reject_count >= REJECT_RESYNC_LIMIT {
                // The rejected sample becomes the reference unconditionally
                debug!(rr, reference = self.reference, "spike filter resync");
                self.reference = f64::from(rr);
                self.reject_count = 0;
            } else {
                trace!(rr, reference = self.reference, "spike rejected");
            }
            return None;
        }

        self.reference = (2.0 * self.reference + f64::from(rr)) / 3.0;
        self.reject_count = 0;
        Some(rr)
    }

    pub fn reset(&mut self) {
        self.reference = 0.0;
        self.reject_count = 0;
    }
}

impl Default for SpikeFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// One smoothed sample plus whether producing it forced a resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Smoothed {
    /// Value passed downstream; repeats the previous accepted sample on reject
    pub value: u16,
    /// Set when the 5th consecutive reject re-seeded the averages; the breath
    /// phase must restart in Inhale
    pub resynced: bool,
}

/// Acceptance-band smoother producing a stable heartbeat-period series.
///
/// The band half-width follows the running amplitude average, which is fed
/// back from committed breath cycles: the wider the breathing swing, the more
/// the raw series is allowed to move per beat.
#[derive(Debug, Clone)]
pub struct AdaptiveSmoother {
    mode: FilterMode,
    /// Running period average, 9:1 toward history on accept
    period_avg: f64,
    /// Running breath-amplitude average; 0 until seeded
    amp_avg: f64,
    /// Last accepted sample; 0 until seeded
    prev: u16,
    reject_count: u8,
}

impl AdaptiveSmoother {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            period_avg: 0.0,
            amp_avg: 0.0,
            prev: 0,
            reject_count: 0,
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
    }

    /// Smooth one spike-accepted sample.
    pub fn smooth(&mut self, rr: u16) -> Smoothed {
        if self.prev == 0 || self.amp_avg == 0.0 {
            self.prev = rr;
            self.period_avg = f64::from(rr);
            self.amp_avg = RESYNC_AMPLITUDE;
            return Smoothed {
                value: rr,
                resynced: false,
            };
        }

        let half_width = match self.mode {
            FilterMode::Rest => self.amp_avg / 2.0 + REST_BAND_DIFF_MS,
            FilterMode::Exercise => self.amp_avg / 3.0 + EXERCISE_BAND_DIFF_MS,
        };

        let sample = f64::from(rr);
        if sample > self.period_avg + half_width || sample < self.period_avg - half_width {
            self.reject_count += 1;
            let resynced = self.reject_count >= REJECT_RESYNC_LIMIT;
            if resynced {
                debug!(
                    rr,
                    period_avg = self.period_avg,
                    "smoother resync after consecutive rejects"
                );
                self.amp_avg = RESYNC_AMPLITUDE;
                self.reject_count = 0;
                self.period_avg = (self.period_avg * 4.0 + sample) / 5.0;
                if self.period_avg > f64::from(MAX_PERIOD_MS) {
                    self.period_avg = sample;
                }
            }
            Smoothed {
                value: self.prev,
                resynced,
            }
        } else {
            self.prev = rr;
            self.reject_count = 0;
            self.period_avg = (self.period_avg * 9.0 + sample) / 10.0;
            Smoothed {
                value: rr,
                resynced: false,
            }
        }
    }

    /// Seed the amplitude average from the first committed breath cycle.
    pub fn seed_amplitude(&mut self, value: f64) {
        self.amp_avg = value;
    }

    /// Blend a committed breath-cycle delta into the amplitude average.
    pub fn blend_amplitude(&mut self, delta: f64) {
        self.amp_avg = (AMP_BLEND_SAMPLES * self.amp_avg + delta) / (AMP_BLEND_SAMPLES + 1.0);
    }

    /// Decay the amplitude average toward its floor after a breath stall.
    pub fn decay_amplitude(&mut self, floor: f64, factor: f64) {
        if self.amp_avg > floor {
            self.amp_avg = floor + (self.amp_avg - floor) * factor;
        }
    }

    pub fn reset(&mut self) {
        self.period_avg = 0.0;
        self.amp_avg = 0.0;
        self.prev = 0;
        self.reject_count = 0;
    }
}
