//! Breath phase detection over the inverted heartbeat period.
//!
//! Respiratory sinus arrhythmia shortens the heartbeat period on inhale, so
//! in the inverted domain (ceiling minus period) an inhale is a rising slope
//! and its end is a local maximum. The detector walks the smoothed series
//! with an adaptive hysteresis threshold and commits a peak or valley only
//! once the signal has retreated past it, which turns raw extrema into breath
//! cycle boundaries with timing.
//!
//! Two drifting watermarks gate the commits after a reset. The peak watermark
//! starts above any plausible signal and sinks; the valley watermark starts
//! below and rises. A peak commits only above the peak watermark, a valley
//! only below the valley watermark, and each commit pins its watermark to the
//! committed extremum. The first cycles after a reset therefore take a few
//! dozen samples to appear instead of locking onto noise.

use crate::models::BreathPhase;
use crate::ring::MovingAverage;

/// Peak watermark after a reset, inverted-domain ms.
const PEAK_WATERMARK_RESET: i32 = 1000;

/// Valley watermark after a reset, inverted-domain ms.
const VALLEY_WATERMARK_RESET: i32 = 400;

/// Per-sample watermark drift toward the signal band, ms.
const WATERMARK_DRIFT: i32 = 10;

/// Divisor applied to the cycle swing when blending the hysteresis threshold.
const THRESHOLD_SWING_RATIO: f64 = 8.0;

/// The hysteresis threshold never drops below this, ms.
const THRESHOLD_FLOOR: f64 = 1.0;

/// Breath rate EMA seed, breaths/min.
const RATE_SEED: f64 = 8.0;

/// Breath rate output floor, breaths/min.
const RATE_FLOOR: f64 = 5.0;

/// Inhale/exhale duration averaging window, cycles.
const DURATION_WINDOW: usize = 8;

/// A committed phase boundary or a stall, reported once per step at most.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BreathEvent {
    /// Inhale ended. `extrema_mid` is the midpoint of the running extrema
    /// right after the exhale tracker was re-seeded; the waveform centers
    /// its offset on it.
    Peak { extrema_mid: f64 },
    /// Exhale ended, closing a full breath cycle. `swing` is the committed
    /// peak-to-valley amplitude in ms, unclamped.
    Valley { swing: f64, extrema_mid: f64 },
    /// No extremum progress for the stall timeout of stream time. Amplitude
    /// estimates should decay.
    Stalled,
}

/// Streaming breath phase detector.
pub struct PhaseDetector {
    phase: BreathPhase,
    /// Running inhale maximum of the inverted period
    max: i32,
    /// Running exhale minimum of the inverted period
    min: i32,
    /// Stream time of the last `max` update
    max_time: u64,
    /// Stream time of the last `min` update
    min_time: u64,
    /// Peak commit gate; sinks until pinned by a commit
    max_low: i32,
    /// Valley commit gate; rises until pinned by a commit
    min_low: i32,
    /// Hysteresis threshold, blended from committed swings
    threshold: f64,
    inhale_avg: MovingAverage,
    exhale_avg: MovingAverage,
    /// Averaged inhale duration, seconds
    inhale_secs: f64,
    /// Averaged exhale duration, seconds
    exhale_secs: f64,
    ti_te: Option<f64>,
    /// Duration of the cycle being assembled, ms
    cycle_ms: u64,
    breath_rate: f64,
}

impl PhaseDetector {
    pub fn new() -> Self {
        Self {
            phase: BreathPhase::Inhale,
            max: 0,
            min: 0,
            max_time: 0,
            min_time: 0,
            max_low: PEAK_WATERMARK_RESET,
            min_low: VALLEY_WATERMARK_RESET,
            threshold: THRESHOLD_FLOOR,
            inhale_avg: MovingAverage::new(DURATION_WINDOW),
            exhale_avg: MovingAverage::new(DURATION_WINDOW),
            inhale_secs: 0.0,
            exhale_secs: 0.0,
            ti_te: None,
            cycle_ms: 0,
            breath_rate: RATE_SEED,
        }
    }

    pub fn phase(&self) -> BreathPhase {
        self.phase
    }

    /// Smoothed breath rate, breaths/min. Seeded at 8 and floored at 5.
    pub fn breath_rate(&self) -> f64 {
        self.breath_rate
    }

    /// Averaged inhale/exhale duration ratio; `None` until a full cycle
    /// has committed.
    pub fn ti_te(&self) -> Option<f64> {
        self.ti_te
    }

    /// Advance one smoothed sample. `inv` is the inverted period, `now` the
    /// cumulative stream time in ms.
    pub fn step(&mut self, inv: i32, now: u64, stall_timeout_ms: u64) -> Option<BreathEvent> {
        // Watermarks drift every sample until they hit zero exactly
        if self.max_low != 0 {
            self.max_low -= WATERMARK_DRIFT;
        }
        if self.min_low != 0 {
            self.min_low += WATERMARK_DRIFT;
        }

        match self.phase {
            BreathPhase::Inhale => {
                if inv > self.max {
                    self.max = inv;
                    self.max_time = now;
                    None
                } else if f64::from(inv) < f64::from(self.max) - self.threshold
                    && self.max > self.max_low
                {
                    Some(self.commit_peak(inv, now))
                } else if now.saturating_sub(self.max_time) > stall_timeout_ms {
                    Some(self.stall(inv, now))
                } else {
                    None
                }
            }
            BreathPhase::Exhale => {
                if inv < self.min {
                    self.min = inv;
                    self.min_time = now;
                    None
                } else if f64::from(inv) >= f64::from(self.min) + self.threshold
                    && self.min < self.min_low
                {
                    Some(self.commit_valley(inv, now))
                } else if now.saturating_sub(self.min_time) > stall_timeout_ms {
                    Some(self.stall(inv, now))
                } else {
                    None
                }
            }
        }
    }

    /// The inhale is over: pin the watermark, bank the inhale duration and
    /// start tracking the exhale from the current sample.
    fn commit_peak(&mut self, inv: i32, now: u64) -> BreathEvent {
        self.max_low = self.max;

        let ti = self.max_time.saturating_sub(self.min_time);
        self.inhale_secs = self.inhale_avg.push(ti as f64) / 1000.0;
        self.cycle_ms = ti;

        self.phase = BreathPhase::Exhale;
        self.min = inv;
        self.min_time = now;

        BreathEvent::Peak {
            extrema_mid: f64::from(self.max + self.min) / 2.0,
        }
    }

    /// The exhale is over: the cycle is complete. Updates the breath rate,
    /// the Ti/Te ratio and the hysteresis threshold before re-arming for the
    /// next inhale.
    fn commit_valley(&mut self, inv: i32, now: u64) -> BreathEvent {
        self.min_low = self.min;

        let te = self.min_time.saturating_sub(self.max_time);
        self.exhale_secs = self.exhale_avg.push(te as f64) / 1000.0;
        self.ti_te = Some(if self.exhale_secs > 0.0 {
            self.inhale_secs / self.exhale_secs
        } else {
            1.0
        });

        self.cycle_ms += te;
        if self.cycle_ms > 0 {
            let fresh = 60_000.0 / self.cycle_ms as f64;
            self.breath_rate = (7.0 * self.breath_rate + fresh) / 8.0;
        }
        if self.breath_rate < RATE_FLOOR {
            self.breath_rate = RATE_FLOOR;
        }

        let swing = f64::from(self.max - self.min);
        self.threshold = (self.threshold + swing / THRESHOLD_SWING_RATIO) / 2.0;
        if self.threshold < THRESHOLD_FLOOR {
            self.threshold = THRESHOLD_FLOOR;
        }

        self.phase = BreathPhase::Inhale;
        self.max = inv;
        self.max_time = now;

        BreathEvent::Valley {
            swing,
            extrema_mid: f64::from(self.max + self.min) / 2.0,
        }
    }

    /// Nothing committed for too long: re-anchor both extrema a hair around
    /// the current sample and drop the threshold so the next real swing can
    /// commit quickly.
    fn stall(&mut self, inv: i32, now: u64) -> BreathEvent {
        self.max_time = now;
        self.min_time = now;
        self.threshold = THRESHOLD_FLOOR;
        self.min = inv - 2;
        self.max = inv + 2;
        BreathEvent::Stalled
    }

    /// Restart the phase in Inhale without touching the trackers. Called when
    /// the smoother resyncs onto a shifted signal level.
    pub fn force_inhale(&mut self) {
        self.phase = BreathPhase::Inhale;
    }

    /// Re-anchor the extremum timestamps at stream time zero. Called when the
    /// stream timebase restarts mid-session.
    pub fn reanchor(&mut self) {
        self.max_time = 0;
        self.min_time = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PhaseDetector {
    fn default() -> Self {
        Self::new()
    }
}
