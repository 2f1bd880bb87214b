//! HRV amplitude estimation.
//!
//! The amplitude is the breath-to-breath swing of the inverted heartbeat
//! period, blended over committed breath cycles. It is the primary input of
//! the training-state classifier: large at rest, collapsing toward zero as
//! exertion suppresses respiratory sinus arrhythmia.

use crate::models::{AMPLITUDE_LIMIT, AMP_BOUND_LOW, MAX_PERIOD_MS, STALL_DECAY, TYPICAL_AMPLITUDE};

/// What a committed breath cycle did to the estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleUpdate {
    /// First cycle: the estimate was seeded halfway between the typical
    /// amplitude and the observed swing. Carries the seed value so the
    /// smoother's amplitude average can start from the same point.
    Seeded(f64),
    /// Estimate blended 3:1 toward history. Carries the clamped swing for
    /// the smoother's own blend.
    Blended(f64),
    /// Swing was at least half the period ceiling and was ignored.
    Rejected,
}

/// Blended breath-swing estimate, clamped to [0, 99] ms.
///
/// `None` until the first breath cycle commits; the classifier treats that as
/// "no amplitude yet" and refuses to classify.
#[derive(Debug, Clone, Default)]
pub struct AmplitudeEstimator {
    value: Option<f64>,
}

impl AmplitudeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Fold one committed breath cycle's swing into the estimate.
    pub fn on_cycle(&mut self, swing: f64) -> CycleUpdate {
        if swing >= f64::from(MAX_PERIOD_MS) / 2.0 {
            return CycleUpdate::Rejected;
        }
        let swing = swing.min(AMPLITUDE_LIMIT);

        match self.value {
            None => {
                let seed = (TYPICAL_AMPLITUDE + swing) / 2.0;
                self.value = Some(seed);
                CycleUpdate::Seeded(seed)
            }
            Some(current) => {
                self.value = Some((3.0 * current + swing) / 4.0);
                CycleUpdate::Blended(swing)
            }
        }
    }

    /// Pull the estimate toward its floor after a breath stall.
    pub fn decay(&mut self) {
        if let Some(current) = self.value {
            if current > AMP_BOUND_LOW {
                self.value = Some(AMP_BOUND_LOW + (current - AMP_BOUND_LOW) * STALL_DECAY);
            }
        }
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}
