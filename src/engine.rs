//! The live processing engine.
//!
//! [`AtdsEngine`] owns every piece of pipeline state and advances all of it
//! in one atomic step per RR sample: spike filter, adaptive smoother, phase
//! detector, amplitude estimator, waveform and zone classification. Nothing
//! here reads a wall clock; all timing derives from the cumulative RR-time
//! base, so replaying a recorded sequence reproduces every output bit for
//! bit.

use tracing::trace;

use crate::amplitude::{AmplitudeEstimator, CycleUpdate};
use crate::breath::{BreathEvent, PhaseDetector};
use crate::filter::{AdaptiveSmoother, SpikeFilter};
use crate::models::{
    FilterMode, SampleOutput, Sport, AMP_BOUND_LOW, MAX_PERIOD_MS, STALL_DECAY, STALL_TIMEOUT_MS,
};
use crate::waveform::WaveformGenerator;
use crate::zones::{ZoneState, ZoneStateMachine};

/// History weight of the long-horizon heartbeat period average.
const PERIOD_AVG_SAMPLES: f64 = 24.0;

/// Streaming RR processor producing one [`SampleOutput`] per accepted sample.
pub struct AtdsEngine {
    spike: SpikeFilter,
    smoother: AdaptiveSmoother,
    breath: PhaseDetector,
    amplitude: AmplitudeEstimator,
    waveform: WaveformGenerator,
    zones: ZoneStateMachine,
    /// Cumulative stream time, fed by smoothed periods, ms
    timebase: u64,
    /// Long-horizon heartbeat period average over spike-accepted samples;
    /// 0 until seeded
    period_avg: f64,
    /// Heart frequency matching `period_avg`, beats/min
    hf_avg: f64,
}

impl AtdsEngine {
    pub fn new(sport: Sport, mode: FilterMode) -> Self {
        Self {
            spike: SpikeFilter::new(),
            smoother: AdaptiveSmoother::new(mode),
            breath: PhaseDetector::new(),
            amplitude: AmplitudeEstimator::new(),
            waveform: WaveformGenerator::new(),
            zones: ZoneStateMachine::new(sport),
            timebase: 0,
            period_avg: 0.0,
            hf_avg: 0.0,
        }
    }

    /// Process one raw RR sample. `None` means the sample was dropped by the
    /// spike filter and this tick produced no output.
    pub fn process(&mut self, rr: u16) -> Option<SampleOutput> {
        let accepted = self.spike.filter(rr)?;

        if self.period_avg == 0.0 {
            self.period_avg = f64::from(accepted);
        } else {
            self.period_avg =
                (PERIOD_AVG_SAMPLES * self.period_avg + f64::from(accepted)) / (PERIOD_AVG_SAMPLES + 1.0);
        }
        self.hf_avg = 60_000.0 / self.period_avg;

        let smoothed = self.smoother.smooth(accepted);
        if smoothed.resynced {
            self.breath.force_inhale();
        }

        self.timebase += u64::from(smoothed.value);
        let inv = i32::from(MAX_PERIOD_MS) - i32::from(smoothed.value);

        let event = self.breath.step(inv, self.timebase, STALL_TIMEOUT_MS);
        let mut at_peak = false;
        let mut at_valley = false;
        match event {
            Some(BreathEvent::Peak { extrema_mid }) => {
                at_peak = true;
                self.waveform.recenter(inv, extrema_mid);
            }
            Some(BreathEvent::Valley { swing, extrema_mid }) => {
                at_valley = true;
                match self.amplitude.on_cycle(swing) {
                    CycleUpdate::Seeded(seed) => self.smoother.seed_amplitude(seed),
                    CycleUpdate::Blended(delta) => self.smoother.blend_amplitude(delta),
                    CycleUpdate::Rejected => {}
                }
                self.waveform.recenter(inv, extrema_mid);
            }
            Some(BreathEvent::Stalled) => {
                self.amplitude.decay();
                self.smoother.decay_amplitude(AMP_BOUND_LOW, STALL_DECAY);
            }
            None => {}
        }

        let waveform = self.waveform.sample(inv, at_peak, at_valley);
        let zone = self.zones.classify(self.period_avg, self.amplitude.value());

        let output = SampleOutput {
            rr_ms: rr,
            filtered_ms: smoothed.value,
            timebase_ms: self.timebase,
            waveform,
            phase: self.breath.phase(),
            breath_rate: self.breath.breath_rate(),
            hrv_amplitude: self.amplitude.value(),
            ti_te: self.breath.ti_te(),
            heart_rate: self.hf_avg.round() as u16,
            zone,
            zone_progress: self.zones.progress(),
            at: self.zones.at(),
        };
        trace!(
            rr,
            filtered = output.filtered_ms,
            waveform = output.waveform,
            zone = %output.zone,
            "sample processed"
        );
        Some(output)
    }

    /// Aerobic threshold in beats/min, once anchored or supplied.
    pub fn at(&self) -> Option<u16> {
        self.zones.at()
    }

    pub fn zone(&self) -> ZoneState {
        self.zones.state()
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.smoother.mode()
    }

    /// Switch the smoother between rest and exercise band dynamics.
    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        self.smoother.set_mode(mode);
    }

    pub fn set_sport(&mut self, sport: Sport) {
        self.zones.set_sport(sport);
    }

    /// Adopt an externally measured aerobic threshold, or clear it with
    /// `None` to re-arm automatic anchoring.
    pub fn set_external_at(&mut self, at: Option<u16>) {
        self.zones.set_external_at(at);
    }

    /// Scale a previous session's threshold by a perceived-effort level and
    /// adopt it as external. Returns the adopted value.
    pub fn set_at_from_rest(&mut self, last_at: u16, level: i8) -> Option<u16> {
        self.zones.set_at_from_rest(last_at, level)
    }

    /// Begin a new training segment: the timebase restarts and the zone
    /// boundaries clear, optionally dropping the anchored threshold. The
    /// signal trackers keep running so the stream stays continuous.
    pub fn start_segment(&mut self, reset_at: bool) {
        self.timebase = 0;
        self.breath.reanchor();
        self.zones.start_segment(reset_at);
    }

    /// Full reseed of every tracker, as at session start.
    pub fn reset(&mut self) {
        self.spike.reset();
        self.smoother.reset();
        self.breath.reset();
        self.amplitude.reset();
        self.waveform.reset();
        self.zones.reset();
        self.timebase = 0;
        self.period_avg = 0.0;
        self.hf_avg = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AtdsEngine {
        AtdsEngine::new(Sport::None, FilterMode::Rest)
    }

    #[test]
    fn test_out_of_bounds_sample_yields_nothing() {
        let mut e = engine();
        assert!(e.process(100).is_none());
        assert!(e.process(1700).is_none());
        assert!(e.process(800).is_some());
    }

    #[test]
    fn test_first_sample_output() {
        let mut e = engine();
        let out = e.process(800).unwrap();

        assert_eq!(out.rr_ms, 800);
        assert_eq!(out.filtered_ms, 800);
        assert_eq!(out.timebase_ms, 800);
        assert_eq!(out.heart_rate, 75); // 60000 / 800
        assert_eq!(out.hrv_amplitude, None);
        assert_eq!(out.ti_te, None);
        assert_eq!(out.zone, ZoneState::Unknown); // gated by the sentinel
        assert_eq!(out.at, None);
        assert_eq!(out.breath_rate, 8.0);
    }

    #[test]
    fn test_timebase_accumulates_smoothed_periods() {
        let mut e = engine();
        e.process(800);
        e.process(820);
        let out = e.process(810).unwrap();
        assert_eq!(out.timebase_ms, 800 + 820 + 810);
    }

    #[test]
    fn test_heart_rate_follows_period_average() {
        let mut e = engine();
        e.process(800);
        let out = e.process(600).unwrap();
        // (24 * 800 + 600) / 25 = 792; 60000 / 792 = 75.76 -> 76
        assert_eq!(out.heart_rate, 76);
    }

    #[test]
    fn test_band_reject_repeats_previous_downstream() {
        let mut e = engine();
        e.process(800); // seeds the smoother
        // 1100 passes the spike filter (reference blends slowly) but lands
        // outside the smoother band of 800 +/- 235
        let out = e.process(1100).unwrap();
        assert_eq!(out.rr_ms, 1100);
        assert_eq!(out.filtered_ms, 800);
    }

    #[test]
    fn test_deterministic_replay() {
        let samples: Vec<u16> = (0..60)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * f64::from(i) / 20.0;
                (800.0 + 40.0 * phase.sin()).round() as u16
            })
            .collect();

        let mut e = engine();
        let first: Vec<_> = samples.iter().filter_map(|&rr| e.process(rr)).collect();

        e.reset();
        let second: Vec<_> = samples.iter().filter_map(|&rr| e.process(rr)).collect();

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_external_at_round_trip() {
        let mut e = engine();
        e.set_external_at(Some(170));
        assert_eq!(e.at(), Some(170));
        e.set_external_at(None);
        assert_eq!(e.at(), None);
    }

    #[test]
    fn test_segment_restart_clears_timebase() {
        let mut e = engine();
        e.process(800);
        e.process(810);
        e.start_segment(false);
        let out = e.process(805).unwrap();
        assert_eq!(out.timebase_ms, 805);
    }

    // Property-based tests using proptest
    use crate::models::MIN_PERIOD_MS;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_output_bounds_for_any_input(
            rrs in prop::collection::vec(any::<u16>(), 0..300)
        ) {
            let mut e = engine();
            let mut last_timebase = 0u64;

            for rr in rrs {
                if let Some(out) = e.process(rr) {
                    // The spike filter bounds everything downstream
                    prop_assert!((MIN_PERIOD_MS..=MAX_PERIOD_MS).contains(&out.filtered_ms));
                    prop_assert!(out.waveform <= 999);
                    prop_assert!(out.zone_progress <= 100);

                    // Heart rate stays in the range the period bounds allow
                    prop_assert!((36..=250).contains(&out.heart_rate));

                    // The breath rate never falls below its floor
                    prop_assert!(out.breath_rate >= 5.0);

                    if let Some(amp) = out.hrv_amplitude {
                        prop_assert!((0.0..=99.0).contains(&amp));
                    }
                    if let Some(ti_te) = out.ti_te {
                        prop_assert!(ti_te.is_finite());
                        prop_assert!(ti_te >= 0.0);
                    }

                    // Stream time only moves forward
                    prop_assert!(out.timebase_ms > last_timebase);
                    last_timebase = out.timebase_ms;
                }
            }
        }

        #[test]
        fn test_replay_after_reset_is_identical(
            rrs in prop::collection::vec(500u16..1200u16, 1..200)
        ) {
            let mut e = engine();
            let first: Vec<_> = rrs.iter().filter_map(|&rr| e.process(rr)).collect();

            e.reset();
            let second: Vec<_> = rrs.iter().filter_map(|&rr| e.process(rr)).collect();

            prop_assert_eq!(first, second);
        }
    }
}
