use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest accepted heartbeat interval in milliseconds (equals 36 beats/min).
pub const MAX_PERIOD_MS: u16 = 1666;

/// Typical resting heartbeat interval in milliseconds (equals 75 beats/min).
pub const TYPICAL_PERIOD_MS: u16 = 800;

/// Shortest accepted heartbeat interval in milliseconds (equals 250 beats/min).
pub const MIN_PERIOD_MS: u16 = 240;

/// Typical resting breath-cycle amplitude in milliseconds; averaged with the
/// first measured peak-to-valley delta to seed the HRV amplitude estimate.
pub const TYPICAL_AMPLITUDE: f64 = 35.0;

/// Largest breath-cycle delta that may enter the amplitude estimate in one step.
pub const AMPLITUDE_LIMIT: f64 = 99.0;

/// Amplitude at or above which the classifier reads a fully relaxed state.
pub const AMP_BOUND_RELAX: f64 = 70.0;

/// Amplitude bound between the Rest and Active ranges.
pub const AMP_BOUND_REST: f64 = 40.0;

/// Amplitude bound between the Active and Warm-up/Cool-down ranges.
pub const AMP_BOUND_ACTIVE: f64 = 10.0;

/// Lowest amplitude bound; dropping below it (with a short enough heartbeat
/// period) is the aerobic-threshold anchor condition.
pub const AMP_BOUND_LOW: f64 = 5.0;

/// Consecutive rejections after which a filter stage force-resyncs.
pub const REJECT_RESYNC_LIMIT: u8 = 5;

/// Breath-stall timeout in cumulative RR-time milliseconds.
pub const STALL_TIMEOUT_MS: u64 = 8000;

/// Heartbeat period ceiling for the aerobic-threshold anchor, ms.
///
/// Corresponds to a heart frequency of about 99 beats/min. Prevents a false
/// lock-in to the endurance states at too low a heart rate; still below the
/// value specified for a 70-year old.
pub const AT_ANCHOR_MAX_PERIOD_MS: u16 = 606;

/// Aerobic threshold as a multiple of the heart frequency at the anchor point.
pub const AT_RATIO: f64 = 1.4;

/// Factor applied to amplitude estimates (toward their floor) when a breath
/// phase stalls past [`STALL_TIMEOUT_MS`].
pub const STALL_DECAY: f64 = 0.8;

/// Sport practiced during a recording. Shifts the anchored aerobic threshold
/// for sports with a known heart-rate offset relative to cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    #[default]
    None,
    Cycling,
    Rowing,
    Jogging,
    Skating,
    Steps,
    Walking,
}

impl Sport {
    /// Offset in beats/min applied to the aerobic threshold at anchor time.
    pub fn at_offset_bpm(&self) -> f64 {
        match self {
            Sport::Jogging => 10.0,
            Sport::Steps => 5.0,
            _ => 0.0,
        }
    }
}

impl FromStr for Sport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Sport::None),
            "cycling" => Ok(Sport::Cycling),
            "rowing" => Ok(Sport::Rowing),
            "jogging" | "running" => Ok(Sport::Jogging),
            "skating" => Ok(Sport::Skating),
            "steps" => Ok(Sport::Steps),
            "walking" => Ok(Sport::Walking),
            _ => Err(format!("Unknown sport: {}", s)),
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sport::None => "none",
            Sport::Cycling => "cycling",
            Sport::Rowing => "rowing",
            Sport::Jogging => "jogging",
            Sport::Skating => "skating",
            Sport::Steps => "steps",
            Sport::Walking => "walking",
        };
        write!(f, "{}", name)
    }
}

/// Acceptance-band dynamics of the adaptive smoother.
///
/// Rest recordings tolerate the full respiratory swing (wide band); exercise
/// recordings expect a compressed swing and clamp down hard on outliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Rest,
    Exercise,
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rest" => Ok(FilterMode::Rest),
            "exercise" | "ex" => Ok(FilterMode::Exercise),
            _ => Err(format!("Unknown filter mode: {} (expected rest|exercise)", s)),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::Rest => write!(f, "rest"),
            FilterMode::Exercise => write!(f, "exercise"),
        }
    }
}

/// Biological gender, used by the VO2max estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            _ => Err(format!("Unknown gender: {} (expected male|female)", s)),
        }
    }
}

/// Athlete context for a recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteProfile {
    /// Age in years
    pub age: u8,

    /// Body weight in kilograms
    pub weight: u16,

    pub gender: Gender,

    /// Systolic blood pressure in mmHg
    pub sys: u16,

    /// Diastolic blood pressure in mmHg
    pub dia: u16,

    /// Body fat percentage
    pub fat: u8,

    /// Sport practiced during the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sport: Option<Sport>,
}

impl Default for AthleteProfile {
    fn default() -> Self {
        Self {
            age: 30,
            weight: 75,
            gender: Gender::Male,
            sys: 120,
            dia: 80,
            fat: 15,
            sport: None,
        }
    }
}

impl AthleteProfile {
    /// Age-predicted maximum heart rate (220 − age).
    pub fn max_hr(&self) -> u16 {
        220u16.saturating_sub(self.age as u16)
    }

    /// Age-based aerobic threshold estimate: 85% of the predicted maximum.
    pub fn auto_at(&self) -> u16 {
        (self.max_hr() as f64 * 0.85).round() as u16
    }
}

/// Breath phase derived from the inverted heartbeat-period signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreathPhase {
    Inhale,
    Exhale,
}

impl fmt::Display for BreathPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreathPhase::Inhale => write!(f, "inhale"),
            BreathPhase::Exhale => write!(f, "exhale"),
        }
    }
}

/// Everything the live engine knows after one accepted sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleOutput {
    /// Sample that survived the spike filter, ms
    pub rr_ms: u16,

    /// Heartbeat period after adaptive smoothing, ms
    pub filtered_ms: u16,

    /// Cumulative RR-derived time at this sample, ms
    pub timebase_ms: u64,

    /// Derived breathing waveform, scaled to the 0..=999 display range
    pub waveform: u16,

    /// Current breath phase
    pub phase: BreathPhase,

    /// Smoothed breath rate in breaths/min
    pub breath_rate: f64,

    /// HRV amplitude estimate, ms; None until the first committed breath cycle
    pub hrv_amplitude: Option<f64>,

    /// Inhale/exhale duration ratio; None until a full cycle has committed
    pub ti_te: Option<f64>,

    /// Averaged heart rate in beats/min (rounded)
    pub heart_rate: u16,

    /// Training zone classification
    pub zone: crate::zones::ZoneState,

    /// Position within the current intensity tier, 0..=100
    pub zone_progress: u8,

    /// Aerobic threshold in beats/min, once anchored or supplied
    pub at: Option<u16>,
}
