//! Analysis session state: loaded recording, athlete profile and the
//! aerobic threshold bookkeeping.
//!
//! A session keeps the immutable original series alongside the working copy
//! that cropping narrows, so edits never lose data. Sessions round-trip
//! through the `.atds` JSON container with its original field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::models::AthleteProfile;

/// In-memory session state.
#[derive(Debug, Clone)]
pub struct Session {
    /// Stable identifier for logs and exports
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// The original load, never modified
    raw: Vec<u16>,
    /// The series being analyzed, narrowed by cropping
    working: Vec<u16>,
    pub profile: AthleteProfile,
    manual_at: Option<u16>,
    auto_at: Option<u16>,
}

/// On-disk `.atds` session container.
///
/// Field names match the original recordings so existing files load as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default)]
    pub profile: AthleteProfile,
    #[serde(default)]
    pub analysis: AnalysisState,
    #[serde(rename = "rrData")]
    pub rr_data: Vec<u16>,
}

/// Aerobic threshold state as stored in a session file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisState {
    #[serde(rename = "manualAT")]
    pub manual_at: Option<u16>,
    #[serde(rename = "autoAT")]
    pub auto_at: Option<u16>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            raw: Vec::new(),
            working: Vec::new(),
            profile: AthleteProfile::default(),
            manual_at: None,
            auto_at: None,
        }
    }

    /// Replace both series with a fresh recording and recompute the
    /// age-based threshold estimate.
    pub fn load_data(&mut self, rr_intervals: &[u16]) {
        self.raw = rr_intervals.to_vec();
        self.working = rr_intervals.to_vec();
        self.auto_at = Some(self.profile.auto_at());
        info!(
            session = %self.id,
            samples = self.raw.len(),
            auto_at = ?self.auto_at,
            "recording loaded"
        );
    }

    /// Update the athlete profile. The automatic threshold follows the age.
    pub fn set_profile(&mut self, profile: AthleteProfile) {
        self.profile = profile;
        self.auto_at = Some(self.profile.auto_at());
    }

    /// Effective aerobic threshold: the manual override when set, the
    /// automatic estimate otherwise.
    pub fn at(&self) -> Option<u16> {
        self.manual_at.or(self.auto_at)
    }

    /// Override the automatic threshold. Zero clears the override.
    pub fn set_manual_at(&mut self, at_bpm: u16) {
        self.manual_at = if at_bpm == 0 { None } else { Some(at_bpm) };
    }

    /// Drop the manual override and return the automatic estimate.
    pub fn reset_at(&mut self) -> Option<u16> {
        self.manual_at = None;
        self.auto_at
    }

    /// Narrow the working series to `[start, end]` (inclusive). Indices are
    /// clamped to the series; nothing happens unless `start < end` after
    /// clamping.
    pub fn crop(&mut self, start: usize, end: usize) {
        if self.working.is_empty() {
            return;
        }
        let end = end.min(self.working.len() - 1);
        if start < end {
            self.working = self.working[start..=end].to_vec();
            info!(
                session = %self.id,
                start,
                end,
                samples = self.working.len(),
                "working series cropped"
            );
        }
    }

    pub fn raw(&self) -> &[u16] {
        &self.raw
    }

    pub fn working(&self) -> &[u16] {
        &self.working
    }

    /// Serialize the session for saving as a `.atds` file. The working
    /// series is what gets persisted.
    pub fn to_atds(&self) -> Result<String> {
        let file = SessionFile {
            profile: self.profile.clone(),
            analysis: AnalysisState {
                manual_at: self.manual_at,
                auto_at: self.auto_at,
            },
            rr_data: self.working.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Rebuild a session from a parsed `.atds` container.
    pub fn from_file(file: SessionFile) -> Self {
        let mut session = Self::new();
        session.profile = file.profile;
        session.raw = file.rr_data.clone();
        session.working = file.rr_data;
        session.auto_at = file.analysis.auto_at.or(Some(session.profile.auto_at()));
        session.manual_at = file.analysis.manual_at;
        session
    }
}
