//! Core data types for the scoring pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heart rate assumed when no reading is available (resting adult).
pub const DEFAULT_HEART_RATE_BPM: f64 = 60.0;

/// Normalized input signals for one scoring tick.
///
/// Built fresh every tick; never mutated. Missing collaborator values are
/// filled with the least-drowsy interpretation before construction, except
/// heart rate which defaults to [`DEFAULT_HEART_RATE_BPM`] and ambient
/// noise which stays absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    /// Ambient light in lux (>= 0)
    pub ambient_lux: f64,
    /// Phone stillness, 0-1 where 1 = completely still
    pub stillness: f64,
    /// Proximity to the sleep window center, 0-1 where 1 = window center
    pub window_proximity: f64,
    /// Heart rate in BPM (> 0)
    pub heart_rate_bpm: f64,
    /// Minutes the current monitoring session has been open
    pub session_minutes: f64,
    /// Minutes the screen has been continuously off
    pub screen_off_minutes: f64,
    /// Ambient noise in dB; absent when audio sampling is off or failed
    pub noise_db: Option<f64>,
    /// When the snapshot was captured
    pub captured_at: DateTime<Utc>,
}

impl FeatureSnapshot {
    /// Snapshot describing a fully awake, bright, active environment.
    /// Used as the fail-soft baseline when every collaborator is silent.
    pub fn neutral(captured_at: DateTime<Utc>) -> Self {
        Self {
            ambient_lux: 300.0,
            stillness: 0.0,
            window_proximity: 0.0,
            heart_rate_bpm: DEFAULT_HEART_RATE_BPM,
            session_minutes: 0.0,
            screen_off_minutes: 0.0,
            noise_db: None,
            captured_at,
        }
    }
}

/// Discrete behavioral state, ordered by severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DrowsinessState {
    #[default]
    Awake,
    Relaxing,
    Drowsy,
    LikelySleeping,
}

impl std::fmt::Display for DrowsinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DrowsinessState::Awake => "awake",
            DrowsinessState::Relaxing => "relaxing",
            DrowsinessState::Drowsy => "drowsy",
            DrowsinessState::LikelySleeping => "likely_sleeping",
        };
        write!(f, "{name}")
    }
}

/// Outcome of one scoring tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Final smoothed score, 0-100
    pub score: f64,
    /// State the classifier currently reports
    pub state: DrowsinessState,
    /// The snapshot this tick scored
    pub snapshot: FeatureSnapshot,
    /// Whether the controller should attempt camera verification now
    pub should_verify: bool,
    /// Adaptive multiplier that was applied before smoothing
    pub multiplier: f64,
}
