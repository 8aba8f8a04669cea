//! Heuristic drowsiness scoring.
//!
//! Each input signal is normalized to 0-1 where 1 reads as "more drowsy",
//! then combined with a fixed weight vector. Two vectors exist: one for
//! ticks that carry an ambient noise reading and one for ticks that don't.

use crate::scoring::types::FeatureSnapshot;

/// Lux value at which the light signal has decayed to ~37% of full darkness.
const LUX_DECAY: f64 = 50.0;

/// Heart rate band mapped onto the drowsiness scale (BPM).
const HR_MIN_BPM: f64 = 40.0;
const HR_MAX_BPM: f64 = 100.0;

/// Session duration at which the signal saturates (minutes).
const SESSION_SATURATION_MIN: f64 = 30.0;

/// Screen-off duration at which the signal saturates (minutes).
const SCREEN_OFF_SATURATION_MIN: f64 = 15.0;

/// Ambient noise band mapped onto the drowsiness scale (dB).
const NOISE_MIN_DB: f64 = 35.0;
const NOISE_MAX_DB: f64 = 70.0;

/// Weights without an ambient noise reading:
/// light, stillness, window proximity, heart rate, session, screen-off.
const WEIGHTS: [f64; 6] = [0.25, 0.20, 0.15, 0.15, 0.10, 0.15];

/// Weights with an ambient noise reading:
/// light, stillness, window proximity, heart rate, session, screen-off, noise.
const WEIGHTS_WITH_AUDIO: [f64; 7] = [0.20, 0.18, 0.12, 0.15, 0.10, 0.10, 0.15];

/// A model that maps one feature snapshot to a raw drowsiness score.
///
/// Implementations must stay inside 0-100. The engine only depends on this
/// capability, so alternate models can be swapped in without touching the
/// smoother, classifier, or controller.
pub trait ScoreModel: Send {
    /// Predict a raw drowsiness score in 0-100 for the snapshot.
    fn predict(&self, snapshot: &FeatureSnapshot) -> f64;
}

/// The fixed-weight heuristic model.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScoreModel;

impl HeuristicScoreModel {
    pub fn new() -> Self {
        Self
    }

    /// Darkness signal: bright light -> 0, darkness -> 1.
    fn light_signal(lux: f64) -> f64 {
        (-lux.max(0.0) / LUX_DECAY).exp().clamp(0.0, 1.0)
    }

    /// Heart rate signal: 40 BPM -> 1, 100 BPM -> 0.
    fn heart_rate_signal(bpm: f64) -> f64 {
        let clamped = bpm.clamp(HR_MIN_BPM, HR_MAX_BPM);
        (HR_MAX_BPM - clamped) / (HR_MAX_BPM - HR_MIN_BPM)
    }

    /// Linear ramp toward 1 at the saturation point.
    fn saturating_signal(minutes: f64, saturation: f64) -> f64 {
        (minutes.max(0.0) / saturation).min(1.0)
    }

    /// Ambient noise signal: 35 dB -> 1 (quiet), 70 dB -> 0 (loud).
    fn noise_signal(db: f64) -> f64 {
        let clamped = db.clamp(NOISE_MIN_DB, NOISE_MAX_DB);
        (NOISE_MAX_DB - clamped) / (NOISE_MAX_DB - NOISE_MIN_DB)
    }
}

impl ScoreModel for HeuristicScoreModel {
    fn predict(&self, snapshot: &FeatureSnapshot) -> f64 {
        let base = [
            Self::light_signal(snapshot.ambient_lux),
            snapshot.stillness.clamp(0.0, 1.0),
            snapshot.window_proximity.clamp(0.0, 1.0),
            Self::heart_rate_signal(snapshot.heart_rate_bpm),
            Self::saturating_signal(snapshot.session_minutes, SESSION_SATURATION_MIN),
            Self::saturating_signal(snapshot.screen_off_minutes, SCREEN_OFF_SATURATION_MIN),
        ];

        let weighted: f64 = match snapshot.noise_db {
            Some(db) => {
                let signals = [
                    base[0],
                    base[1],
                    base[2],
                    base[3],
                    base[4],
                    base[5],
                    Self::noise_signal(db),
                ];
                signals
                    .iter()
                    .zip(WEIGHTS_WITH_AUDIO.iter())
                    .map(|(s, w)| s * w)
                    .sum()
            }
            None => base.iter().zip(WEIGHTS.iter()).map(|(s, w)| s * w).sum(),
        };

        (weighted * 100.0).clamp(0.0, 100.0)
    }
}
