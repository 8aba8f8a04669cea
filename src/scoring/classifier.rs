//! Hysteresis-based state classification.

use crate::scoring::types::DrowsinessState;

/// Score at or above which the user counts as at least relaxing.
const RELAXING_THRESHOLD: f64 = 30.0;

/// Consecutive ticks a candidate state must hold before it is adopted.
const HOLD_TICKS: u32 = 3;

/// Maps smoothed scores to discrete states with a hold-count filter.
///
/// A candidate state is only adopted after it has been produced for
/// [`HOLD_TICKS`] consecutive ticks; until then the previously adopted
/// state keeps being reported. This suppresses flapping when the score
/// hovers around a threshold.
#[derive(Debug, Clone)]
pub struct StateClassifier {
    current: DrowsinessState,
    pending: Option<DrowsinessState>,
    pending_ticks: u32,
}

impl Default for StateClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StateClassifier {
    pub fn new() -> Self {
        Self {
            current: DrowsinessState::Awake,
            pending: None,
            pending_ticks: 0,
        }
    }

    /// Raw threshold banding without hysteresis.
    ///
    /// Thresholds are compared in descending order; callers are expected to
    /// supply `sleeping > drowsy` (see `Settings::validate`).
    fn candidate(score: f64, drowsy_threshold: f64, sleeping_threshold: f64) -> DrowsinessState {
        if score >= sleeping_threshold {
            DrowsinessState::LikelySleeping
        } else if score >= drowsy_threshold {
            DrowsinessState::Drowsy
        } else if score >= RELAXING_THRESHOLD {
            DrowsinessState::Relaxing
        } else {
            DrowsinessState::Awake
        }
    }

    /// Feed one smoothed score and get the currently adopted state.
    pub fn classify(
        &mut self,
        score: f64,
        drowsy_threshold: f64,
        sleeping_threshold: f64,
    ) -> DrowsinessState {
        let candidate = Self::candidate(score, drowsy_threshold, sleeping_threshold);

        if candidate == self.current {
            self.pending = None;
            self.pending_ticks = 0;
            return self.current;
        }

        if self.pending == Some(candidate) {
            self.pending_ticks += 1;
        } else {
            self.pending = Some(candidate);
            self.pending_ticks = 1;
        }

        if self.pending_ticks >= HOLD_TICKS {
            self.current = candidate;
            self.pending = None;
            self.pending_ticks = 0;
        }

        self.current
    }

    /// The currently adopted state.
    pub fn current(&self) -> DrowsinessState {
        self.current
    }

    /// Forget all held state; the classifier reports Awake again until a
    /// new candidate holds long enough.
    pub fn reset(&mut self) {
        self.current = DrowsinessState::Awake;
        self.pending = None;
        self.pending_ticks = 0;
    }
}
