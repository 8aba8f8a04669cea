//! Exponential smoothing of per-tick scores.

/// Smoothing factor: weight of the newest adjusted score.
const ALPHA: f64 = 0.3;

/// Exponential moving average over successive adjusted scores.
///
/// Holds only the previous smoothed value. The first score after a reset
/// passes through unchanged.
#[derive(Debug, Clone, Default)]
pub struct ScoreSmoother {
    previous: Option<f64>,
}

impl ScoreSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the next adjusted score into the moving average.
    pub fn smooth(&mut self, adjusted: f64) -> f64 {
        let smoothed = match self.previous {
            Some(prev) => ALPHA * adjusted + (1.0 - ALPHA) * prev,
            None => adjusted,
        };
        self.previous = Some(smoothed);
        smoothed
    }

    /// Clear the held value. The next score passes through unchanged.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// The last smoothed value, if any tick has run since the last reset.
    pub fn current(&self) -> Option<f64> {
        self.previous
    }
}
