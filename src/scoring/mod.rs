//! Drowsiness scoring pipeline.
//!
//! One tick flows snapshot -> model -> adaptive multiplier -> smoother ->
//! classifier. The model is a fixed-weight heuristic; the smoother and
//! classifier keep the small amount of state that turns a noisy per-tick
//! score into a stable behavioral state.

pub mod classifier;
pub mod model;
pub mod smoother;
pub mod types;

pub use classifier::StateClassifier;
pub use model::{HeuristicScoreModel, ScoreModel};
pub use smoother::ScoreSmoother;
pub use types::{DrowsinessState, FeatureSnapshot, ScoreResult};
