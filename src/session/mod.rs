//! Session tracking and nightly analytics.
//!
//! A session covers one monitoring run from start to close. The recorder
//! owns the open session and is the only place it mutates; the store keeps
//! the bounded history on disk and derives rolling summaries from it.

pub mod analytics;
pub mod recorder;
pub mod store;

pub use analytics::{AnalyticsSummary, NightRef, SleepTrend};
pub use recorder::{SessionRecorder, SleepSession};
pub use store::AnalyticsStore;
