//! Drowsewatch - on-device drowsiness scoring and sleep-state management.
//!
//! The engine estimates how drowsy a user is from a handful of derived
//! sensor signals, stabilizes the estimate into a discrete behavioral
//! state, drives device effects (dimming, volume, do-not-disturb) and a
//! low-power hibernation mode, and records each night as a session for
//! trend analytics.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Drowsewatch                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌─────────┐   ┌──────────┐   ┌────────────┐  │
//! │  │ Feature  │──▶│  Score  │──▶│ Smoother │──▶│ Classifier │  │
//! │  │ Snapshot │   │  Model  │   │ (EMA .3) │   │ (hysteresis)│ │
//! │  └──────────┘   └─────────┘   └──────────┘   └────────────┘  │
//! │        │                                           │         │
//! │        ▼                                           ▼         │
//! │  ┌──────────┐                              ┌────────────┐    │
//! │  │ Sensors  │◀──── pause/resume ───────────│ Controller │    │
//! │  │ (traits) │                              │ (tick loop)│    │
//! │  └──────────┘                              └────────────┘    │
//! │                                                  │           │
//! │                                      ┌───────────┴────────┐  │
//! │                                      ▼                    ▼  │
//! │                              ┌──────────────┐   ┌───────────┐│
//! │                              │   Session    │   │ Analytics ││
//! │                              │   Recorder   │──▶│   Store   ││
//! │                              └──────────────┘   └───────────┘│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use drowsewatch::config::Settings;
//! use drowsewatch::monitor::MonitoringController;
//! use drowsewatch::scoring::HeuristicScoreModel;
//! use drowsewatch::sensors::{NoopDeviceEffects, NoopFeatureSource, NoopSleepVerifier};
//! use drowsewatch::session::AnalyticsStore;
//!
//! let settings = Settings::load().unwrap_or_default();
//! let store = AnalyticsStore::new(Settings::history_path());
//!
//! let (controller, link) = MonitoringController::new(
//!     settings,
//!     Box::new(HeuristicScoreModel::new()),
//!     Box::new(NoopFeatureSource::new()),
//!     Box::new(NoopSleepVerifier::new()),
//!     Box::new(NoopDeviceEffects::new()),
//!     store,
//! );
//!
//! // Drive the loop on a runtime; observe via `link.status()`.
//! # drop((controller, link));
//! ```

pub mod config;
pub mod error;
pub mod monitor;
pub mod scoring;
pub mod sensors;
pub mod session;

// Re-export key types at crate root for convenience
pub use config::Settings;
pub use error::MonitorError;
pub use monitor::{Command, MonitorLink, MonitorPhase, MonitorStatus, MonitoringController};
pub use scoring::{
    DrowsinessState, FeatureSnapshot, HeuristicScoreModel, ScoreModel, ScoreResult, ScoreSmoother,
    StateClassifier,
};
pub use sensors::{DeviceEffects, FeatureSource, SleepVerdict, SleepVerifier};
pub use session::{AnalyticsStore, AnalyticsSummary, SessionRecorder, SleepSession, SleepTrend};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
