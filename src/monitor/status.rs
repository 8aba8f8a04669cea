//! Observable monitoring state.

use crate::scoring::DrowsinessState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of the monitoring loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    /// No loop is running
    #[default]
    Stopped,
    /// Normal 15 s polling inside the sleep window
    Active,
    /// Reduced 5 min polling with sensors paused
    Hibernating,
    /// Loop alive but outside the configured sleep window
    Standby,
}

impl std::fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MonitorPhase::Stopped => "stopped",
            MonitorPhase::Active => "active",
            MonitorPhase::Hibernating => "hibernating",
            MonitorPhase::Standby => "standby",
        };
        write!(f, "{name}")
    }
}

/// Snapshot of the loop's externally visible state.
///
/// Published once per tick through a watch channel; the controller is the
/// only writer, observers clone freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub phase: MonitorPhase,
    /// Latest smoothed score (0 before the first scoring tick)
    pub score: f64,
    /// Latest classified state
    pub state: DrowsinessState,
    /// Whether a monitoring run is alive (any phase but Stopped)
    pub monitoring: bool,
    pub updated_at: DateTime<Utc>,
}

impl MonitorStatus {
    pub fn stopped(now: DateTime<Utc>) -> Self {
        Self {
            phase: MonitorPhase::Stopped,
            score: 0.0,
            state: DrowsinessState::Awake,
            monitoring: false,
            updated_at: now,
        }
    }
}
