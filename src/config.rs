//! Settings for the drowsewatch engine.

use crate::error::MonitorError;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// User-facing settings for a monitoring run.
///
/// The engine treats these as read-only; updates flow in between ticks
/// through the controller's command channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Master switch for monitoring
    pub enabled: bool,

    /// Sleep window start (hour 0-23)
    pub window_start_hour: u32,
    /// Sleep window start (minute 0-59)
    pub window_start_minute: u32,
    /// Sleep window end (hour 0-23)
    pub window_end_hour: u32,
    /// Sleep window end (minute 0-59)
    pub window_end_minute: u32,

    /// Whether the engine may adjust screen brightness
    pub adjust_brightness: bool,
    /// Brightness target for confirmed sleep (0-1)
    pub brightness_target: f64,
    /// Maximum brightness level of the device backlight
    pub max_brightness_level: u32,

    /// Whether the engine may adjust media volume
    pub adjust_volume: bool,
    /// Volume target for confirmed sleep (0-1)
    pub volume_target: f64,

    /// Whether the engine may enable do-not-disturb
    pub enable_dnd: bool,

    /// Score at or above which the user counts as drowsy
    pub drowsy_threshold: u32,
    /// Score at or above which the user counts as likely sleeping
    pub sleeping_threshold: u32,

    /// Whether camera sleep verification may run
    pub camera_verification: bool,
    /// How long a single camera verification observes, in seconds
    pub verification_duration_secs: u64,

    /// Opt-in for ambient noise sampling
    pub audio_sampling: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            window_start_hour: 22,
            window_start_minute: 0,
            window_end_hour: 7,
            window_end_minute: 0,
            adjust_brightness: true,
            brightness_target: 0.1,
            max_brightness_level: 255,
            adjust_volume: true,
            volume_target: 0.2,
            enable_dnd: true,
            drowsy_threshold: 45,
            sleeping_threshold: 70,
            camera_verification: true,
            verification_duration_secs: 10,
            audio_sampling: false,
        }
    }
}

impl Settings {
    /// Load settings from the default location.
    pub fn load() -> Result<Self, MonitorError> {
        let path = Self::config_path();

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| MonitorError::ConfigError(e.to_string()))?;
            let settings: Settings = serde_json::from_str(&content)
                .map_err(|e| MonitorError::ConfigError(e.to_string()))?;
            Ok(settings)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to the default location.
    pub fn save(&self) -> Result<(), MonitorError> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MonitorError::ConfigError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content).map_err(|e| MonitorError::ConfigError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the settings file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drowsewatch")
            .join("settings.json")
    }

    /// Default location of the session history file.
    pub fn history_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drowsewatch")
            .join("sessions.log")
    }

    /// Check the settings for inconsistencies the engine itself does not
    /// guard against.
    ///
    /// Classification compares against the sleeping threshold first, so a
    /// sleeping threshold at or below the drowsy threshold makes the drowsy
    /// band unreachable. Callers that accept user input should reject such
    /// settings here.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.sleeping_threshold <= self.drowsy_threshold {
            return Err(MonitorError::InvalidSettings(format!(
                "sleeping threshold ({}) must exceed drowsy threshold ({})",
                self.sleeping_threshold, self.drowsy_threshold
            )));
        }
        if self.window_start_hour > 23
            || self.window_end_hour > 23
            || self.window_start_minute > 59
            || self.window_end_minute > 59
        {
            return Err(MonitorError::InvalidSettings(
                "sleep window must use a valid 24h clock time".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.brightness_target)
            || !(0.0..=1.0).contains(&self.volume_target)
        {
            return Err(MonitorError::InvalidSettings(
                "brightness and volume targets must lie in 0..=1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sleep window start as a clock time.
    pub fn window_start(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.window_start_hour, self.window_start_minute, 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Sleep window end as a clock time.
    pub fn window_end(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.window_end_hour, self.window_end_minute, 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Whether the given clock time falls inside the sleep window.
    ///
    /// Windows that wrap midnight (the usual case, e.g. 22:00-07:00) are
    /// handled; a zero-length window matches nothing.
    pub fn in_sleep_window(&self, time: NaiveTime) -> bool {
        let start = self.window_start();
        let end = self.window_end();

        if start <= end {
            time >= start && time < end
        } else {
            time >= start || time < end
        }
    }

    /// Proximity of the given clock time to the middle of the sleep window,
    /// as a 0-1 score (1 at the window center, 0 at and beyond the edges).
    pub fn window_proximity(&self, time: NaiveTime) -> f64 {
        if !self.in_sleep_window(time) {
            return 0.0;
        }

        let minutes = |t: NaiveTime| {
            t.signed_duration_since(NaiveTime::MIN).num_minutes() as f64
        };
        let day = 24.0 * 60.0;

        let start = minutes(self.window_start());
        let mut end = minutes(self.window_end());
        let mut t = minutes(time);
        if end <= start {
            end += day;
        }
        if t < start {
            t += day;
        }

        let half = (end - start) / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        let center = start + half;
        (1.0 - (t - center).abs() / half).clamp(0.0, 1.0)
    }
}
