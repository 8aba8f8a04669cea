//! Rolling summaries and trend detection over stored sessions.

use crate::session::recorder::SleepSession;
use chrono::{DateTime, Local, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Minimum sessions before a trend can be called.
const MIN_TREND_SESSIONS: usize = 4;

/// How far the half-means must diverge to count as a trend (minutes).
const TREND_DELTA_MINUTES: f64 = 15.0;

/// Direction of sleep duration over the summarized range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepTrend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl std::fmt::Display for SleepTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SleepTrend::Improving => "improving",
            SleepTrend::Declining => "declining",
            SleepTrend::Stable => "stable",
            SleepTrend::InsufficientData => "insufficient data",
        };
        write!(f, "{name}")
    }
}

/// A single night referenced by the summary (best/worst).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightRef {
    pub date: NaiveDate,
    pub duration_minutes: f64,
}

/// Derived statistics over the sessions in range. Recomputed on demand,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub session_count: usize,
    pub average_duration_minutes: f64,
    pub average_minutes_to_sleep: f64,
    pub average_disturbances: f64,
    pub best_night: Option<NightRef>,
    pub worst_night: Option<NightRef>,
    pub trend: SleepTrend,
    /// Mean bedtime as "HH:MM", over sessions with a confirmed sleep start
    pub average_bedtime: Option<String>,
    /// Mean wake time as "HH:MM", over sessions with an observed wake
    pub average_wake_time: Option<String>,
}

impl AnalyticsSummary {
    /// The all-zero summary reported when no sessions are in range.
    pub fn empty() -> Self {
        Self {
            session_count: 0,
            average_duration_minutes: 0.0,
            average_minutes_to_sleep: 0.0,
            average_disturbances: 0.0,
            best_night: None,
            worst_night: None,
            trend: SleepTrend::InsufficientData,
            average_bedtime: None,
            average_wake_time: None,
        }
    }
}

/// Summarize sessions (assumed sorted by date ascending).
pub fn summarize(sessions: &[SleepSession]) -> AnalyticsSummary {
    if sessions.is_empty() {
        return AnalyticsSummary::empty();
    }

    let durations: Vec<f64> = sessions.iter().map(|s| s.total_sleep_minutes).collect();

    let best = sessions
        .iter()
        .max_by(|a, b| a.total_sleep_minutes.total_cmp(&b.total_sleep_minutes));
    let worst = sessions
        .iter()
        .min_by(|a, b| a.total_sleep_minutes.total_cmp(&b.total_sleep_minutes));

    AnalyticsSummary {
        session_count: sessions.len(),
        average_duration_minutes: durations.iter().mean(),
        average_minutes_to_sleep: sessions.iter().map(|s| s.minutes_to_sleep).mean(),
        average_disturbances: sessions.iter().map(|s| s.disturbance_count as f64).mean(),
        best_night: best.map(|s| NightRef {
            date: s.date,
            duration_minutes: s.total_sleep_minutes,
        }),
        worst_night: worst.map(|s| NightRef {
            date: s.date,
            duration_minutes: s.total_sleep_minutes,
        }),
        trend: detect_trend(&durations),
        average_bedtime: mean_clock_time(sessions.iter().filter_map(|s| s.sleep_start)),
        average_wake_time: mean_clock_time(sessions.iter().filter_map(|s| s.sleep_end)),
    }
}

/// Compare the mean duration of the later half against the earlier half.
/// The later half takes the extra session when the count is odd.
pub fn detect_trend(durations_by_date: &[f64]) -> SleepTrend {
    if durations_by_date.len() < MIN_TREND_SESSIONS {
        return SleepTrend::InsufficientData;
    }

    let split = durations_by_date.len() / 2;
    let earlier = durations_by_date[..split].iter().mean();
    let later = durations_by_date[split..].iter().mean();

    if later > earlier + TREND_DELTA_MINUTES {
        SleepTrend::Improving
    } else if later < earlier - TREND_DELTA_MINUTES {
        SleepTrend::Declining
    } else {
        SleepTrend::Stable
    }
}

/// Mean of local clock times, as minutes since midnight, rendered "HH:MM".
/// Returns `None` when the iterator is empty.
fn mean_clock_time(timestamps: impl Iterator<Item = DateTime<Utc>>) -> Option<String> {
    let minutes: Vec<f64> = timestamps
        .map(|ts| {
            let local = ts.with_timezone(&Local);
            (local.hour() * 60 + local.minute()) as f64
        })
        .collect();

    if minutes.is_empty() {
        return None;
    }

    let mean = minutes.iter().mean().rem_euclid(24.0 * 60.0);
    let total = mean.round() as u32 % (24 * 60);
    Some(format!("{:02}:{:02}", total / 60, total % 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn session(day_offset: i64, sleep_minutes: f64) -> SleepSession {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap() + Duration::days(day_offset);
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 22, 0, 0).unwrap() + Duration::days(day_offset);
        SleepSession {
            id: Uuid::new_v4().to_string(),
            date,
            sleep_start: Some(start + Duration::minutes(20)),
            sleep_end: Some(start + Duration::minutes(20 + sleep_minutes as i64)),
            monitoring_start: start,
            monitoring_end: Some(start + Duration::minutes(30 + sleep_minutes as i64)),
            total_sleep_minutes: sleep_minutes,
            minutes_to_sleep: 20.0,
            disturbance_count: 2,
            average_score: 70.0,
            peak_score: 85.0,
            hibernation_activated: false,
            verification_attempts: 0,
        }
    }

    #[test]
    fn test_trend_improving() {
        assert_eq!(
            detect_trend(&[300.0, 300.0, 400.0, 400.0]),
            SleepTrend::Improving
        );
    }

    #[test]
    fn test_trend_declining() {
        assert_eq!(
            detect_trend(&[400.0, 400.0, 300.0, 300.0]),
            SleepTrend::Declining
        );
    }

    #[test]
    fn test_trend_stable() {
        assert_eq!(
            detect_trend(&[350.0, 350.0, 355.0, 345.0]),
            SleepTrend::Stable
        );
    }

    #[test]
    fn test_trend_needs_four_sessions() {
        assert_eq!(
            detect_trend(&[100.0, 500.0, 500.0]),
            SleepTrend::InsufficientData
        );
        assert_eq!(detect_trend(&[]), SleepTrend::InsufficientData);
    }

    #[test]
    fn test_trend_odd_count_gives_later_half_the_extra() {
        // Earlier = [300, 300], later = [300, 400, 400] -> +66.7 minutes
        assert_eq!(
            detect_trend(&[300.0, 300.0, 300.0, 400.0, 400.0]),
            SleepTrend::Improving
        );
    }

    #[test]
    fn test_empty_summary_is_zero_valued() {
        let summary = summarize(&[]);
        assert_eq!(summary.session_count, 0);
        assert_eq!(summary.average_duration_minutes, 0.0);
        assert_eq!(summary.trend, SleepTrend::InsufficientData);
        assert!(summary.best_night.is_none());
        assert!(summary.average_bedtime.is_none());
    }

    #[test]
    fn test_summary_best_and_worst_night() {
        let sessions = vec![session(0, 300.0), session(1, 480.0), session(2, 360.0)];
        let summary = summarize(&sessions);

        assert_eq!(summary.session_count, 3);
        assert!((summary.average_duration_minutes - 380.0).abs() < 1e-9);
        assert_eq!(summary.best_night.unwrap().duration_minutes, 480.0);
        assert_eq!(summary.worst_night.unwrap().duration_minutes, 300.0);
        // Fewer than four sessions: no trend call
        assert_eq!(summary.trend, SleepTrend::InsufficientData);
    }

    #[test]
    fn test_summary_averages_disturbances() {
        let mut a = session(0, 400.0);
        a.disturbance_count = 1;
        let mut b = session(1, 400.0);
        b.disturbance_count = 3;

        let summary = summarize(&[a, b]);
        assert!((summary.average_disturbances - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_sessions_without_wake_are_excluded_from_wake_average() {
        let mut a = session(0, 400.0);
        a.sleep_end = None;
        let b = session(1, 400.0);

        let summary = summarize(&[a, b.clone()]);
        // Only b contributes; its wake time round-trips exactly
        let expected = mean_clock_time([b.sleep_end.unwrap()].into_iter());
        assert_eq!(summary.average_wake_time, expected);
        assert!(summary.average_wake_time.is_some());
    }

    #[test]
    fn test_mean_clock_time_formats() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let formatted = mean_clock_time([ts].into_iter()).unwrap();
        assert_eq!(formatted.len(), 5);
        assert_eq!(&formatted[2..3], ":");
    }
}
