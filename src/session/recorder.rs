//! Session lifecycle tracking.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One closed (or closing) sleep-monitoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    /// Unique id for this session
    pub id: String,
    /// Calendar date the monitoring run started (local)
    pub date: NaiveDate,
    /// When sleep was confirmed, if it ever was
    pub sleep_start: Option<DateTime<Utc>>,
    /// When the user woke, if a wake was observed
    pub sleep_end: Option<DateTime<Utc>>,
    /// When monitoring began
    pub monitoring_start: DateTime<Utc>,
    /// When monitoring ended
    pub monitoring_end: Option<DateTime<Utc>>,
    /// Minutes asleep between confirmation and wake/close
    pub total_sleep_minutes: f64,
    /// Minutes between monitoring start and sleep confirmation
    pub minutes_to_sleep: f64,
    /// Awakenings observed after sleep was confirmed
    pub disturbance_count: u32,
    /// Mean of the scores recorded this session
    pub average_score: f64,
    /// Highest score recorded this session
    pub peak_score: f64,
    /// Whether hibernation was entered during this session
    pub hibernation_activated: bool,
    /// Camera verification attempts made this session
    pub verification_attempts: u32,
}

/// The session currently being recorded, plus its running accumulators.
#[derive(Debug, Clone)]
struct OpenSession {
    id: String,
    date: NaiveDate,
    monitoring_start: DateTime<Utc>,
    sleep_start: Option<DateTime<Utc>>,
    sleep_end: Option<DateTime<Utc>>,
    sleep_confirmed: bool,
    disturbance_count: u32,
    verification_attempts: u32,
    hibernation_activated: bool,
    score_sum: f64,
    score_count: u32,
    peak_score: f64,
}

/// Owns the single open session and applies every mutation to it.
///
/// At most one session is open at a time. `start` replaces whatever was
/// open without closing it, so callers close first.
#[derive(Debug, Default)]
pub struct SessionRecorder {
    open: Option<OpenSession>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session. Any previously open session is dropped, so the
    /// controller closes before restarting.
    pub fn start(&mut self, now: DateTime<Utc>) -> &str {
        let open = OpenSession {
            id: Uuid::new_v4().to_string(),
            date: now.with_timezone(&Local).date_naive(),
            monitoring_start: now,
            sleep_start: None,
            sleep_end: None,
            sleep_confirmed: false,
            disturbance_count: 0,
            verification_attempts: 0,
            hibernation_activated: false,
            score_sum: 0.0,
            score_count: 0,
            peak_score: 0.0,
        };
        self.open = Some(open);
        self.open.as_ref().map(|s| s.id.as_str()).unwrap_or("")
    }

    /// Open a session if none is open (used when monitoring re-enters the
    /// sleep window from standby).
    pub fn ensure_open(&mut self, now: DateTime<Utc>) {
        if self.open.is_none() {
            self.start(now);
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Whether sleep has been confirmed in the open session.
    pub fn sleep_confirmed(&self) -> bool {
        self.open.as_ref().map(|s| s.sleep_confirmed).unwrap_or(false)
    }

    /// Minutes the open session has been running.
    pub fn open_minutes(&self, now: DateTime<Utc>) -> Option<f64> {
        self.open
            .as_ref()
            .map(|s| (now - s.monitoring_start).num_seconds() as f64 / 60.0)
    }

    /// Mark sleep as confirmed, stamping the onset time once.
    pub fn confirm_sleep(&mut self, now: DateTime<Utc>) {
        if let Some(open) = self.open.as_mut() {
            if !open.sleep_confirmed {
                open.sleep_confirmed = true;
                open.sleep_start = Some(now);
            }
        }
    }

    /// Record the wake time. Only meaningful after sleep was confirmed.
    pub fn record_wake(&mut self, now: DateTime<Utc>) {
        if let Some(open) = self.open.as_mut() {
            if open.sleep_confirmed && open.sleep_end.is_none() {
                open.sleep_end = Some(now);
            }
        }
    }

    /// Count an awakening observed after sleep confirmation.
    pub fn record_disturbance(&mut self) {
        if let Some(open) = self.open.as_mut() {
            open.disturbance_count += 1;
        }
    }

    /// Count a camera verification attempt.
    pub fn record_verification_attempt(&mut self) {
        if let Some(open) = self.open.as_mut() {
            open.verification_attempts += 1;
        }
    }

    /// Flag that hibernation was entered during this session.
    pub fn mark_hibernation(&mut self) {
        if let Some(open) = self.open.as_mut() {
            open.hibernation_activated = true;
        }
    }

    /// Fold one tick's score into the session accumulators.
    pub fn record_score(&mut self, score: f64) {
        if let Some(open) = self.open.as_mut() {
            open.score_sum += score;
            open.score_count += 1;
            if score > open.peak_score {
                open.peak_score = score;
            }
        }
    }

    /// Close the open session and compute its derived metrics.
    ///
    /// Returns `None` when no session is open. Retention (the minimum-sleep
    /// rule) is the store's concern, not the recorder's.
    pub fn close(&mut self, now: DateTime<Utc>) -> Option<SleepSession> {
        let open = self.open.take()?;

        let (total_sleep_minutes, minutes_to_sleep) = match open.sleep_start {
            Some(sleep_start) if open.sleep_confirmed => {
                let asleep_until = open.sleep_end.unwrap_or(now);
                let total = (asleep_until - sleep_start).num_seconds() as f64 / 60.0;
                let to_sleep = (sleep_start - open.monitoring_start).num_seconds() as f64 / 60.0;
                (total.max(0.0), to_sleep.max(0.0))
            }
            _ => (0.0, 0.0),
        };

        let average_score = if open.score_count > 0 {
            open.score_sum / open.score_count as f64
        } else {
            0.0
        };

        Some(SleepSession {
            id: open.id,
            date: open.date,
            sleep_start: open.sleep_start,
            sleep_end: open.sleep_end,
            monitoring_start: open.monitoring_start,
            monitoring_end: Some(now),
            total_sleep_minutes,
            minutes_to_sleep,
            disturbance_count: open.disturbance_count,
            average_score,
            peak_score: open.peak_score,
            hibernation_activated: open.hibernation_activated,
            verification_attempts: open.verification_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        "2025-03-10T22:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_close_without_confirmation_has_zero_sleep() {
        let mut recorder = SessionRecorder::new();
        recorder.start(t0());
        recorder.record_score(40.0);
        recorder.record_score(60.0);

        let session = recorder.close(t0() + Duration::minutes(90)).unwrap();
        assert_eq!(session.total_sleep_minutes, 0.0);
        assert_eq!(session.minutes_to_sleep, 0.0);
        assert!(session.sleep_start.is_none());
        assert!((session.average_score - 50.0).abs() < 1e-9);
        assert_eq!(session.peak_score, 60.0);
        assert!(!recorder.is_open());
    }

    #[test]
    fn test_close_with_confirmed_sleep_and_wake() {
        let mut recorder = SessionRecorder::new();
        recorder.start(t0());
        recorder.confirm_sleep(t0() + Duration::minutes(25));
        recorder.record_wake(t0() + Duration::minutes(445));

        let session = recorder.close(t0() + Duration::minutes(450)).unwrap();
        assert!((session.total_sleep_minutes - 420.0).abs() < 1e-9);
        assert!((session.minutes_to_sleep - 25.0).abs() < 1e-9);
        assert!(session.sleep_end.is_some());
    }

    #[test]
    fn test_close_without_wake_uses_close_time() {
        let mut recorder = SessionRecorder::new();
        recorder.start(t0());
        recorder.confirm_sleep(t0() + Duration::minutes(30));

        let session = recorder.close(t0() + Duration::minutes(90)).unwrap();
        assert!((session.total_sleep_minutes - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_confirm_sleep_is_idempotent() {
        let mut recorder = SessionRecorder::new();
        recorder.start(t0());
        recorder.confirm_sleep(t0() + Duration::minutes(10));
        recorder.confirm_sleep(t0() + Duration::minutes(50));

        let session = recorder.close(t0() + Duration::minutes(60)).unwrap();
        assert_eq!(session.sleep_start, Some(t0() + Duration::minutes(10)));
    }

    #[test]
    fn test_counters_accumulate() {
        let mut recorder = SessionRecorder::new();
        recorder.start(t0());
        recorder.confirm_sleep(t0() + Duration::minutes(10));
        recorder.record_disturbance();
        recorder.record_disturbance();
        recorder.record_verification_attempt();
        recorder.mark_hibernation();

        let session = recorder.close(t0() + Duration::minutes(60)).unwrap();
        assert_eq!(session.disturbance_count, 2);
        assert_eq!(session.verification_attempts, 1);
        assert!(session.hibernation_activated);
    }

    #[test]
    fn test_ensure_open_keeps_existing_session() {
        let mut recorder = SessionRecorder::new();
        let id = recorder.start(t0()).to_string();
        recorder.ensure_open(t0() + Duration::minutes(5));

        let session = recorder.close(t0() + Duration::minutes(10)).unwrap();
        assert_eq!(session.id, id);
    }

    #[test]
    fn test_close_without_open_session() {
        let mut recorder = SessionRecorder::new();
        assert!(recorder.close(t0()).is_none());
    }
}
