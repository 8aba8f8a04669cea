//! File-backed session history.
//!
//! Sessions are stored one per line with `|`-separated fields in a fixed
//! order. The format is versioned by the encode/decode pair below; records
//! with too few fields (or unparseable values) are skipped on read rather
//! than failing the whole file.

use crate::error::MonitorError;
use crate::session::analytics::{self, AnalyticsSummary};
use crate::session::recorder::SleepSession;
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use std::path::{Path, PathBuf};

/// Version of the line format written by [`encode_record`].
pub const FORMAT_VERSION: u32 = 1;

/// Minimum confirmed sleep for a session to be worth keeping (minutes).
pub const MIN_SLEEP_MINUTES: f64 = 3.0;

/// Sessions older than this are pruned on every write (days).
pub const RETENTION_DAYS: i64 = 30;

const FIELD_DELIMITER: char = '|';
const FIELD_COUNT: usize = 13;

/// Encode one session as a format-v1 record line.
///
/// Field order: id, date, sleep-start, sleep-end, monitoring-start,
/// monitoring-end, total-sleep-minutes, minutes-to-sleep,
/// disturbance-count, average-score, peak-score, hibernation-activated,
/// camera-verification-count. Optional timestamps encode as empty fields.
/// The order is a compatibility contract; never reorder.
pub fn encode_record(session: &SleepSession) -> String {
    let opt_ts = |ts: &Option<DateTime<Utc>>| {
        ts.map(|t| t.to_rfc3339()).unwrap_or_default()
    };

    [
        session.id.clone(),
        session.date.format("%Y-%m-%d").to_string(),
        opt_ts(&session.sleep_start),
        opt_ts(&session.sleep_end),
        session.monitoring_start.to_rfc3339(),
        opt_ts(&session.monitoring_end),
        session.total_sleep_minutes.to_string(),
        session.minutes_to_sleep.to_string(),
        session.disturbance_count.to_string(),
        session.average_score.to_string(),
        session.peak_score.to_string(),
        if session.hibernation_activated { "1" } else { "0" }.to_string(),
        session.verification_attempts.to_string(),
    ]
    .join(&FIELD_DELIMITER.to_string())
}

/// Decode one format-v1 record line. Returns `None` for records that are
/// short or malformed; the caller skips those.
pub fn decode_record(line: &str) -> Option<SleepSession> {
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() < FIELD_COUNT {
        return None;
    }

    let parse_ts = |s: &str| -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    };
    let parse_opt_ts = |s: &str| -> Option<Option<DateTime<Utc>>> {
        if s.is_empty() {
            Some(None)
        } else {
            parse_ts(s).map(Some)
        }
    };

    Some(SleepSession {
        id: fields[0].to_string(),
        date: NaiveDate::parse_from_str(fields[1], "%Y-%m-%d").ok()?,
        sleep_start: parse_opt_ts(fields[2])?,
        sleep_end: parse_opt_ts(fields[3])?,
        monitoring_start: parse_ts(fields[4])?,
        monitoring_end: parse_opt_ts(fields[5])?,
        total_sleep_minutes: fields[6].parse().ok()?,
        minutes_to_sleep: fields[7].parse().ok()?,
        disturbance_count: fields[8].parse().ok()?,
        average_score: fields[9].parse().ok()?,
        peak_score: fields[10].parse().ok()?,
        hibernation_activated: fields[11] == "1",
        verification_attempts: fields[12].parse().ok()?,
    })
}

/// Persists closed sessions and computes rolling summaries.
#[derive(Debug, Clone)]
pub struct AnalyticsStore {
    path: PathBuf,
}

impl AnalyticsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a closed session.
    ///
    /// Returns `Ok(false)` when the session is discarded for falling under
    /// [`MIN_SLEEP_MINUTES`] (false-positive suppression). Sessions older
    /// than [`RETENTION_DAYS`] are pruned before every write.
    pub fn persist(&self, session: &SleepSession) -> Result<bool, MonitorError> {
        if session.total_sleep_minutes < MIN_SLEEP_MINUTES {
            return Ok(false);
        }

        let mut sessions = self.load_sessions()?;
        let cutoff = Local::now().date_naive() - Duration::days(RETENTION_DAYS);
        sessions.retain(|s| s.date >= cutoff);
        sessions.push(session.clone());

        self.write_all(&sessions)?;
        Ok(true)
    }

    /// Load every stored session, skipping malformed records.
    pub fn load_sessions(&self) -> Result<Vec<SleepSession>, MonitorError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(decode_record)
            .collect())
    }

    /// Sessions from the last `days` days, sorted by date.
    pub fn sessions_since(&self, days: i64) -> Result<Vec<SleepSession>, MonitorError> {
        let cutoff = Local::now().date_naive() - Duration::days(days);
        let mut sessions: Vec<SleepSession> = self
            .load_sessions()?
            .into_iter()
            .filter(|s| s.date >= cutoff)
            .collect();
        sessions.sort_by_key(|s| s.date);
        Ok(sessions)
    }

    /// Rolling summary over the last `days` days.
    pub fn summary(&self, days: i64) -> Result<AnalyticsSummary, MonitorError> {
        let sessions = self.sessions_since(days)?;
        Ok(analytics::summarize(&sessions))
    }

    fn write_all(&self, sessions: &[SleepSession]) -> Result<(), MonitorError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut content: String = sessions
            .iter()
            .map(encode_record)
            .collect::<Vec<_>>()
            .join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
