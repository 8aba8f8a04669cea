//! Integration tests driving the engine through its public API.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use drowsewatch::config::Settings;
use drowsewatch::monitor::{MonitorPhase, MonitoringController};
use drowsewatch::scoring::HeuristicScoreModel;
use drowsewatch::sensors::{
    DeviceEffects, FeatureSource, NoopDeviceEffects, NoopSleepVerifier, SleepVerdict,
    SleepVerifier,
};
use drowsewatch::session::{AnalyticsStore, SleepSession, SleepTrend};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Feature source scripted from shared state so tests can steer a running
/// controller.
#[derive(Clone, Default)]
struct SharedSource {
    state: Arc<Mutex<SourceState>>,
}

#[derive(Default)]
struct SourceState {
    lux: Option<f64>,
    stillness: Option<f64>,
    heart_rate: Option<f64>,
    screen_off: Option<f64>,
    movement: Option<f64>,
}

impl FeatureSource for SharedSource {
    fn ambient_lux(&mut self) -> Option<f64> {
        self.state.lock().unwrap().lux
    }
    fn stillness(&mut self) -> Option<f64> {
        self.state.lock().unwrap().stillness
    }
    fn screen_off_minutes(&mut self) -> Option<f64> {
        self.state.lock().unwrap().screen_off
    }
    fn heart_rate_bpm(&mut self) -> Option<f64> {
        self.state.lock().unwrap().heart_rate
    }
    fn ambient_noise_db(&mut self) -> Option<f64> {
        None
    }
    fn screen_on_secs(&mut self) -> Option<f64> {
        None
    }
    fn movement_magnitude(&mut self) -> Option<f64> {
        self.state.lock().unwrap().movement
    }
}

impl SharedSource {
    fn sleeping_conditions(&self) {
        let mut state = self.state.lock().unwrap();
        state.lux = Some(1.0);
        state.stillness = Some(1.0);
        state.heart_rate = Some(42.0);
        state.screen_off = Some(45.0);
        state.movement = None;
    }

    fn movement(&self, magnitude: f64) {
        self.state.lock().unwrap().movement = Some(magnitude);
    }
}

fn temp_store() -> AnalyticsStore {
    AnalyticsStore::new(
        std::env::temp_dir()
            .join("drowsewatch-integration")
            .join(format!("{}.log", Uuid::new_v4())),
    )
}

/// A UTC instant whose local wall-clock reads 2025-06-15 (or +1 day)
/// hh:mm:ss, keeping window gating machine-independent.
fn local(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(2025, 6, day, hour, minute, second)
        .unwrap()
        .with_timezone(&Utc)
}

fn stored_session(date: NaiveDate, sleep_minutes: f64) -> SleepSession {
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 22, 0, 0).unwrap();
    SleepSession {
        id: Uuid::new_v4().to_string(),
        date,
        sleep_start: Some(start + Duration::minutes(15)),
        sleep_end: Some(start + Duration::minutes(15 + sleep_minutes as i64)),
        monitoring_start: start,
        monitoring_end: Some(start + Duration::minutes(20 + sleep_minutes as i64)),
        total_sleep_minutes: sleep_minutes,
        minutes_to_sleep: 15.0,
        disturbance_count: 0,
        average_score: 75.0,
        peak_score: 90.0,
        hibernation_activated: false,
        verification_attempts: 0,
    }
}

#[test]
fn full_night_reaches_hibernation_and_persists_the_session() {
    let settings = Settings {
        camera_verification: false,
        ..Settings::default()
    };
    let source = SharedSource::default();
    source.sleeping_conditions();
    let store = temp_store();

    let (mut controller, link) = MonitoringController::new(
        settings,
        Box::new(HeuristicScoreModel::new()),
        Box::new(source.clone()),
        Box::new(NoopSleepVerifier::new()),
        Box::new(NoopDeviceEffects::new()),
        store.clone(),
    );

    controller.begin(local(15, 22, 30, 0));

    // Twenty sustained high-score ticks put the loop into hibernation.
    let mut now = local(15, 22, 30, 0);
    for _ in 0..20 {
        now += Duration::seconds(15);
        controller.tick(now).unwrap();
    }
    assert_eq!(link.status().phase, MonitorPhase::Hibernating);
    assert!(link.status().monitoring);

    // Early-morning movement wakes the loop out of hibernation.
    source.movement(3.5);
    controller.tick(local(16, 6, 15, 0)).unwrap();
    assert_eq!(link.status().phase, MonitorPhase::Active);

    controller.shutdown(local(16, 6, 30, 0));
    assert_eq!(link.status().phase, MonitorPhase::Stopped);
    assert!(!link.status().monitoring);

    let sessions = store.load_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    let night = &sessions[0];
    assert!(night.hibernation_activated);
    assert!(night.sleep_start.is_some());
    // Confirmed around 22:35, closed 06:30 next morning
    assert!(night.total_sleep_minutes > 400.0);
    assert!(night.peak_score >= 70.0);
}

#[test]
fn camera_verdict_confirms_sleep_through_the_public_api() {
    struct SleepyCamera;
    impl SleepVerifier for SleepyCamera {
        fn available(&self) -> bool {
            true
        }
        fn verify(&mut self, _duration: std::time::Duration) -> Option<SleepVerdict> {
            Some(SleepVerdict {
                is_sleeping: true,
                confidence: 0.85,
                eye_open_probability: 0.1,
                face_detected: true,
            })
        }
    }

    let source = SharedSource::default();
    source.sleeping_conditions();
    let store = temp_store();

    let (mut controller, _link) = MonitoringController::new(
        Settings::default(),
        Box::new(HeuristicScoreModel::new()),
        Box::new(source),
        Box::new(SleepyCamera),
        Box::new(NoopDeviceEffects::new()),
        store.clone(),
    );

    controller.begin(local(15, 23, 0, 0));
    let mut now = local(15, 23, 0, 0);
    for _ in 0..5 {
        now += Duration::seconds(15);
        controller.tick(now).unwrap();
    }

    // Ten minutes of confirmed sleep clears the retention floor.
    controller.shutdown(local(15, 23, 15, 0));

    let sessions = store.load_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].verification_attempts, 1);
    assert!(sessions[0].total_sleep_minutes >= 3.0);
}

#[test]
fn too_short_a_nap_is_never_persisted() {
    let source = SharedSource::default();
    source.sleeping_conditions();
    let store = temp_store();

    struct InstantCamera;
    impl SleepVerifier for InstantCamera {
        fn available(&self) -> bool {
            true
        }
        fn verify(&mut self, _duration: std::time::Duration) -> Option<SleepVerdict> {
            Some(SleepVerdict {
                is_sleeping: true,
                confidence: 0.8,
                eye_open_probability: 0.1,
                face_detected: true,
            })
        }
    }

    let (mut controller, _link) = MonitoringController::new(
        Settings::default(),
        Box::new(HeuristicScoreModel::new()),
        Box::new(source),
        Box::new(InstantCamera),
        Box::new(NoopDeviceEffects::new()),
        store.clone(),
    );

    controller.begin(local(15, 23, 0, 0));
    let mut now = local(15, 23, 0, 0);
    for _ in 0..4 {
        now += Duration::seconds(15);
        controller.tick(now).unwrap();
    }

    // Sleep confirmed ~23:00:45; closing two minutes later stays under
    // the three-minute floor.
    controller.shutdown(local(15, 23, 2, 30));
    assert!(store.load_sessions().unwrap().is_empty());
}

#[test]
fn summary_reports_an_improving_trend() {
    let store = temp_store();
    let today = Local::now().date_naive();

    for (offset, minutes) in [(4, 300.0), (3, 300.0), (2, 400.0), (1, 400.0)] {
        store
            .persist(&stored_session(today - Duration::days(offset), minutes))
            .unwrap();
    }

    let summary = store.summary(7).unwrap();
    assert_eq!(summary.session_count, 4);
    assert_eq!(summary.trend, SleepTrend::Improving);
    assert!((summary.average_duration_minutes - 350.0).abs() < 1e-9);
    assert_eq!(summary.best_night.unwrap().duration_minutes, 400.0);
    assert!(summary.average_bedtime.is_some());
}

#[test]
fn summary_with_no_history_is_zeroed() {
    let store = temp_store();
    let summary = store.summary(7).unwrap();
    assert_eq!(summary.session_count, 0);
    assert_eq!(summary.trend, SleepTrend::InsufficientData);
    assert_eq!(summary.average_duration_minutes, 0.0);
}

#[tokio::test]
async fn run_loop_stops_cleanly_on_request() {
    struct CountingEffects {
        restores: Arc<Mutex<u32>>,
    }
    impl DeviceEffects for CountingEffects {
        fn apply_brightness(&mut self, _level: f64, _max_level: u32) {}
        fn apply_volume(&mut self, _level: f64) {}
        fn set_do_not_disturb(&mut self, _enabled: bool) {}
        fn save_current(&mut self) {}
        fn restore_saved(&mut self) {
            *self.restores.lock().unwrap() += 1;
        }
    }

    let restores = Arc::new(Mutex::new(0));
    let (controller, link) = MonitoringController::new(
        Settings::default(),
        Box::new(HeuristicScoreModel::new()),
        Box::new(SharedSource::default()),
        Box::new(NoopSleepVerifier::new()),
        Box::new(CountingEffects {
            restores: restores.clone(),
        }),
        temp_store(),
    );

    let task = tokio::spawn(controller.run());
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(link.status().monitoring);
    link.stop();
    task.await.unwrap();

    assert_eq!(link.status().phase, MonitorPhase::Stopped);
    assert!(!link.status().monitoring);
    // Teardown restored the saved device settings
    assert!(*restores.lock().unwrap() >= 1);
}
