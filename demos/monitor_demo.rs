//! Scripted walk through one simulated night.
//!
//! Drives the controller tick-by-tick with fabricated timestamps and a
//! feature script that ramps from "reading in bed" to "fast asleep", then
//! prints the state the engine reports at each step.
//!
//! Run with: cargo run --example monitor_demo

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use drowsewatch::config::Settings;
use drowsewatch::monitor::MonitoringController;
use drowsewatch::scoring::HeuristicScoreModel;
use drowsewatch::sensors::{FeatureSource, NoopDeviceEffects, NoopSleepVerifier};
use drowsewatch::session::AnalyticsStore;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Nightstand {
    // Minutes into the night, shared with the controller-owned copy
    elapsed: Arc<Mutex<f64>>,
}

impl FeatureSource for Nightstand {
    fn ambient_lux(&mut self) -> Option<f64> {
        // Bedside lamp off after 10 minutes
        let elapsed = *self.elapsed.lock().unwrap();
        Some(if elapsed < 10.0 { 80.0 } else { 2.0 })
    }

    fn stillness(&mut self) -> Option<f64> {
        let elapsed = *self.elapsed.lock().unwrap();
        Some((elapsed / 20.0).min(1.0))
    }

    fn screen_off_minutes(&mut self) -> Option<f64> {
        let elapsed = *self.elapsed.lock().unwrap();
        Some((elapsed - 5.0).max(0.0))
    }

    fn heart_rate_bpm(&mut self) -> Option<f64> {
        let elapsed = *self.elapsed.lock().unwrap();
        Some(68.0 - elapsed.min(20.0))
    }

    fn ambient_noise_db(&mut self) -> Option<f64> {
        None
    }

    fn screen_on_secs(&mut self) -> Option<f64> {
        None
    }

    fn movement_magnitude(&mut self) -> Option<f64> {
        None
    }
}

fn at(minutes_after_start: f64) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(2025, 6, 15, 23, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
        + Duration::seconds((minutes_after_start * 60.0) as i64)
}

fn main() {
    let settings = Settings {
        camera_verification: false,
        ..Settings::default()
    };

    let nightstand = Nightstand::default();
    let elapsed = nightstand.elapsed.clone();

    let history = std::env::temp_dir().join("drowsewatch-demo.log");
    let _ = std::fs::remove_file(&history);
    let store = AnalyticsStore::new(history);

    let (mut controller, link) = MonitoringController::new(
        settings,
        Box::new(HeuristicScoreModel::new()),
        Box::new(nightstand),
        Box::new(NoopSleepVerifier::new()),
        Box::new(NoopDeviceEffects::new()),
        store.clone(),
    );

    println!("Simulating one night, one tick per 15 s of night time\n");
    controller.begin(at(0.0));

    for tick in 1..=120 {
        let minutes = tick as f64 * 0.25;
        *elapsed.lock().unwrap() = minutes;

        controller.tick(at(minutes)).expect("tick failed");
        let status = link.status();

        if tick % 8 == 0 {
            println!(
                "  +{:>4.0} min  score {:>5.1}  state {:<15} phase {}",
                minutes, status.score, status.state.to_string(), status.phase
            );
        }
    }

    controller.shutdown(at(480.0));

    println!("\nNight over. Stored sessions:");
    for session in store.load_sessions().expect("history unreadable") {
        println!(
            "  {}: {:.0} min asleep, peak score {:.1}, hibernated: {}",
            session.date,
            session.total_sleep_minutes,
            session.peak_score,
            session.hibernation_activated
        );
    }
}
