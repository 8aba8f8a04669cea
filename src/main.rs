//! Drowsewatch CLI
//!
//! Runs the monitoring engine headless and reports on recorded sessions.

use anyhow::Context;
use clap::{Parser, Subcommand};
use drowsewatch::config::Settings;
use drowsewatch::monitor::MonitoringController;
use drowsewatch::scoring::HeuristicScoreModel;
use drowsewatch::sensors::{NoopDeviceEffects, NoopFeatureSource, NoopSleepVerifier};
use drowsewatch::session::AnalyticsStore;
use drowsewatch::VERSION;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drowsewatch")]
#[command(version = VERSION)]
#[command(about = "On-device drowsiness scoring and sleep-state management", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start monitoring in the foreground
    Start {
        /// Session history file (defaults to the data directory)
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Show current settings and stored session count
    Status,

    /// Summarize the last N days of sessions
    Summary {
        /// Days of history to include
        #[arg(long, short, default_value = "7")]
        days: i64,
    },

    /// Show resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { history } => cmd_start(history).await,
        Commands::Status => cmd_status(),
        Commands::Summary { days } => cmd_summary(days),
        Commands::Config => cmd_config(),
    }
}

async fn cmd_start(history: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    settings.validate().context("settings rejected")?;

    if !settings.enabled {
        anyhow::bail!("monitoring is disabled in settings");
    }

    println!("Drowsewatch v{VERSION}");
    println!(
        "  Sleep window: {:02}:{:02} - {:02}:{:02}",
        settings.window_start_hour,
        settings.window_start_minute,
        settings.window_end_hour,
        settings.window_end_minute
    );
    println!(
        "  Thresholds: drowsy {} / sleeping {}",
        settings.drowsy_threshold, settings.sleeping_threshold
    );
    println!(
        "  Camera verification: {}",
        if settings.camera_verification {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Audio sampling: {}",
        if settings.audio_sampling {
            "enabled"
        } else {
            "disabled"
        }
    );

    let history_path = history.unwrap_or_else(Settings::history_path);
    println!("  Session history: {}", history_path.display());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let store = AnalyticsStore::new(history_path);

    // Headless collaborators; platform integrations implement the sensor
    // traits and slot in here.
    let (controller, link) = MonitoringController::new(
        settings,
        Box::new(HeuristicScoreModel::new()),
        Box::new(NoopFeatureSource::new()),
        Box::new(NoopSleepVerifier::new()),
        Box::new(NoopDeviceEffects::new()),
        store,
    );

    let stop_link = link.clone();
    ctrlc::set_handler(move || {
        stop_link.stop();
    })
    .context("failed to install Ctrl+C handler")?;

    let loop_task = tokio::spawn(controller.run());
    loop_task.await.context("monitoring loop panicked")?;

    let status = link.status();
    println!();
    println!("Stopped in phase: {}", status.phase);

    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    let store = AnalyticsStore::new(Settings::history_path());

    println!("Drowsewatch Status");
    println!("==================");
    println!();
    println!(
        "Monitoring enabled: {}",
        if settings.enabled { "yes" } else { "no" }
    );
    println!(
        "Sleep window: {:02}:{:02} - {:02}:{:02}",
        settings.window_start_hour,
        settings.window_start_minute,
        settings.window_end_hour,
        settings.window_end_minute
    );

    if let Err(e) = settings.validate() {
        println!("Warning: {e}");
    }

    match store.load_sessions() {
        Ok(sessions) => {
            println!("Stored sessions: {}", sessions.len());
            if let Some(last) = sessions.iter().max_by_key(|s| s.date) {
                println!(
                    "Last night: {} - {:.0} min asleep, {} disturbance(s)",
                    last.date, last.total_sleep_minutes, last.disturbance_count
                );
            }
        }
        Err(e) => println!("Could not read session history: {e}"),
    }

    Ok(())
}

fn cmd_summary(days: i64) -> anyhow::Result<()> {
    let store = AnalyticsStore::new(Settings::history_path());
    let summary = store.summary(days).context("failed to summarize history")?;

    println!("Sleep Summary (last {days} days)");
    println!("================================");
    println!();
    println!("Sessions: {}", summary.session_count);
    println!(
        "Average sleep: {:.0} min",
        summary.average_duration_minutes
    );
    println!(
        "Average time to fall asleep: {:.0} min",
        summary.average_minutes_to_sleep
    );
    println!("Average disturbances: {:.1}", summary.average_disturbances);

    if let Some(best) = &summary.best_night {
        println!("Best night: {} ({:.0} min)", best.date, best.duration_minutes);
    }
    if let Some(worst) = &summary.worst_night {
        println!(
            "Worst night: {} ({:.0} min)",
            worst.date, worst.duration_minutes
        );
    }
    if let Some(bedtime) = &summary.average_bedtime {
        println!("Average bedtime: {bedtime}");
    }
    if let Some(wake) = &summary.average_wake_time {
        println!("Average wake time: {wake}");
    }
    println!("Trend: {}", summary.trend);

    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Settings file: {}", Settings::config_path().display());
    println!("Session history: {}", Settings::history_path().display());
    println!();
    println!("{}", serde_json::to_string_pretty(&settings)?);

    Ok(())
}
