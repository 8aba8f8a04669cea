//! The top-level monitoring state machine.

use crate::config::Settings;
use crate::error::MonitorError;
use crate::monitor::status::{MonitorPhase, MonitorStatus};
use crate::scoring::types::DEFAULT_HEART_RATE_BPM;
use crate::scoring::{
    DrowsinessState, FeatureSnapshot, ScoreModel, ScoreResult, ScoreSmoother, StateClassifier,
};
use crate::sensors::{DeviceEffects, FeatureSource, SleepVerifier};
use crate::session::{AnalyticsStore, SessionRecorder};
use chrono::{DateTime, Local, NaiveTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Polling cadence while Active or Standby.
const ACTIVE_TICK: Duration = Duration::from_secs(15);

/// Polling cadence while Hibernating.
const HIBERNATE_TICK: Duration = Duration::from_secs(300);

/// Continuous screen-on time that counts as a wake signal (seconds).
const WAKE_SCREEN_ON_SECS: f64 = 60.0;

/// Movement magnitude that counts as a wake signal.
const WAKE_MOVEMENT_THRESHOLD: f64 = 2.0;

/// Consecutive at-or-above-sleeping-threshold ticks before hibernation.
const HIBERNATE_AFTER_TICKS: u32 = 20;

/// Consecutive high ticks that confirm sleep when verification is
/// unavailable.
const FALLBACK_CONFIRM_TICKS: u32 = 20;

/// Score where the brightness/volume ramp begins.
const EFFECT_RAMP_FLOOR: f64 = 30.0;

/// Brightness/volume level at the bottom of the ramp.
const EFFECT_RAMP_START: f64 = 0.7;

/// Adaptive multiplier bounds.
const MULTIPLIER_MIN: f64 = 0.5;
const MULTIPLIER_MAX: f64 = 1.5;

/// Commands accepted by a running loop, applied between ticks.
#[derive(Debug, Clone)]
pub enum Command {
    /// Replace the settings at the next tick boundary
    UpdateSettings(Settings),
    /// Replace the adaptive score multiplier (clamped to 0.5-1.5)
    SetMultiplier(f64),
    /// Stop monitoring
    Stop,
}

/// Observer/control handle for a monitoring run.
///
/// Cheap to clone. Status reads never block the loop; commands are applied
/// at the next tick boundary, and `stop` interrupts the inter-tick sleep
/// immediately.
#[derive(Debug, Clone)]
pub struct MonitorLink {
    commands: Sender<Command>,
    status: tokio::sync::watch::Receiver<MonitorStatus>,
    cancel: CancellationToken,
}

impl MonitorLink {
    /// Latest published status snapshot.
    pub fn status(&self) -> MonitorStatus {
        self.status.borrow().clone()
    }

    /// Watch receiver for change notifications.
    pub fn watch(&self) -> tokio::sync::watch::Receiver<MonitorStatus> {
        self.status.clone()
    }

    /// Queue a settings replacement for the next tick.
    pub fn update_settings(&self, settings: Settings) {
        let _ = self.commands.send(Command::UpdateSettings(settings));
    }

    /// Queue an adaptive multiplier update for the next tick.
    pub fn set_multiplier(&self, multiplier: f64) {
        let _ = self.commands.send(Command::SetMultiplier(multiplier));
    }

    /// Request a stop. Safe to call at any time; the loop finishes or
    /// abandons its sleep, runs teardown, and exits.
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
        self.cancel.cancel();
    }
}

/// The monitoring state machine.
///
/// Owns the scoring pipeline, the collaborators, and the open session.
/// All mutation happens on the single loop task; observers only see the
/// published [`MonitorStatus`].
pub struct MonitoringController {
    settings: Settings,
    model: Box<dyn ScoreModel>,
    source: Box<dyn FeatureSource>,
    verifier: Box<dyn SleepVerifier>,
    effects: Box<dyn DeviceEffects>,
    store: AnalyticsStore,

    smoother: ScoreSmoother,
    classifier: StateClassifier,
    recorder: SessionRecorder,

    phase: MonitorPhase,
    prev_state: DrowsinessState,
    multiplier: f64,
    high_score_ticks: u32,
    verification_attempted: bool,
    verification_unavailable: bool,
    last_score: f64,

    commands: Receiver<Command>,
    status_tx: tokio::sync::watch::Sender<MonitorStatus>,
    cancel: CancellationToken,
}

impl MonitoringController {
    pub fn new(
        settings: Settings,
        model: Box<dyn ScoreModel>,
        source: Box<dyn FeatureSource>,
        verifier: Box<dyn SleepVerifier>,
        effects: Box<dyn DeviceEffects>,
        store: AnalyticsStore,
    ) -> (Self, MonitorLink) {
        let (command_tx, command_rx) = unbounded();
        let (status_tx, status_rx) =
            tokio::sync::watch::channel(MonitorStatus::stopped(Utc::now()));
        let cancel = CancellationToken::new();

        let link = MonitorLink {
            commands: command_tx,
            status: status_rx,
            cancel: cancel.clone(),
        };

        let controller = Self {
            settings,
            model,
            source,
            verifier,
            effects,
            store,
            smoother: ScoreSmoother::new(),
            classifier: StateClassifier::new(),
            recorder: SessionRecorder::new(),
            phase: MonitorPhase::Stopped,
            prev_state: DrowsinessState::Awake,
            multiplier: 1.0,
            high_score_ticks: 0,
            verification_attempted: false,
            verification_unavailable: false,
            last_score: 0.0,
            commands: command_rx,
            status_tx,
            cancel,
        };

        (controller, link)
    }

    /// Run the loop until stopped. Consumes the controller; teardown always
    /// restores device settings and flushes the open session.
    pub async fn run(mut self) {
        let cancel = self.cancel.clone();
        self.begin(Utc::now());

        loop {
            self.drain_commands();
            if cancel.is_cancelled() {
                break;
            }

            if let Err(e) = self.tick(Utc::now()) {
                tracing::warn!("tick failed, continuing: {e}");
            }

            let cadence = self.cadence();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(cadence) => {}
            }
        }

        self.shutdown(Utc::now());
    }

    /// Current inter-tick delay.
    pub fn cadence(&self) -> Duration {
        if self.phase == MonitorPhase::Hibernating {
            HIBERNATE_TICK
        } else {
            ACTIVE_TICK
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    /// Start a monitoring run: save device settings, wake the sensors,
    /// reset the pipeline, and open the first session.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.effects.save_current();
        self.source.resume();
        self.smoother.reset();
        self.classifier.reset();
        self.prev_state = DrowsinessState::Awake;
        self.high_score_ticks = 0;
        self.verification_attempted = false;
        self.verification_unavailable = false;
        self.recorder.start(now);
        self.phase = MonitorPhase::Active;
        tracing::info!("monitoring started");
        self.publish(now);
    }

    /// Evaluate one tick. Errors are isolated to the tick by the caller.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<(), MonitorError> {
        let local_time = now.with_timezone(&Local).time();

        // Wake signals override everything except an already-awake,
        // non-hibernating loop.
        let awake_and_active = self.prev_state == DrowsinessState::Awake
            && self.phase != MonitorPhase::Hibernating;
        if !awake_and_active && self.wake_signal() {
            self.handle_wake(now);
            self.publish(now);
            return Ok(());
        }

        if self.settings.in_sleep_window(local_time) {
            if self.phase == MonitorPhase::Hibernating {
                // Sensors are paused; nothing to score.
                self.publish(now);
                return Ok(());
            }

            self.phase = MonitorPhase::Active;
            self.recorder.ensure_open(now);

            let result = self.score_tick(now, local_time);
            self.dispatch_effects(&result, now);
            self.prev_state = result.state;
            self.last_score = result.score;
        } else if self.prev_state != DrowsinessState::Awake
            || self.phase == MonitorPhase::Hibernating
        {
            self.leave_sleep_window(now);
        } else {
            self.phase = MonitorPhase::Standby;
        }

        self.publish(now);
        Ok(())
    }

    /// Tear down the run: restore device settings, flush the session,
    /// release the sensors.
    pub fn shutdown(&mut self, now: DateTime<Utc>) {
        self.effects.restore_saved();
        self.close_session(now);
        self.source.pause();
        self.phase = MonitorPhase::Stopped;
        self.last_score = 0.0;
        self.prev_state = DrowsinessState::Awake;
        tracing::info!("monitoring stopped");
        self.publish(now);
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::UpdateSettings(settings) => {
                    self.settings = settings;
                    tracing::debug!("settings updated");
                }
                Command::SetMultiplier(multiplier) => {
                    self.multiplier = multiplier.clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);
                }
                Command::Stop => {
                    self.cancel.cancel();
                }
            }
        }
    }

    fn wake_signal(&mut self) -> bool {
        let screen_on = self
            .source
            .screen_on_secs()
            .map(|secs| secs > WAKE_SCREEN_ON_SECS)
            .unwrap_or(false);
        let moving = self
            .source
            .movement_magnitude()
            .map(|magnitude| magnitude > WAKE_MOVEMENT_THRESHOLD)
            .unwrap_or(false);
        screen_on || moving
    }

    fn handle_wake(&mut self, now: DateTime<Utc>) {
        if self.phase == MonitorPhase::Hibernating {
            // Leaving hibernation does not restore device settings; that
            // happens when the classifier lands back on Awake.
            self.source.resume();
            self.smoother.reset();
            self.high_score_ticks = 0;
            self.phase = MonitorPhase::Active;
            tracing::info!("wake signal, leaving hibernation");
            return;
        }

        // The user is up: end this attempt and start a fresh one.
        self.effects.restore_saved();
        self.close_session(now);
        self.recorder.start(now);
        self.smoother.reset();
        self.classifier.reset();
        self.prev_state = DrowsinessState::Awake;
        self.high_score_ticks = 0;
        self.verification_attempted = false;
        self.verification_unavailable = false;
        tracing::info!("wake signal, session closed and reopened");
    }

    fn score_tick(&mut self, now: DateTime<Utc>, local_time: NaiveTime) -> ScoreResult {
        let snapshot = self.collect_snapshot(now, local_time);

        let raw = self.model.predict(&snapshot).clamp(0.0, 100.0);
        let adjusted = (raw * self.multiplier).clamp(0.0, 100.0);
        let smoothed = self.smoother.smooth(adjusted);

        let state = self.classifier.classify(
            smoothed,
            self.settings.drowsy_threshold as f64,
            self.settings.sleeping_threshold as f64,
        );

        if smoothed >= self.settings.sleeping_threshold as f64 {
            self.high_score_ticks += 1;
        } else {
            self.high_score_ticks = 0;
        }

        self.recorder.record_score(smoothed);

        let should_verify = state == DrowsinessState::LikelySleeping
            && !self.recorder.sleep_confirmed()
            && !self.verification_attempted
            && self.settings.camera_verification
            && self.verifier.available();

        ScoreResult {
            score: smoothed,
            state,
            snapshot,
            should_verify,
            multiplier: self.multiplier,
        }
    }

    fn collect_snapshot(&mut self, now: DateTime<Utc>, local_time: NaiveTime) -> FeatureSnapshot {
        let neutral = FeatureSnapshot::neutral(now);

        let session_minutes = self
            .source
            .session_minutes()
            .or_else(|| self.recorder.open_minutes(now))
            .unwrap_or(0.0);

        let noise_db = if self.settings.audio_sampling {
            self.source.ambient_noise_db()
        } else {
            None
        };

        FeatureSnapshot {
            ambient_lux: self.source.ambient_lux().unwrap_or(neutral.ambient_lux),
            stillness: self.source.stillness().unwrap_or(0.0),
            window_proximity: self.settings.window_proximity(local_time),
            heart_rate_bpm: self
                .source
                .heart_rate_bpm()
                .unwrap_or(DEFAULT_HEART_RATE_BPM),
            session_minutes,
            screen_off_minutes: self.source.screen_off_minutes().unwrap_or(0.0),
            noise_db,
            captured_at: now,
        }
    }

    fn dispatch_effects(&mut self, result: &ScoreResult, now: DateTime<Utc>) {
        match result.state {
            DrowsinessState::Awake => {
                if self.prev_state != DrowsinessState::Awake {
                    self.effects.restore_saved();
                    if self.recorder.sleep_confirmed() {
                        self.recorder.record_disturbance();
                        tracing::info!("disturbance recorded");
                    }
                }
            }
            DrowsinessState::Relaxing | DrowsinessState::Drowsy => {
                self.apply_ramp(result.score);
            }
            DrowsinessState::LikelySleeping => {
                self.handle_likely_sleeping(result, now);
            }
        }
    }

    /// Continuous dimming between the relaxing floor and the sleeping
    /// threshold.
    fn apply_ramp(&mut self, score: f64) {
        let span = self.settings.sleeping_threshold as f64 - EFFECT_RAMP_FLOOR;
        let t = if span > 0.0 {
            ((score - EFFECT_RAMP_FLOOR) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };

        if self.settings.adjust_brightness {
            let level =
                EFFECT_RAMP_START + (self.settings.brightness_target - EFFECT_RAMP_START) * t;
            self.effects
                .apply_brightness(level, self.settings.max_brightness_level);
        }
        if self.settings.adjust_volume {
            let level = EFFECT_RAMP_START + (self.settings.volume_target - EFFECT_RAMP_START) * t;
            self.effects.apply_volume(level);
        }
    }

    fn handle_likely_sleeping(&mut self, result: &ScoreResult, now: DateTime<Utc>) {
        if !self.recorder.sleep_confirmed() {
            if result.should_verify {
                self.verification_attempted = true;
                self.recorder.record_verification_attempt();
                let duration = Duration::from_secs(self.settings.verification_duration_secs);
                match self.verifier.verify(duration) {
                    Some(verdict) if verdict.is_sleeping => {
                        tracing::info!(
                            "camera verification confirmed sleep (confidence {:.2})",
                            verdict.confidence
                        );
                        self.recorder.confirm_sleep(now);
                    }
                    Some(_) => {
                        tracing::debug!("camera verification saw an awake user");
                    }
                    None => {
                        self.verification_unavailable = true;
                        tracing::debug!("camera verification unavailable");
                    }
                }
            } else if self.settings.camera_verification && !self.verifier.available() {
                self.verification_unavailable = true;
            }

            // Sustained high scores stand in for a verdict we can't get.
            if !self.recorder.sleep_confirmed()
                && self.verification_unavailable
                && self.high_score_ticks >= FALLBACK_CONFIRM_TICKS
            {
                tracing::info!("sleep confirmed by sustained high score");
                self.recorder.confirm_sleep(now);
            }
        }

        // Full sleep-mode device state.
        if self.settings.adjust_brightness {
            self.effects.apply_brightness(
                self.settings.brightness_target,
                self.settings.max_brightness_level,
            );
        }
        if self.settings.adjust_volume {
            self.effects.apply_volume(self.settings.volume_target);
        }
        if self.settings.enable_dnd {
            self.effects.set_do_not_disturb(true);
        }

        if self.high_score_ticks >= HIBERNATE_AFTER_TICKS
            && (self.recorder.sleep_confirmed() || !self.settings.camera_verification)
        {
            self.enter_hibernation(now);
        }
    }

    fn enter_hibernation(&mut self, now: DateTime<Utc>) {
        self.source.pause();
        self.recorder.confirm_sleep(now);
        self.recorder.mark_hibernation();

        if self.settings.adjust_brightness {
            self.effects
                .apply_brightness(0.0, self.settings.max_brightness_level);
        }
        if self.settings.adjust_volume {
            self.effects.apply_volume(0.0);
        }

        self.phase = MonitorPhase::Hibernating;
        tracing::info!("entering hibernation");
    }

    fn leave_sleep_window(&mut self, now: DateTime<Utc>) {
        self.effects.restore_saved();
        if self.phase == MonitorPhase::Hibernating {
            self.source.resume();
        }
        self.close_session(now);
        self.smoother.reset();
        self.classifier.reset();
        self.prev_state = DrowsinessState::Awake;
        self.high_score_ticks = 0;
        self.verification_attempted = false;
        self.verification_unavailable = false;
        self.phase = MonitorPhase::Standby;
        tracing::info!("sleep window over, standing by");
    }

    /// Record the wake (when sleep was confirmed), close the session, and
    /// hand it to the store. Sessions under the minimum sleep duration are
    /// dropped there without error.
    fn close_session(&mut self, now: DateTime<Utc>) {
        if self.recorder.sleep_confirmed() {
            self.recorder.record_wake(now);
        }
        if let Some(session) = self.recorder.close(now) {
            match self.store.persist(&session) {
                Ok(true) => tracing::info!(
                    "session {} persisted ({:.0} min asleep)",
                    session.id,
                    session.total_sleep_minutes
                ),
                Ok(false) => tracing::debug!("session {} discarded (too short)", session.id),
                Err(e) => tracing::warn!("failed to persist session: {e}"),
            }
        }
    }

    fn publish(&mut self, now: DateTime<Utc>) {
        let status = MonitorStatus {
            phase: self.phase,
            score: self.last_score,
            state: self.prev_state,
            monitoring: self.phase != MonitorPhase::Stopped,
            updated_at: now,
        };
        self.status_tx.send_replace(status);
    }
}
