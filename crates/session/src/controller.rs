//! Session controller
//!
//! Owns setup, the main loop and teardown. Teardown runs on every exit path:
//! normal stop, interrupt, setup failure, loop failure and panics inside the
//! loop.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actor_factory::{
    ActorId, ActorLifecycleManager, SimulationClient, SimulationError, TeardownError,
};
use chrono::Local;
use contracts::{
    FrameValidator, LaneDetector, LogEntry, SessionConfig, Transform, ValidationState,
};
use display::{
    open_recorder, Canvas, DisplayCompositor, FrameRecorder, HeadlessCanvas, RecordingSummary,
};
use futures::FutureExt;
use ingestion::{BasicLaneDetector, CameraIngestion, FrameHandoffSlot, FrameReader};
use lockstep::{FramePacer, SimulationClockDriver, LOCKSTEP_DELTA_SECONDS};
use observability::{record_loop_iteration, RunningStats};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, error, info, instrument, warn};

use crate::control::{ControlDecision, ControlInputTranslator};
use crate::error::{FailureKind, FailurePolicy, Result, SessionError, SetupStage};
use crate::input::{InputSource, NoInput};
use crate::stats::SessionStats;
use crate::stop::{StopHandle, StopReason};
use crate::validation::{FrameLogValidator, ValidationScheduler};

/// Outcome of a completed session
#[derive(Debug)]
pub struct SessionReport {
    pub stats: SessionStats,
    /// Final validation counters and log sequence
    pub validation: ValidationState,
    /// Problems hit while releasing resources
    pub teardown_failures: Vec<TeardownError>,
    /// Finalized recording, if recording was enabled
    pub recording: Option<RecordingSummary>,
}

/// Resources acquired during setup
///
/// Filled in step by step so teardown can release a partial setup.
struct Live<C: SimulationClient> {
    lifecycle: ActorLifecycleManager<C>,
    clock: SimulationClockDriver<C>,
    vehicle_id: Option<ActorId>,
    ingestion: Option<CameraIngestion>,
    reader: Option<FrameReader>,
    compositor: Option<DisplayCompositor>,
    scheduler: Option<ValidationScheduler>,
    validation: ValidationState,
    control_failures: u64,
    /// Iteration time excluding pacing (ms)
    loop_latency: RunningStats,
}

/// Closed-loop session controller
pub struct SessionController<C: SimulationClient> {
    config: SessionConfig,
    client: Arc<C>,
    detector: Arc<dyn LaneDetector>,
    validator: Option<Box<dyn FrameValidator>>,
    canvas: Option<Box<dyn Canvas>>,
    recorder: Option<Box<dyn FrameRecorder>>,
    input: Box<dyn InputSource>,
    max_ticks: Option<u64>,
    stop: StopHandle,
}

impl<C: SimulationClient> SessionController<C> {
    /// Create a controller with the built-in detector and validator, a
    /// headless canvas and no input
    pub fn new(config: SessionConfig, client: Arc<C>) -> Self {
        Self {
            config,
            client,
            detector: Arc::new(BasicLaneDetector::default()),
            validator: Some(Box::new(FrameLogValidator::new())),
            canvas: None,
            recorder: None,
            input: Box::new(NoInput),
            max_ticks: None,
            stop: StopHandle::new(),
        }
    }

    pub fn with_detector(mut self, detector: Arc<dyn LaneDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn FrameValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_canvas(mut self, canvas: Box<dyn Canvas>) -> Self {
        self.canvas = Some(canvas);
        self
    }

    /// Use this recorder instead of opening one from the configuration.
    /// Only used when recording is enabled.
    pub fn with_recorder(mut self, recorder: Box<dyn FrameRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_input(mut self, input: Box<dyn InputSource>) -> Self {
        self.input = input;
        self
    }

    /// Stop after this many loop iterations
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Handle for requesting a stop from outside the loop
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run setup, the main loop and teardown
    ///
    /// # Errors
    /// Setup failures, tick failures and loop panics. Teardown has already
    /// run when an error is returned.
    #[instrument(
        name = "session_run",
        skip(self),
        fields(town = %self.config.town, recording = self.config.enable_recording)
    )]
    pub async fn run(mut self) -> Result<SessionReport> {
        let started = Instant::now();
        let mut live = Live {
            lifecycle: ActorLifecycleManager::new(self.client.clone()),
            clock: SimulationClockDriver::new(self.client.clone()),
            vehicle_id: None,
            ingestion: None,
            reader: None,
            compositor: None,
            scheduler: None,
            validation: ValidationState::default(),
            control_failures: 0,
            loop_latency: RunningStats::default(),
        };

        let outcome = AssertUnwindSafe(async {
            self.setup(&mut live).await?;
            self.main_loop(&mut live).await
        })
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(message = %message, "session loop panicked");
            Err(SessionError::Panicked { message })
        });

        if let Err(e) = &outcome {
            self.handle_failure(e.kind(), e);
        }

        let report = self.teardown(live, started).await;
        metrics::counter!("lane_session_teardown_failures_total")
            .increment(report.teardown_failures.len() as u64);

        outcome.map(|()| report)
    }

    #[instrument(name = "session_setup", skip_all)]
    async fn setup(&mut self, live: &mut Live<C>) -> Result<()> {
        let (width, height) = self.config.capture_size();

        let carla = &self.config.carla;
        info!(host = %carla.host, port = carla.port, "connecting to simulator");
        self.client
            .connect(
                &carla.host,
                carla.port,
                Duration::from_secs_f64(carla.timeout_sec),
            )
            .await
            .map_err(SessionError::setup(SetupStage::Connect))?;
        self.client
            .load_world(&self.config.town)
            .await
            .map_err(SessionError::setup(SetupStage::LoadWorld))?;

        live.clock
            .enable_lockstep(LOCKSTEP_DELTA_SECONDS)
            .await
            .map_err(SessionError::setup(SetupStage::Lockstep))?;

        let spawn_points = self
            .client
            .spawn_points()
            .await
            .map_err(SessionError::setup(SetupStage::SpawnPoints))?;
        let spawn_point = self
            .choose_spawn_point(&spawn_points)
            .map_err(SessionError::setup(SetupStage::SpawnPoints))?;

        let vehicle = live
            .lifecycle
            .spawn_vehicle(&self.config.vehicle.blueprint, spawn_point)
            .await
            .map_err(SessionError::setup(SetupStage::Vehicle))?;
        live.vehicle_id = Some(vehicle.id);

        if self.config.vehicle.autopilot_on_start {
            self.client
                .set_autopilot(vehicle.id, true)
                .await
                .map_err(SessionError::setup(SetupStage::Autopilot))?;
        }

        let camera_config = &self.config.camera;
        let attributes = HashMap::from([
            ("image_size_x".to_string(), camera_config.width.to_string()),
            ("image_size_y".to_string(), camera_config.height.to_string()),
            ("fov".to_string(), camera_config.fov.to_string()),
        ]);
        let camera = live
            .lifecycle
            .spawn_sensor(
                &camera_config.blueprint,
                camera_config.transform,
                &vehicle,
                &attributes,
            )
            .await
            .map_err(SessionError::setup(SetupStage::Camera))?;

        // Nothing is written to disk until the camera exists
        let recorder = if self.config.enable_recording {
            match self.recorder.take() {
                Some(recorder) => Some(recorder),
                None => Some(
                    open_recorder(&self.config.recording, Local::now())
                        .map_err(SessionError::Recording)?,
                ),
            }
        } else {
            None
        };
        let canvas = self
            .canvas
            .take()
            .unwrap_or_else(|| Box::new(HeadlessCanvas::new(width, height)));
        live.compositor = Some(DisplayCompositor::new(canvas, recorder));

        let source = self
            .client
            .sensor_source(camera.id)
            .ok_or(SessionError::SensorUnavailable {
                actor_id: camera.id,
            })?;
        let (writer, reader) = FrameHandoffSlot::new();
        let ingestion =
            CameraIngestion::new(source, self.detector.clone(), writer, (width, height));
        ingestion.start();
        live.ingestion = Some(ingestion);
        live.reader = Some(reader);

        if self.config.validation_mode {
            if let Some(validator) = self.validator.take() {
                live.scheduler = Some(ValidationScheduler::new(
                    self.config.validation.start_after_sec,
                    validator,
                ));
            }
        }

        info!(
            vehicle_id = vehicle.id,
            camera_id = camera.id,
            autopilot = self.config.vehicle.autopilot_on_start,
            "session setup complete"
        );
        Ok(())
    }

    fn choose_spawn_point(
        &self,
        points: &[Transform],
    ) -> std::result::Result<Transform, SimulationError> {
        if points.is_empty() {
            return Err(SimulationError::NoSpawnPoints);
        }

        let vehicle = &self.config.vehicle;
        let chosen = match (vehicle.spawn_point_index, vehicle.spawn_seed) {
            (Some(index), _) => points.get(index).ok_or_else(|| {
                SimulationError::vehicle_spawn(
                    &vehicle.blueprint,
                    format!(
                        "spawn point index {index} out of range ({} available)",
                        points.len()
                    ),
                )
            })?,
            (None, Some(seed)) => points
                .choose(&mut StdRng::seed_from_u64(seed))
                .ok_or(SimulationError::NoSpawnPoints)?,
            (None, None) => points
                .choose(&mut rand::thread_rng())
                .ok_or(SimulationError::NoSpawnPoints)?,
        };
        Ok(*chosen)
    }

    async fn main_loop(&mut self, live: &mut Live<C>) -> Result<()> {
        let Some(reader) = live.reader.take() else {
            return Ok(());
        };
        let mut pacer = FramePacer::new(self.config.pacing.target_fps);
        let translator = ControlInputTranslator::new();
        let mut autopilot = self.config.vehicle.autopilot_on_start;

        info!(
            target_fps = self.config.pacing.target_fps,
            max_ticks = ?self.max_ticks,
            "session loop running"
        );

        loop {
            if self.stop.is_stopped() {
                if let Some(reason @ StopReason::Interrupt) = self.stop.reason() {
                    self.handle_failure(FailureKind::Interrupt, &reason);
                }
                break;
            }
            if self.max_ticks.is_some_and(|max| live.clock.ticks() >= max) {
                self.stop.request(StopReason::MaxTicks);
                break;
            }

            let iteration = Instant::now();
            let sim_time = live.clock.advance().await.map_err(SessionError::Tick)?;
            let frame = reader.read();

            if let Some(scheduler) = live.scheduler.as_mut() {
                let state = std::mem::take(&mut live.validation);
                live.validation = scheduler.maybe_run(sim_time, frame.as_deref(), state);
            }

            let input = self.input.poll();
            let decision = translator.translate(&input, autopilot);
            if decision.stop_requested {
                info!("quit requested");
                self.stop.request(StopReason::UserQuit);
                break;
            }
            autopilot = self.apply_decision(live, decision, autopilot).await;

            if let Some(compositor) = live.compositor.as_mut() {
                compositor.render(frame.as_deref());
            }

            let elapsed = iteration.elapsed();
            record_loop_iteration(elapsed);
            live.loop_latency.push(elapsed.as_secs_f64() * 1000.0);
            pacer.wait().await;
        }

        live.reader = Some(reader);
        Ok(())
    }

    /// Apply an autopilot toggle or a manual command
    ///
    /// # Returns
    /// Autopilot state actually in effect afterwards
    async fn apply_decision(
        &self,
        live: &mut Live<C>,
        decision: ControlDecision,
        autopilot: bool,
    ) -> bool {
        let Some(vehicle_id) = live.vehicle_id else {
            return autopilot;
        };

        if decision.autopilot_enabled != autopilot {
            match self
                .client
                .set_autopilot(vehicle_id, decision.autopilot_enabled)
                .await
            {
                Ok(()) => {
                    info!(enabled = decision.autopilot_enabled, "autopilot toggled");
                }
                Err(e) => {
                    live.control_failures += 1;
                    metrics::counter!("lane_session_control_errors_total").increment(1);
                    self.handle_failure(FailureKind::Control, &e);
                    return autopilot;
                }
            }
        }

        if let Some(control) = decision.manual {
            if let Err(e) = self.client.apply_control(vehicle_id, control).await {
                live.control_failures += 1;
                metrics::counter!("lane_session_control_errors_total").increment(1);
                self.handle_failure(FailureKind::Control, &e);
            } else {
                debug!(?control, "manual control applied");
            }
        }
        decision.autopilot_enabled
    }

    /// Release everything setup acquired, in order: camera callback, actors,
    /// recording, world settings
    #[instrument(name = "session_teardown", skip_all)]
    async fn teardown(&self, mut live: Live<C>, started: Instant) -> SessionReport {
        info!("shutting down session");
        let mut failures = Vec::new();

        let ingestion = live.ingestion.take().map(|ingestion| {
            ingestion.stop();
            ingestion.metrics().snapshot()
        });

        let released = live.lifecycle.teardown().await;
        info!(released = released.released.len(), "actors released");
        failures.extend(released.failures);

        let mut render = Default::default();
        let mut recording = None;
        if let Some(mut compositor) = live.compositor.take() {
            match compositor.finish() {
                Ok(summary) => recording = summary,
                Err(e) => error!(error = %e, "failed to finalize recording"),
            }
            render = compositor.stats();
        }

        failures.extend(live.clock.restore_freerunning().await);
        for failure in &failures {
            self.handle_failure(FailureKind::Teardown, failure);
        }

        if let Some(path) = &self.config.validation.log_path {
            if live.scheduler.is_some() {
                match write_validation_log(path, &live.validation.logs) {
                    Ok(()) => info!(
                        path = %path.display(),
                        entries = live.validation.logs.len(),
                        "validation log written"
                    ),
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "failed to write validation log")
                    }
                }
            }
        }

        let ingestion = ingestion.unwrap_or_default();
        let stats = SessionStats {
            ticks: live.clock.ticks(),
            sim_time: live.clock.sim_time(),
            frames_published: ingestion.frames_published,
            frames_overwritten: ingestion.frames_overwritten,
            callback_errors: ingestion.callback_errors,
            render,
            validation_runs: live.scheduler.as_ref().map_or(0, |s| s.runs()),
            control_failures: live.control_failures,
            loop_latency_ms: live.loop_latency.summary(),
            teardown_failures: failures.len(),
            stop_reason: self.stop.reason(),
            duration: started.elapsed(),
        };

        info!(
            ticks = stats.ticks,
            sim_time = stats.sim_time,
            teardown_failures = failures.len(),
            stop_reason = ?stats.stop_reason,
            "session shutdown complete"
        );

        SessionReport {
            stats,
            validation: live.validation,
            teardown_failures: failures,
            recording,
        }
    }
}

impl<C: SimulationClient> SessionController<C> {
    /// Log a failure and stop the session when its kind's policy says so
    fn handle_failure(&self, kind: FailureKind, error: &dyn std::fmt::Display) {
        match kind.policy() {
            FailurePolicy::AbortSetup | FailurePolicy::EndSession => {
                error!(?kind, error = %error, "session failed");
                self.stop.request(StopReason::Failed);
            }
            FailurePolicy::LogAndContinue => {
                warn!(?kind, error = %error, "failure contained, continuing");
            }
            FailurePolicy::StopGracefully => {
                info!(?kind, reason = %error, "stopping session");
                self.stop.request(StopReason::Interrupt);
            }
        }
    }
}

fn write_validation_log(path: &Path, logs: &[LogEntry]) -> std::io::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, logs)?;
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
