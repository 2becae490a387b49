//! Validation gate
//!
//! Runs the validation collaborator once simulated time passes a threshold.

use contracts::{FrameValidator, LogEntry, ProcessedFrame, ValidationState};
use tracing::{debug, info};

/// Gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPhase {
    /// Simulated time has not yet exceeded the threshold
    Waiting,
    /// Validator runs every iteration until the session ends
    Active,
}

/// Gates and invokes the external validator
pub struct ValidationScheduler {
    threshold: f64,
    phase: ValidationPhase,
    validator: Box<dyn FrameValidator>,
    runs: u64,
}

impl ValidationScheduler {
    /// # Arguments
    /// * `threshold` - simulated seconds that must be *exceeded* before the first run
    /// * `validator` - validation collaborator
    pub fn new(threshold: f64, validator: Box<dyn FrameValidator>) -> Self {
        Self {
            threshold,
            phase: ValidationPhase::Waiting,
            validator,
            runs: 0,
        }
    }

    pub fn phase(&self) -> ValidationPhase {
        self.phase
    }

    /// Validator invocations so far
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Run the validator if the gate is open
    ///
    /// While waiting the state is returned unchanged. Once active the
    /// validator is always called, with or without a frame, and its returned
    /// state is adopted as is.
    pub fn maybe_run(
        &mut self,
        sim_time: f64,
        current_frame: Option<&ProcessedFrame>,
        state: ValidationState,
    ) -> ValidationState {
        if self.phase == ValidationPhase::Waiting {
            if sim_time <= self.threshold {
                return state;
            }
            self.phase = ValidationPhase::Active;
            info!(sim_time, threshold = self.threshold, "validation started");
        }

        self.runs += 1;
        metrics::counter!("lane_session_validation_runs_total").increment(1);
        self.validator.run_validation(sim_time, current_frame, state)
    }
}

/// Built-in validator: counts frames, accumulates capture intervals and logs
/// one entry per call
#[derive(Debug, Default)]
pub struct FrameLogValidator {
    last_capture: Option<f64>,
}

impl FrameLogValidator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameValidator for FrameLogValidator {
    fn run_validation(
        &mut self,
        sim_time: f64,
        frame: Option<&ProcessedFrame>,
        mut state: ValidationState,
    ) -> ValidationState {
        let Some(frame) = frame else {
            state.logs.push(LogEntry {
                frame_id: state.frame_id,
                sim_time,
                source_frame: None,
                message: "no frame available".to_string(),
            });
            return state;
        };

        state.frame_id += 1;
        if let Some(last) = self.last_capture {
            state.capture_times += (frame.timestamp() - last).max(0.0);
        }
        self.last_capture = Some(frame.timestamp());

        let lane_pixels = frame.masked().pixels().filter(|p| p[0] > 0).count();
        debug!(frame_id = state.frame_id, lane_pixels, "frame validated");
        state.logs.push(LogEntry {
            frame_id: state.frame_id,
            sim_time,
            source_frame: Some(frame.frame()),
            message: format!("lane pixels: {lane_pixels}"),
        });
        state
    }
}
