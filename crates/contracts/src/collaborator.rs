//! External collaborator contracts: lane detection and validation.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::{ContractError, LaneDetection, ProcessedFrame};

/// Lane-detection pipeline
///
/// Called synchronously inside the sensor-callback context, so it must be
/// shareable across threads.
pub trait LaneDetector: Send + Sync {
    /// Process one RGB frame at capture resolution
    ///
    /// # Errors
    /// Any failure is reported as a callback error; the slot is left unwritten.
    fn process_image(&self, rgb: &RgbImage) -> Result<LaneDetection, ContractError>;
}

/// One validation log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Validation frame counter at the time of the record
    pub frame_id: u64,

    /// Simulated time (seconds)
    pub sim_time: f64,

    /// Simulator frame of the processed image, if one was available
    pub source_frame: Option<u64>,

    /// Free-form detail
    pub message: String,
}

/// Counters and log sequence owned by the validation gate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationState {
    /// Monotonic counter
    pub frame_id: u64,

    /// Accumulated capture time (seconds)
    pub capture_times: f64,

    /// Ordered log sequence
    pub logs: Vec<LogEntry>,
}

/// Validation harness
///
/// Pure update of counters and log sequence; must tolerate a missing frame.
pub trait FrameValidator: Send {
    fn run_validation(
        &mut self,
        sim_time: f64,
        frame: Option<&ProcessedFrame>,
        state: ValidationState,
    ) -> ValidationState;
}
