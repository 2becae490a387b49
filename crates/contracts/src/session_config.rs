//! SessionConfig - Config Loader output
//!
//! Immutable description of one closed-loop session: scenario, vehicle,
//! camera, validation gate, recording and loop pacing. Supplied once at
//! construction and threaded through every component; never mutated at runtime.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Complete session configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SessionConfig {
    /// Scenario to load (e.g., "Town03")
    #[validate(length(min = 1, message = "town cannot be empty"))]
    pub town: String,

    /// Append every rendered result image to a recording
    pub enable_recording: bool,

    /// Forward frames to the validation harness once the gate opens
    pub validation_mode: bool,

    /// Simulator connection
    #[validate(nested)]
    pub carla: CarlaConfig,

    /// Ego vehicle
    #[validate(nested)]
    pub vehicle: VehicleConfig,

    /// Front camera
    #[validate(nested)]
    pub camera: CameraConfig,

    /// Validation gate
    #[validate(nested)]
    pub validation: ValidationConfig,

    /// Recording output
    #[validate(nested)]
    pub recording: RecordingConfig,

    /// Main loop pacing
    pub pacing: PacingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            town: "Town03".to_string(),
            enable_recording: false,
            validation_mode: true,
            carla: CarlaConfig::default(),
            vehicle: VehicleConfig::default(),
            camera: CameraConfig::default(),
            validation: ValidationConfig::default(),
            recording: RecordingConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Capture resolution as (width, height)
    pub fn capture_size(&self) -> (u32, u32) {
        (self.camera.width, self.camera.height)
    }
}

/// Simulator endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CarlaConfig {
    /// Server host
    #[validate(length(min = 1, message = "host cannot be empty"))]
    pub host: String,

    /// Server RPC port
    pub port: u16,

    /// Client RPC timeout (seconds)
    #[validate(range(exclusive_min = 0.0, message = "timeout must be > 0"))]
    pub timeout_sec: f64,
}

impl Default for CarlaConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2000,
            timeout_sec: 10.0,
        }
    }
}

/// Ego vehicle configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VehicleConfig {
    /// Blueprint name (e.g., "vehicle.tesla.model3")
    #[validate(length(min = 1, message = "vehicle blueprint cannot be empty"))]
    pub blueprint: String,

    /// Index into the map's spawn points; random when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_point_index: Option<usize>,

    /// Seed for the random spawn point choice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_seed: Option<u64>,

    /// Autopilot state assigned once right after setup
    pub autopilot_on_start: bool,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            blueprint: "vehicle.tesla.model3".to_string(),
            spawn_point_index: None,
            spawn_seed: None,
            autopilot_on_start: true,
        }
    }
}

/// RGB camera configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CameraConfig {
    /// Blueprint name
    #[validate(length(min = 1, message = "camera blueprint cannot be empty"))]
    pub blueprint: String,

    /// Image width (pixels)
    #[validate(range(min = 1, message = "camera width must be > 0"))]
    pub width: u32,

    /// Image height (pixels)
    #[validate(range(min = 1, message = "camera height must be > 0"))]
    pub height: u32,

    /// Horizontal field of view (degrees)
    #[validate(range(
        exclusive_min = 0.0,
        exclusive_max = 180.0,
        message = "fov must be in (0, 180)"
    ))]
    pub fov: f64,

    /// Mount pose relative to the vehicle
    pub transform: Transform,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            blueprint: "sensor.camera.rgb".to_string(),
            width: 1280,
            height: 720,
            fov: 90.0,
            transform: Transform {
                location: Location {
                    x: 2.0,
                    y: 0.0,
                    z: 1.3,
                },
                rotation: Rotation {
                    pitch: -8.0,
                    yaw: 0.0,
                    roll: 0.0,
                },
            },
        }
    }
}

/// Validation gate configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ValidationConfig {
    /// Simulated time that must be exceeded before the validator runs (seconds)
    #[validate(range(min = 0.0, message = "start_after_sec must be >= 0"))]
    pub start_after_sec: f64,

    /// Where to dump the accumulated log sequence on teardown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            start_after_sec: 5.0,
            log_path: None,
        }
    }
}

/// Recording output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RecordingConfig {
    /// Output directory
    pub output_dir: PathBuf,

    /// Container format
    pub format: RecordingFormat,

    /// Nominal playback rate written to the sidecar
    #[validate(range(exclusive_min = 0.0, message = "recording fps must be > 0"))]
    pub fps: f64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            format: RecordingFormat::RawBgr,
            fps: 30.0,
        }
    }
}

/// Recording container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingFormat {
    /// Raw interleaved BGR24 stream plus a JSON sidecar
    #[default]
    RawBgr,
    /// One PNG per frame in a directory
    PngSequence,
}

/// Main loop pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Iterations per second; 0 disables the limiter
    pub target_fps: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self { target_fps: 20 }
    }
}

/// 3D transform: location + rotation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// Location (x, y, z) in meters
    pub location: Location,

    /// Rotation (pitch, yaw, roll) in degrees
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}
