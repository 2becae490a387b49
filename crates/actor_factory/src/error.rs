//! Simulation client error types

use contracts::{ActorId, ContractError};
use thiserror::Error;

/// Simulation connection / actor error
#[derive(Debug, Error)]
pub enum SimulationError {
    /// CARLA connection error
    #[error("failed to connect to CARLA: {message}")]
    ConnectionFailed { message: String },

    /// Operation issued before `connect`/`load_world`
    #[error("not connected to CARLA server")]
    NotConnected,

    /// Scenario load error
    #[error("failed to load world '{town}': {message}")]
    WorldLoadFailed { town: String, message: String },

    /// No spawn points on the current map
    #[error("map has no spawn points")]
    NoSpawnPoints,

    /// Vehicle spawn error
    #[error("failed to spawn vehicle '{blueprint}': {message}")]
    VehicleSpawnFailed { blueprint: String, message: String },

    /// Sensor spawn error
    #[error("failed to spawn sensor '{blueprint}' on actor {parent_id}: {message}")]
    SensorSpawnFailed {
        blueprint: String,
        parent_id: ActorId,
        message: String,
    },

    /// Sensor requested before its parent vehicle was spawned and registered
    #[error("spawn order violated: {message}")]
    SpawnOrder { message: String },

    /// Actor not known to the client
    #[error("actor {actor_id} not found")]
    ActorNotFound { actor_id: ActorId },

    /// Destroy error
    #[error("failed to destroy actor {actor_id}: {message}")]
    DestroyFailed { actor_id: ActorId, message: String },

    /// World settings read/apply error
    #[error("failed to apply world settings: {message}")]
    SettingsFailed { message: String },

    /// Traffic manager mode error
    #[error("failed to set traffic manager synchronous mode: {message}")]
    TrafficManagerFailed { message: String },

    /// Tick error
    #[error("world tick failed: {message}")]
    TickFailed { message: String },

    /// Autopilot / control error
    #[error("failed to control vehicle {actor_id}: {message}")]
    ControlFailed { actor_id: ActorId, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl SimulationError {
    /// Create vehicle spawn error
    pub fn vehicle_spawn(blueprint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VehicleSpawnFailed {
            blueprint: blueprint.into(),
            message: message.into(),
        }
    }

    /// Create sensor spawn error
    pub fn sensor_spawn(
        blueprint: impl Into<String>,
        parent_id: ActorId,
        message: impl Into<String>,
    ) -> Self {
        Self::SensorSpawnFailed {
            blueprint: blueprint.into(),
            parent_id,
            message: message.into(),
        }
    }

    /// Create control error
    pub fn control(actor_id: ActorId, message: impl Into<String>) -> Self {
        Self::ControlFailed {
            actor_id,
            message: message.into(),
        }
    }
}

/// Release failure for one resource during teardown
///
/// Logged and collected; never escalated to the caller.
#[derive(Debug, Error)]
#[error("teardown of {resource} failed: {source}")]
pub struct TeardownError {
    /// Human-readable resource name (e.g., "actor 1001 (vehicle.tesla.model3)")
    pub resource: String,

    #[source]
    pub source: SimulationError,
}

impl TeardownError {
    pub fn new(resource: impl Into<String>, source: SimulationError) -> Self {
        Self {
            resource: resource.into(),
            source,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SimulationError>;
