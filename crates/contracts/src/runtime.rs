//! Runtime simulation handles and global settings.

use serde::{Deserialize, Serialize};

/// CARLA actor handle type
pub type ActorId = u32;

/// Kind of spawned actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    /// Ego vehicle
    Vehicle,
    /// Sensor attached to a parent actor
    Sensor {
        /// Parent actor handle
        parent: ActorId,
    },
}

/// Opaque handle to a spawned simulation entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Simulator-assigned id
    pub id: ActorId,

    /// Vehicle or attached sensor
    pub kind: ActorKind,

    /// Blueprint it was spawned from
    pub blueprint: String,
}

impl Actor {
    /// Create a vehicle handle
    pub fn vehicle(id: ActorId, blueprint: impl Into<String>) -> Self {
        Self {
            id,
            kind: ActorKind::Vehicle,
            blueprint: blueprint.into(),
        }
    }

    /// Create a sensor handle attached to `parent`
    pub fn sensor(id: ActorId, blueprint: impl Into<String>, parent: ActorId) -> Self {
        Self {
            id,
            kind: ActorKind::Sensor { parent },
            blueprint: blueprint.into(),
        }
    }

    pub fn is_vehicle(&self) -> bool {
        matches!(self.kind, ActorKind::Vehicle)
    }
}

/// World-global simulation settings
///
/// While a session runs: `synchronous_mode = true`, `fixed_delta_seconds = Some(1/20)`.
/// On teardown: `{false, None}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// World only advances on an explicit tick
    pub synchronous_mode: bool,

    /// Fixed step length (seconds); `None` means variable step
    pub fixed_delta_seconds: Option<f64>,
}

impl SimulationSettings {
    /// Lock-step settings at the given step length
    pub fn lockstep(delta_seconds: f64) -> Self {
        Self {
            synchronous_mode: true,
            fixed_delta_seconds: Some(delta_seconds),
        }
    }

    /// Free-running (asynchronous, variable step) settings
    pub fn free_running() -> Self {
        Self::default()
    }

    /// Simulated steps per second, if fixed-step
    pub fn fps(&self) -> Option<f64> {
        self.fixed_delta_seconds
            .filter(|d| *d > 0.0)
            .map(|d| 1.0 / d)
    }
}

/// Manual vehicle command
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleControl {
    /// [0, 1]
    pub throttle: f32,
    /// [-1, 1], positive as mapped from the left key
    pub steer: f32,
    /// [0, 1]
    pub brake: f32,
}
