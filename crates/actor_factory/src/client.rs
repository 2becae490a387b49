//! Simulation connection abstraction
//!
//! Defines the trait for everything the session needs from the simulator,
//! supporting the real CARLA client and mock testing.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use contracts::{ActorId, SensorSource, SimulationSettings, Transform, VehicleControl};

use crate::error::Result;

/// Simulation client trait
///
/// Abstracts CARLA core operations for testing and future implementation replacement.
/// All methods take `&self` so one client can be shared (via `Arc`) by the
/// lifecycle manager, the clock driver and the session loop.
pub trait SimulationClient: Send + Sync {
    /// Connect to CARLA server
    fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Load scenario ("town") and make it the current world
    fn load_world(&self, town: &str) -> impl Future<Output = Result<()>> + Send;

    /// Read global world settings
    fn settings(&self) -> impl Future<Output = Result<SimulationSettings>> + Send;

    /// Apply global world settings
    fn apply_settings(
        &self,
        settings: SimulationSettings,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Put the traffic manager into (or out of) synchronous mode
    fn set_traffic_manager_synchronous(
        &self,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Recommended spawn points of the current map
    fn spawn_points(&self) -> impl Future<Output = Result<Vec<Transform>>> + Send;

    /// Spawn vehicle
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "vehicle.tesla.model3"
    /// * `transform` - Initial pose
    ///
    /// # Returns
    /// Newly created actor ID
    fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Transform,
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Spawn sensor and attach to parent actor
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "sensor.camera.rgb"
    /// * `transform` - Pose relative to parent actor
    /// * `parent_id` - Parent actor ID
    /// * `attributes` - Blueprint attributes (image size, fov, ...)
    fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Destroy actor
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Check if actor exists
    fn actor_exists(&self, actor_id: ActorId) -> impl Future<Output = Result<bool>> + Send;

    /// Advance the world by one step; blocks until the simulator completes it
    ///
    /// # Returns
    /// Simulator frame number after the step
    fn tick(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Simulated elapsed time of the latest snapshot (seconds)
    fn elapsed_seconds(&self) -> impl Future<Output = Result<f64>> + Send;

    /// Hand the vehicle to (or take it from) the built-in autonomous driver
    fn set_autopilot(
        &self,
        actor_id: ActorId,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Apply a manual command to a vehicle
    fn apply_control(
        &self,
        actor_id: ActorId,
        control: VehicleControl,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Get camera data source
    ///
    /// # Returns
    /// Boxed `SensorSource`, None if the actor doesn't exist or is not a sensor
    fn sensor_source(&self, actor_id: ActorId) -> Option<Box<dyn SensorSource>>;
}
