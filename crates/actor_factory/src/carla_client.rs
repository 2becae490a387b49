//! Real CARLA client implementation
//!
//! Connects to CARLA server using carla-rust crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carla::client::{ActorBase, Client, Sensor, Vehicle, World};
use carla::geom::{Location, Rotation, Transform as CarlaTransform};
use carla::rpc::VehicleControl as CarlaVehicleControl;
use contracts::{ActorId, SensorSource, SimulationSettings, Transform, VehicleControl};
use tracing::{debug, info, instrument, warn};

use crate::carla_sensor_source::CarlaSensorSource;
use crate::client::SimulationClient;
use crate::error::{Result, SimulationError};

/// How long `apply_settings` waits for the server to acknowledge
const SETTINGS_TIMEOUT: Duration = Duration::from_secs(10);

/// Real CARLA client
///
/// Wraps carla-rust's Client, implements SimulationClient trait.
/// Uses Mutex for interior mutability, allowing `&self` methods to modify World.
#[derive(Default, Clone)]
pub struct RealCarlaClient {
    client: Arc<Mutex<Option<Client>>>,
    world: Arc<Mutex<Option<World>>>,
    port: Arc<Mutex<u16>>,
    /// Live actors by id
    actors: Arc<Mutex<HashMap<ActorId, ActorType>>>,
}

#[derive(Clone)]
enum ActorType {
    Vehicle(Vehicle),
    Sensor(Sensor),
}

impl RealCarlaClient {
    /// Create new client (disconnected state)
    pub fn new() -> Self {
        Self::default()
    }

    fn with_client<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Client) -> Result<R>,
    {
        let mut guard = self.client.lock().unwrap();
        let client = guard.as_mut().ok_or(SimulationError::NotConnected)?;
        f(client)
    }

    /// Access World with mutable reference, ensuring connected
    fn with_world_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut World) -> Result<R>,
    {
        let mut guard = self.world.lock().unwrap();
        let world = guard.as_mut().ok_or(SimulationError::NotConnected)?;
        f(world)
    }

    fn vehicle(&self, actor_id: ActorId) -> Result<Vehicle> {
        match self.actors.lock().unwrap().get(&actor_id) {
            Some(ActorType::Vehicle(v)) => Ok(v.clone()),
            _ => Err(SimulationError::ActorNotFound { actor_id }),
        }
    }

    fn to_carla_transform(transform: Transform) -> CarlaTransform {
        CarlaTransform {
            location: Location {
                x: transform.location.x as f32,
                y: transform.location.y as f32,
                z: transform.location.z as f32,
            },
            rotation: Rotation {
                pitch: transform.rotation.pitch as f32,
                yaw: transform.rotation.yaw as f32,
                roll: transform.rotation.roll as f32,
            },
        }
    }

    fn from_carla_transform(transform: &CarlaTransform) -> Transform {
        Transform {
            location: contracts::Location {
                x: transform.location.x as f64,
                y: transform.location.y as f64,
                z: transform.location.z as f64,
            },
            rotation: contracts::Rotation {
                pitch: transform.rotation.pitch as f64,
                yaw: transform.rotation.yaw as f64,
                roll: transform.rotation.roll as f64,
            },
        }
    }
}

impl SimulationClient for RealCarlaClient {
    #[instrument(name = "real_carla_connect", skip(self, timeout), fields(host = %host, port))]
    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let mut client = Client::connect(host, port, None);
        client.set_timeout(timeout);
        info!(version = %client.server_version(), "connected to CARLA server");

        *self.client.lock().unwrap() = Some(client);
        *self.port.lock().unwrap() = port;
        Ok(())
    }

    #[instrument(name = "real_carla_load_world", skip(self), fields(town = %town))]
    async fn load_world(&self, town: &str) -> Result<()> {
        let world = self.with_client(|client| {
            let available = client.available_maps();
            if !available.iter().any(|m| m.ends_with(town)) {
                return Err(SimulationError::WorldLoadFailed {
                    town: town.to_string(),
                    message: "map not available on server".into(),
                });
            }
            Ok(client.load_world(town))
        })?;

        info!(map = %world.map().name(), "world loaded");
        *self.world.lock().unwrap() = Some(world);
        Ok(())
    }

    async fn settings(&self) -> Result<SimulationSettings> {
        self.with_world_mut(|world| {
            let settings = world.settings();
            Ok(SimulationSettings {
                synchronous_mode: settings.synchronous_mode,
                fixed_delta_seconds: settings.fixed_delta_seconds,
            })
        })
    }

    #[instrument(name = "real_carla_apply_settings", skip(self))]
    async fn apply_settings(&self, settings: SimulationSettings) -> Result<()> {
        self.with_world_mut(|world| {
            let mut episode = world.settings();
            episode.synchronous_mode = settings.synchronous_mode;
            episode.fixed_delta_seconds = settings.fixed_delta_seconds;
            world.apply_settings(&episode, SETTINGS_TIMEOUT);
            Ok(())
        })
    }

    #[instrument(name = "real_carla_traffic_manager_sync", skip(self))]
    async fn set_traffic_manager_synchronous(&self, enabled: bool) -> Result<()> {
        let port = *self.port.lock().unwrap();
        self.with_client(|client| {
            // Traffic manager listens on the RPC port + 6000 by default
            let mut tm = client.instance_tm(Some(port + 6000));
            tm.set_synchronous_mode(enabled);
            Ok(())
        })
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.with_world_mut(|world| {
            Ok(world
                .map()
                .recommended_spawn_points()
                .iter()
                .map(Self::from_carla_transform)
                .collect())
        })
    }

    #[instrument(
        name = "real_carla_spawn_vehicle",
        skip(self, transform),
        fields(blueprint = %blueprint)
    )]
    async fn spawn_vehicle(&self, blueprint: &str, transform: Transform) -> Result<ActorId> {
        let vehicle = self.with_world_mut(|world| {
            let vehicle_bp = world
                .blueprint_library()
                .find(blueprint)
                .ok_or_else(|| {
                    SimulationError::vehicle_spawn(blueprint, "blueprint not found")
                })?;
            let actor = world
                .spawn_actor(&vehicle_bp, &Self::to_carla_transform(transform))
                .map_err(|e| SimulationError::vehicle_spawn(blueprint, e.to_string()))?;
            Vehicle::try_from(actor)
                .map_err(|_| SimulationError::vehicle_spawn(blueprint, "spawned actor is not a vehicle"))
        })?;

        let actor_id = vehicle.id();
        debug!(actor_id, blueprint, "vehicle spawned");
        self.actors
            .lock()
            .unwrap()
            .insert(actor_id, ActorType::Vehicle(vehicle));
        Ok(actor_id)
    }

    #[instrument(
        name = "real_carla_spawn_sensor",
        skip(self, transform, attributes),
        fields(blueprint = %blueprint, parent_id)
    )]
    async fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> Result<ActorId> {
        let parent = self
            .vehicle(parent_id)
            .map_err(|_| SimulationError::sensor_spawn(blueprint, parent_id, "parent vehicle not found"))?;

        let sensor = self.with_world_mut(|world| {
            let mut sensor_bp = world
                .blueprint_library()
                .find(blueprint)
                .ok_or_else(|| {
                    SimulationError::sensor_spawn(blueprint, parent_id, "blueprint not found")
                })?;

            for (key, value) in attributes {
                if !sensor_bp.set_attribute(key, value) {
                    warn!(key, value, "failed to set sensor attribute");
                }
            }

            let actor = world
                .spawn_actor_attached(
                    &sensor_bp,
                    &Self::to_carla_transform(transform),
                    &parent,
                    None,
                )
                .map_err(|e| SimulationError::sensor_spawn(blueprint, parent_id, e.to_string()))?;
            Sensor::try_from(actor).map_err(|_| {
                SimulationError::sensor_spawn(blueprint, parent_id, "spawned actor is not a sensor")
            })
        })?;

        let actor_id = sensor.id();
        debug!(actor_id, blueprint, parent_id, "sensor spawned and attached");
        self.actors
            .lock()
            .unwrap()
            .insert(actor_id, ActorType::Sensor(sensor));
        Ok(actor_id)
    }

    #[instrument(name = "real_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let actor = self
            .actors
            .lock()
            .unwrap()
            .remove(&actor_id)
            .ok_or(SimulationError::ActorNotFound { actor_id })?;

        let destroyed = match actor {
            ActorType::Vehicle(v) => v.destroy(),
            ActorType::Sensor(s) => {
                if s.is_listening() {
                    s.stop();
                }
                s.destroy()
            }
        };

        if destroyed {
            debug!(actor_id, "actor destroyed");
            Ok(())
        } else {
            Err(SimulationError::DestroyFailed {
                actor_id,
                message: "server refused destroy".into(),
            })
        }
    }

    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.actors.lock().unwrap().contains_key(&actor_id))
    }

    async fn tick(&self) -> Result<u64> {
        self.with_world_mut(|world| Ok(world.tick()))
    }

    async fn elapsed_seconds(&self) -> Result<f64> {
        self.with_world_mut(|world| Ok(world.snapshot().timestamp().elapsed_seconds))
    }

    async fn set_autopilot(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        let vehicle = self.vehicle(actor_id)?;
        vehicle.set_autopilot(enabled);
        Ok(())
    }

    async fn apply_control(&self, actor_id: ActorId, control: VehicleControl) -> Result<()> {
        let vehicle = self.vehicle(actor_id)?;
        vehicle.apply_control(&CarlaVehicleControl {
            throttle: control.throttle,
            steer: control.steer,
            brake: control.brake,
            hand_brake: false,
            reverse: false,
            manual_gear_shift: false,
            gear: 0,
        });
        Ok(())
    }

    fn sensor_source(&self, actor_id: ActorId) -> Option<Box<dyn SensorSource>> {
        match self.actors.lock().unwrap().get(&actor_id) {
            Some(ActorType::Sensor(sensor)) => {
                Some(Box::new(CarlaSensorSource::new(actor_id, sensor.clone())))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    // Real client tests require CARLA server running

    use super::*;

    #[tokio::test]
    #[ignore = "requires CARLA server"]
    async fn test_real_client_connect_and_load() {
        let client = RealCarlaClient::new();
        client
            .connect("localhost", 2000, Duration::from_secs(10))
            .await
            .unwrap();
        client.load_world("Town03").await.unwrap();
        assert!(!client.spawn_points().await.unwrap().is_empty());
    }
}
