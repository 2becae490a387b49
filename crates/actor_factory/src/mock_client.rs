//! Mock CARLA client
//!
//! In-process simulator used by unit and scenario tests. Keeps a journal of
//! every call it receives and supports injecting failures.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use contracts::{
    ActorId, Location, Rotation, SensorSource, SimulationSettings, Transform, VehicleControl,
};
use tracing::instrument;

use crate::client::SimulationClient;
use crate::error::{Result, SimulationError};
use crate::mock_sensor::{MockCamera, MockCameraConfig};

/// Step length used when ticking a world that is not in fixed-step mode
const FREE_RUNNING_STEP: f64 = 0.05;

/// Mock client configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// `connect` fails
    pub fail_connect: bool,
    /// `load_world` fails
    pub fail_world_load: bool,
    /// `spawn_vehicle` fails
    pub fail_vehicle_spawn: bool,
    /// `spawn_sensor` fails
    pub fail_sensor_spawn: bool,
    /// Actor IDs whose destroy fails
    pub fail_destroy: Vec<ActorId>,
    /// Restoring free-running settings fails (connection lost)
    pub fail_restore_settings: bool,
    /// Tick number (1-based) that fails
    pub fail_tick_at: Option<u64>,
    /// `set_autopilot` fails
    pub fail_autopilot: bool,
    /// Number of spawn points on the map
    pub spawn_point_count: usize,
    /// Camera produced by `spawn_sensor`
    pub camera: MockCameraConfig,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fail_connect: false,
            fail_world_load: false,
            fail_vehicle_spawn: false,
            fail_sensor_spawn: false,
            fail_destroy: Vec::new(),
            fail_restore_settings: false,
            fail_tick_at: None,
            fail_autopilot: false,
            spawn_point_count: 4,
            camera: MockCameraConfig::default(),
        }
    }
}

/// Journal entry: one call received by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    Connect { host: String, port: u16 },
    LoadWorld(String),
    ApplySettings(SimulationSettings),
    TrafficManagerSync(bool),
    SpawnVehicle { actor_id: ActorId, blueprint: String },
    SpawnSensor { actor_id: ActorId, parent_id: ActorId },
    Destroy(ActorId),
    Tick(u64),
    SetAutopilot { actor_id: ActorId, enabled: bool },
    ApplyControl { actor_id: ActorId, control: VehicleControl },
}

#[derive(Debug, Clone)]
struct MockActor {
    blueprint: String,
    parent: Option<ActorId>,
    autopilot: bool,
}

#[derive(Default)]
struct MockWorld {
    connected: bool,
    town: Option<String>,
    settings: SimulationSettings,
    traffic_manager_sync: bool,
    frame: u64,
    /// Simulated time in whole nanoseconds, so repeated steps do not drift
    elapsed_ns: u64,
    actors: BTreeMap<ActorId, MockActor>,
    cameras: HashMap<ActorId, MockCamera>,
    journal: Vec<SimCall>,
}

impl MockWorld {
    fn elapsed_secs(&self) -> f64 {
        self.elapsed_ns as f64 / 1e9
    }
}

/// Mock CARLA client
pub struct MockSimulationClient {
    /// 配置（可注入失败场景）
    config: MockConfig,
    next_actor_id: Mutex<ActorId>,
    world: Mutex<MockWorld>,
}

impl MockSimulationClient {
    /// 创建默认 mock 客户端
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 客户端
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            next_actor_id: Mutex::new(1000), // 从 1000 开始，便于识别
            world: Mutex::new(MockWorld::default()),
        }
    }

    /// Every call received so far, in order
    pub fn journal(&self) -> Vec<SimCall> {
        self.world.lock().unwrap().journal.clone()
    }

    /// Number of successful ticks
    pub fn tick_count(&self) -> usize {
        self.journal()
            .iter()
            .filter(|c| matches!(c, SimCall::Tick(_)))
            .count()
    }

    /// Destroy attempts in the order they were made (including failed ones)
    pub fn destroy_order(&self) -> Vec<ActorId> {
        self.journal()
            .iter()
            .filter_map(|c| match c {
                SimCall::Destroy(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Current world settings
    pub fn current_settings(&self) -> SimulationSettings {
        self.world.lock().unwrap().settings
    }

    /// Current traffic manager mode
    pub fn traffic_manager_sync(&self) -> bool {
        self.world.lock().unwrap().traffic_manager_sync
    }

    /// 获取当前已创建的 actor 数量
    pub fn actor_count(&self) -> usize {
        self.world.lock().unwrap().actors.len()
    }

    /// Autopilot state of a live vehicle
    pub fn autopilot(&self, actor_id: ActorId) -> Option<bool> {
        self.world
            .lock()
            .unwrap()
            .actors
            .get(&actor_id)
            .map(|a| a.autopilot)
    }

    /// Blueprint of a live actor
    pub fn blueprint_of(&self, actor_id: ActorId) -> Option<String> {
        self.world
            .lock()
            .unwrap()
            .actors
            .get(&actor_id)
            .map(|a| a.blueprint.clone())
    }

    /// Camera handle for a spawned sensor
    pub fn camera(&self, actor_id: ActorId) -> Option<MockCamera> {
        self.world.lock().unwrap().cameras.get(&actor_id).cloned()
    }

    fn allocate_actor_id(&self) -> ActorId {
        let mut next = self.next_actor_id.lock().unwrap();
        let id = *next;
        *next += 1;
        id
    }

    fn ensure_world(world: &MockWorld) -> Result<()> {
        if world.connected && world.town.is_some() {
            Ok(())
        } else {
            Err(SimulationError::NotConnected)
        }
    }
}

impl Default for MockSimulationClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationClient for MockSimulationClient {
    #[instrument(name = "mock_carla_connect", skip(self, _timeout), fields(host = %host, port))]
    async fn connect(&self, host: &str, port: u16, _timeout: Duration) -> Result<()> {
        if self.config.fail_connect {
            return Err(SimulationError::ConnectionFailed {
                message: "mock failure".into(),
            });
        }
        let mut world = self.world.lock().unwrap();
        world.connected = true;
        world.journal.push(SimCall::Connect {
            host: host.to_string(),
            port,
        });
        Ok(())
    }

    #[instrument(name = "mock_carla_load_world", skip(self), fields(town = %town))]
    async fn load_world(&self, town: &str) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        if !world.connected {
            return Err(SimulationError::NotConnected);
        }
        if self.config.fail_world_load {
            return Err(SimulationError::WorldLoadFailed {
                town: town.to_string(),
                message: "mock failure".into(),
            });
        }
        world.town = Some(town.to_string());
        world.journal.push(SimCall::LoadWorld(town.to_string()));
        Ok(())
    }

    async fn settings(&self) -> Result<SimulationSettings> {
        let world = self.world.lock().unwrap();
        Self::ensure_world(&world)?;
        Ok(world.settings)
    }

    #[instrument(name = "mock_carla_apply_settings", skip(self))]
    async fn apply_settings(&self, settings: SimulationSettings) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        Self::ensure_world(&world)?;
        if self.config.fail_restore_settings && !settings.synchronous_mode {
            return Err(SimulationError::SettingsFailed {
                message: "mock connection lost".into(),
            });
        }
        world.settings = settings;
        world.journal.push(SimCall::ApplySettings(settings));
        Ok(())
    }

    async fn set_traffic_manager_synchronous(&self, enabled: bool) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        Self::ensure_world(&world)?;
        world.traffic_manager_sync = enabled;
        world.journal.push(SimCall::TrafficManagerSync(enabled));
        Ok(())
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        let world = self.world.lock().unwrap();
        Self::ensure_world(&world)?;
        Ok((0..self.config.spawn_point_count)
            .map(|i| Transform {
                location: Location {
                    x: 10.0 * i as f64,
                    y: 0.0,
                    z: 0.5,
                },
                rotation: Rotation::default(),
            })
            .collect())
    }

    #[instrument(name = "mock_carla_spawn_vehicle", skip(self, _transform), fields(blueprint = %blueprint))]
    async fn spawn_vehicle(&self, blueprint: &str, _transform: Transform) -> Result<ActorId> {
        {
            let world = self.world.lock().unwrap();
            Self::ensure_world(&world)?;
        }
        if self.config.fail_vehicle_spawn {
            return Err(SimulationError::vehicle_spawn(blueprint, "mock failure"));
        }

        let actor_id = self.allocate_actor_id();
        let mut world = self.world.lock().unwrap();
        world.actors.insert(
            actor_id,
            MockActor {
                blueprint: blueprint.to_string(),
                parent: None,
                autopilot: false,
            },
        );
        world.journal.push(SimCall::SpawnVehicle {
            actor_id,
            blueprint: blueprint.to_string(),
        });
        Ok(actor_id)
    }

    #[instrument(
        name = "mock_carla_spawn_sensor",
        skip(self, _transform, attributes),
        fields(blueprint = %blueprint, parent_id)
    )]
    async fn spawn_sensor(
        &self,
        blueprint: &str,
        _transform: Transform,
        parent_id: ActorId,
        attributes: &HashMap<String, String>,
    ) -> Result<ActorId> {
        {
            let world = self.world.lock().unwrap();
            Self::ensure_world(&world)?;
            // 验证 parent 存在
            if !world.actors.contains_key(&parent_id) {
                return Err(SimulationError::sensor_spawn(
                    blueprint,
                    parent_id,
                    "parent actor not found",
                ));
            }
        }
        if self.config.fail_sensor_spawn {
            return Err(SimulationError::sensor_spawn(
                blueprint,
                parent_id,
                "mock failure",
            ));
        }

        let mut camera_config = self.config.camera.clone();
        if let Some(w) = attributes.get("image_size_x").and_then(|v| v.parse().ok()) {
            camera_config.width = w;
        }
        if let Some(h) = attributes.get("image_size_y").and_then(|v| v.parse().ok()) {
            camera_config.height = h;
        }

        let actor_id = self.allocate_actor_id();
        let mut world = self.world.lock().unwrap();
        world.actors.insert(
            actor_id,
            MockActor {
                blueprint: blueprint.to_string(),
                parent: Some(parent_id),
                autopilot: false,
            },
        );
        world
            .cameras
            .insert(actor_id, MockCamera::new(actor_id, camera_config));
        world.journal.push(SimCall::SpawnSensor {
            actor_id,
            parent_id,
        });
        Ok(actor_id)
    }

    #[instrument(name = "mock_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        world.journal.push(SimCall::Destroy(actor_id));

        if self.config.fail_destroy.contains(&actor_id) {
            return Err(SimulationError::DestroyFailed {
                actor_id,
                message: "mock failure".into(),
            });
        }

        if world.actors.remove(&actor_id).is_none() {
            return Err(SimulationError::ActorNotFound { actor_id });
        }
        if let Some(camera) = world.cameras.remove(&actor_id) {
            camera.stop();
        }
        Ok(())
    }

    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.world.lock().unwrap().actors.contains_key(&actor_id))
    }

    #[instrument(name = "mock_carla_tick", skip(self))]
    async fn tick(&self) -> Result<u64> {
        let (frame, elapsed, cameras) = {
            let mut world = self.world.lock().unwrap();
            Self::ensure_world(&world)?;

            let next = world.frame + 1;
            if self.config.fail_tick_at == Some(next) {
                return Err(SimulationError::TickFailed {
                    message: format!("mock failure at tick {next}"),
                });
            }

            world.frame = next;
            let step = world.settings.fixed_delta_seconds.unwrap_or(FREE_RUNNING_STEP);
            world.elapsed_ns += (step * 1e9).round() as u64;
            world.journal.push(SimCall::Tick(next));
            let cameras: Vec<MockCamera> = world.cameras.values().cloned().collect();
            (world.frame, world.elapsed_secs(), cameras)
        };

        // Sensor delivery happens outside the world lock, like the simulator's
        // own callback threads.
        for camera in cameras {
            camera.trigger(frame, elapsed);
        }
        Ok(frame)
    }

    async fn elapsed_seconds(&self) -> Result<f64> {
        let world = self.world.lock().unwrap();
        Self::ensure_world(&world)?;
        Ok(world.elapsed_secs())
    }

    async fn set_autopilot(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        if self.config.fail_autopilot {
            return Err(SimulationError::control(actor_id, "mock failure"));
        }
        let actor = world
            .actors
            .get_mut(&actor_id)
            .filter(|a| a.parent.is_none())
            .ok_or(SimulationError::ActorNotFound { actor_id })?;
        actor.autopilot = enabled;
        world
            .journal
            .push(SimCall::SetAutopilot { actor_id, enabled });
        Ok(())
    }

    async fn apply_control(&self, actor_id: ActorId, control: VehicleControl) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        if !world.actors.contains_key(&actor_id) {
            return Err(SimulationError::ActorNotFound { actor_id });
        }
        world
            .journal
            .push(SimCall::ApplyControl { actor_id, control });
        Ok(())
    }

    fn sensor_source(&self, actor_id: ActorId) -> Option<Box<dyn SensorSource>> {
        self.camera(actor_id)
            .map(|camera| Box::new(camera) as Box<dyn SensorSource>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected(config: MockConfig) -> MockSimulationClient {
        let client = MockSimulationClient::with_config(config);
        client
            .connect("localhost", 2000, Duration::from_secs(1))
            .await
            .unwrap();
        client.load_world("Town03").await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_mock_spawn_vehicle_and_sensor() {
        let client = connected(MockConfig::default()).await;

        let vehicle_id = client
            .spawn_vehicle("vehicle.tesla.model3", Transform::default())
            .await
            .unwrap();
        let sensor_id = client
            .spawn_sensor(
                "sensor.camera.rgb",
                Transform::default(),
                vehicle_id,
                &HashMap::new(),
            )
            .await
            .unwrap();

        assert!(vehicle_id >= 1000);
        assert!(sensor_id > vehicle_id);
        assert_eq!(client.actor_count(), 2);
        assert!(client.sensor_source(sensor_id).is_some());
        assert!(client.sensor_source(vehicle_id).is_none());
        assert_eq!(
            client.blueprint_of(sensor_id).as_deref(),
            Some("sensor.camera.rgb")
        );
        assert_eq!(client.autopilot(vehicle_id), Some(false));
    }

    #[tokio::test]
    async fn test_sensor_requires_parent() {
        let client = connected(MockConfig::default()).await;
        let err = client
            .spawn_sensor("sensor.camera.rgb", Transform::default(), 42, &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::SensorSpawnFailed { .. }));
    }

    #[tokio::test]
    async fn test_tick_advances_by_fixed_delta() {
        let client = connected(MockConfig::default()).await;
        client
            .apply_settings(SimulationSettings::lockstep(0.05))
            .await
            .unwrap();

        for _ in 0..4 {
            client.tick().await.unwrap();
        }
        let elapsed = client.elapsed_seconds().await.unwrap();
        assert!((elapsed - 0.2).abs() < 1e-9);
        assert_eq!(client.tick_count(), 4);
    }

    #[tokio::test]
    async fn test_tick_failure_injected() {
        let client = connected(MockConfig {
            fail_tick_at: Some(2),
            ..Default::default()
        })
        .await;
        assert!(client.tick().await.is_ok());
        assert!(matches!(
            client.tick().await,
            Err(SimulationError::TickFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_double_destroy_reports_not_found() {
        let client = connected(MockConfig::default()).await;
        let actor_id = client
            .spawn_vehicle("vehicle.tesla.model3", Transform::default())
            .await
            .unwrap();
        client.destroy_actor(actor_id).await.unwrap();
        let second = client.destroy_actor(actor_id).await;
        assert!(matches!(second, Err(SimulationError::ActorNotFound { .. })));
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_operations_require_world() {
        let client = MockSimulationClient::new();
        assert!(matches!(
            client.tick().await,
            Err(SimulationError::NotConnected)
        ));
    }
}
