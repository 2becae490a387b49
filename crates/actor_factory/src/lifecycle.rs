//! ActorLifecycleManager 核心实现
//!
//! Spawn vehicle 和 sensor，按注册顺序跟踪，保证 teardown。

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{Actor, ActorKind, Transform};
use tracing::{error, info, instrument, warn};

use crate::client::SimulationClient;
use crate::error::{Result, SimulationError, TeardownError};

/// Outcome of one teardown pass
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Actors destroyed successfully, in destroy order
    pub released: Vec<Actor>,
    /// Per-resource failures (logged, never propagated)
    pub failures: Vec<TeardownError>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Actor Lifecycle Manager
///
/// 唯一持有 session 内所有 actor 的组件。vehicle 必须先于 sensor spawn 并注册；
/// teardown 按注册的逆序销毁。
pub struct ActorLifecycleManager<C: SimulationClient> {
    client: Arc<C>,
    actors: Vec<Actor>,
}

impl<C: SimulationClient> ActorLifecycleManager<C> {
    /// 创建新的 ActorLifecycleManager
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            actors: Vec::new(),
        }
    }

    /// Registered actors in registration order
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// First registered vehicle
    pub fn vehicle(&self) -> Option<&Actor> {
        self.actors.iter().find(|a| a.is_vehicle())
    }

    /// Spawn a vehicle and register it
    #[instrument(
        name = "lifecycle_spawn_vehicle",
        skip(self, spawn_point),
        fields(blueprint = %blueprint)
    )]
    pub async fn spawn_vehicle(&mut self, blueprint: &str, spawn_point: Transform) -> Result<Actor> {
        info!("spawning vehicle");
        let actor_id = self.client.spawn_vehicle(blueprint, spawn_point).await?;
        let actor = Actor::vehicle(actor_id, blueprint);
        self.register(actor.clone());

        info!(actor_id, "vehicle spawned successfully");
        Ok(actor)
    }

    /// Spawn a sensor attached to an already registered vehicle and register it
    ///
    /// Fails with `SpawnOrder` if `attach_to` is not a registered vehicle.
    #[instrument(
        name = "lifecycle_spawn_sensor",
        skip(self, transform, attach_to, attributes),
        fields(blueprint = %blueprint, parent_id = attach_to.id)
    )]
    pub async fn spawn_sensor(
        &mut self,
        blueprint: &str,
        transform: Transform,
        attach_to: &Actor,
        attributes: &HashMap<String, String>,
    ) -> Result<Actor> {
        let parent_registered = self
            .actors
            .iter()
            .any(|a| a.id == attach_to.id && a.is_vehicle());
        if !parent_registered {
            return Err(SimulationError::SpawnOrder {
                message: format!(
                    "sensor '{}' requires vehicle {} to be spawned and registered first",
                    blueprint, attach_to.id
                ),
            });
        }

        info!(?attributes, "spawning sensor");
        let actor_id = self
            .client
            .spawn_sensor(blueprint, transform, attach_to.id, attributes)
            .await?;
        let actor = Actor::sensor(actor_id, blueprint, attach_to.id);
        self.register(actor.clone());

        info!(actor_id, "sensor spawned and attached successfully");
        Ok(actor)
    }

    /// Track an actor for teardown. Registering the same ID twice is a no-op.
    pub fn register(&mut self, actor: Actor) {
        if self.actors.iter().any(|a| a.id == actor.id) {
            warn!(actor_id = actor.id, "actor already registered");
            return;
        }
        self.actors.push(actor);
    }

    /// Release every registered actor
    ///
    /// Autopilot is turned off on vehicles first, then actors are destroyed in
    /// reverse registration order. Individual failures are logged and collected;
    /// the pass always runs to completion. The registry is drained, so a second
    /// call releases nothing.
    #[instrument(
        name = "lifecycle_teardown",
        skip(self),
        fields(actor_count = self.actors.len())
    )]
    pub async fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();
        if self.actors.is_empty() {
            return report;
        }

        info!("starting teardown");
        let actors = std::mem::take(&mut self.actors);

        for vehicle in actors.iter().filter(|a| a.is_vehicle()) {
            if let Err(e) = self.client.set_autopilot(vehicle.id, false).await {
                error!(actor_id = vehicle.id, error = %e, "failed to disable autopilot");
                report
                    .failures
                    .push(TeardownError::new(describe(vehicle), e));
            }
        }

        for actor in actors.into_iter().rev() {
            match self.destroy_actor_safe(&actor).await {
                Ok(()) => report.released.push(actor),
                Err(e) => report.failures.push(TeardownError::new(describe(&actor), e)),
            }
        }

        info!(
            released = report.released.len(),
            failures = report.failures.len(),
            "teardown completed"
        );
        report
    }

    #[instrument(
        name = "lifecycle_destroy_actor",
        skip(self, actor),
        fields(actor_id = actor.id, blueprint = %actor.blueprint)
    )]
    async fn destroy_actor_safe(&self, actor: &Actor) -> Result<()> {
        info!("destroying actor");

        let result = self.client.destroy_actor(actor.id).await;
        if let Err(e) = &result {
            error!(error = %e, "failed to destroy actor");
        }
        result
    }
}

fn describe(actor: &Actor) -> String {
    match actor.kind {
        ActorKind::Vehicle => format!("vehicle {} ({})", actor.id, actor.blueprint),
        ActorKind::Sensor { parent } => {
            format!("sensor {} ({}) on {}", actor.id, actor.blueprint, parent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_client::{MockConfig, MockSimulationClient, SimCall};
    use std::time::Duration;

    async fn connected(config: MockConfig) -> Arc<MockSimulationClient> {
        let client = Arc::new(MockSimulationClient::with_config(config));
        client
            .connect("localhost", 2000, Duration::from_secs(1))
            .await
            .unwrap();
        client.load_world("Town03").await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_spawn_registers_in_order() {
        let client = connected(MockConfig::default()).await;
        let mut manager = ActorLifecycleManager::new(client.clone());

        let vehicle = manager
            .spawn_vehicle("vehicle.tesla.model3", Transform::default())
            .await
            .unwrap();
        let camera = manager
            .spawn_sensor(
                "sensor.camera.rgb",
                Transform::default(),
                &vehicle,
                &HashMap::new(),
            )
            .await
            .unwrap();

        let ids: Vec<_> = manager.actors().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![vehicle.id, camera.id]);
        assert_eq!(manager.vehicle().map(|a| a.id), Some(vehicle.id));
    }

    #[tokio::test]
    async fn test_sensor_before_vehicle_is_spawn_order_error() {
        let client = connected(MockConfig::default()).await;
        let mut manager = ActorLifecycleManager::new(client.clone());

        let unregistered = Actor::vehicle(4242, "vehicle.tesla.model3");
        let err = manager
            .spawn_sensor(
                "sensor.camera.rgb",
                Transform::default(),
                &unregistered,
                &HashMap::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SimulationError::SpawnOrder { .. }));
        assert!(manager.actors().is_empty());
    }

    #[tokio::test]
    async fn test_teardown_disables_autopilot_then_reverse_destroy() {
        let client = connected(MockConfig::default()).await;
        let mut manager = ActorLifecycleManager::new(client.clone());

        let vehicle = manager
            .spawn_vehicle("vehicle.tesla.model3", Transform::default())
            .await
            .unwrap();
        let camera = manager
            .spawn_sensor(
                "sensor.camera.rgb",
                Transform::default(),
                &vehicle,
                &HashMap::new(),
            )
            .await
            .unwrap();

        let report = manager.teardown().await;
        assert!(report.is_clean());
        assert_eq!(client.destroy_order(), vec![camera.id, vehicle.id]);

        let journal = client.journal();
        let autopilot_pos = journal
            .iter()
            .position(|c| {
                matches!(c, SimCall::SetAutopilot { enabled: false, actor_id } if *actor_id == vehicle.id)
            })
            .unwrap();
        let first_destroy = journal
            .iter()
            .position(|c| matches!(c, SimCall::Destroy(_)))
            .unwrap();
        assert!(autopilot_pos < first_destroy);
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_teardown_continues_past_failed_destroy() {
        // 第二个 spawn 的 actor（1001）销毁失败
        let client = connected(MockConfig {
            fail_destroy: vec![1001],
            ..Default::default()
        })
        .await;
        let mut manager = ActorLifecycleManager::new(client.clone());

        let vehicle = manager
            .spawn_vehicle("vehicle.tesla.model3", Transform::default())
            .await
            .unwrap();
        let camera = manager
            .spawn_sensor(
                "sensor.camera.rgb",
                Transform::default(),
                &vehicle,
                &HashMap::new(),
            )
            .await
            .unwrap();
        assert_eq!(camera.id, 1001);

        let report = manager.teardown().await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.released.len(), 1);
        assert_eq!(client.destroy_order(), vec![camera.id, vehicle.id]);
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let client = connected(MockConfig::default()).await;
        let mut manager = ActorLifecycleManager::new(client.clone());
        manager
            .spawn_vehicle("vehicle.tesla.model3", Transform::default())
            .await
            .unwrap();

        manager.teardown().await;
        let second = manager.teardown().await;
        assert!(second.released.is_empty());
        assert!(second.is_clean());
        assert_eq!(client.destroy_order().len(), 1);
    }
}
