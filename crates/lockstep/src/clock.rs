//! Simulation clock driver

use std::sync::Arc;

use actor_factory::{SimulationClient, SimulationError, TeardownError};
use contracts::SimulationSettings;
use tracing::{debug, error, info, instrument};

/// Fixed step length while the session runs (20 steps per simulated second)
pub const LOCKSTEP_DELTA_SECONDS: f64 = 1.0 / 20.0;

/// Clock driver state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockState {
    /// Simulator runs on its own clock
    FreeRunning,
    /// Lock-step was requested; the simulator may hold lock-step settings
    Lockstep { delta_seconds: f64 },
}

/// Drives the simulation clock in lock-step
///
/// `advance()` must be called exactly once per main-loop iteration. The
/// driver counts calls but does not guard against extra ones.
pub struct SimulationClockDriver<C: SimulationClient> {
    client: Arc<C>,
    state: ClockState,
    ticks: u64,
    sim_time: f64,
}

impl<C: SimulationClient> SimulationClockDriver<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            state: ClockState::FreeRunning,
            ticks: 0,
            sim_time: 0.0,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Advances issued so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated elapsed time after the latest advance (seconds)
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Simulated steps per second while in lock-step
    pub fn fps(&self) -> Option<f64> {
        match self.state {
            ClockState::Lockstep { delta_seconds } if delta_seconds > 0.0 => {
                Some(1.0 / delta_seconds)
            }
            _ => None,
        }
    }

    /// Switch the world and the traffic manager to fixed-step synchronous mode
    ///
    /// The driver is considered engaged as soon as this is called, so a later
    /// `restore_freerunning` also covers a half-applied switch.
    #[instrument(name = "clock_enable_lockstep", skip(self))]
    pub async fn enable_lockstep(&mut self, delta_seconds: f64) -> Result<(), SimulationError> {
        self.state = ClockState::Lockstep { delta_seconds };

        self.client
            .apply_settings(SimulationSettings::lockstep(delta_seconds))
            .await?;
        self.client.set_traffic_manager_synchronous(true).await?;

        let applied = self.client.settings().await?;
        info!(
            fps = applied.fps().unwrap_or_default(),
            "synchronous mode enabled"
        );
        Ok(())
    }

    /// Advance the world by exactly one step
    ///
    /// # Returns
    /// Simulated elapsed seconds after the step
    pub async fn advance(&mut self) -> Result<f64, SimulationError> {
        let frame = self.client.tick().await?;
        self.ticks += 1;
        self.sim_time = self.client.elapsed_seconds().await?;

        metrics::counter!("lane_session_ticks_total").increment(1);
        metrics::gauge!("lane_session_sim_time_seconds").set(self.sim_time);
        debug!(frame, sim_time = self.sim_time, "world advanced");
        Ok(self.sim_time)
    }

    /// Return the world and the traffic manager to free-running mode
    ///
    /// Idempotent. Never fails: problems are logged and returned for the
    /// teardown summary.
    #[instrument(name = "clock_restore_freerunning", skip(self))]
    pub async fn restore_freerunning(&mut self) -> Vec<TeardownError> {
        if self.state == ClockState::FreeRunning {
            return Vec::new();
        }
        self.state = ClockState::FreeRunning;

        let mut failures = Vec::new();
        if let Err(e) = self
            .client
            .apply_settings(SimulationSettings::free_running())
            .await
        {
            error!(error = %e, "failed to restore asynchronous mode");
            failures.push(TeardownError::new("world settings", e));
        }
        if let Err(e) = self.client.set_traffic_manager_synchronous(false).await {
            error!(error = %e, "failed to restore traffic manager mode");
            failures.push(TeardownError::new("traffic manager", e));
        }

        if failures.is_empty() {
            info!("restored asynchronous mode");
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_factory::{MockConfig, MockSimulationClient, SimCall};
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
    async fn test_enable_sets_world_and_traffic_manager() {
        let client = connected(MockConfig::default()).await;
        let mut clock = SimulationClockDriver::new(client.clone());

        clock.enable_lockstep(LOCKSTEP_DELTA_SECONDS).await.unwrap();

        assert_eq!(
            client.current_settings(),
            SimulationSettings::lockstep(LOCKSTEP_DELTA_SECONDS)
        );
        assert!(client.traffic_manager_sync());
        assert!((clock.fps().unwrap() - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_advance_once_per_call() {
        let client = connected(MockConfig::default()).await;
        let mut clock = SimulationClockDriver::new(client.clone());
        clock.enable_lockstep(LOCKSTEP_DELTA_SECONDS).await.unwrap();

        let mut last = 0.0;
        for _ in 0..10 {
            let t = clock.advance().await.unwrap();
            assert!(t > last);
            last = t;
        }
        assert_eq!(clock.ticks(), 10);
        assert_eq!(client.tick_count(), 10);
        assert!((clock.sim_time() - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_restore_is_idempotent() {
        let client = connected(MockConfig::default()).await;
        let mut clock = SimulationClockDriver::new(client.clone());
        clock.enable_lockstep(LOCKSTEP_DELTA_SECONDS).await.unwrap();

        assert!(clock.restore_freerunning().await.is_empty());
        assert!(clock.restore_freerunning().await.is_empty());

        assert_eq!(client.current_settings(), SimulationSettings::free_running());
        assert!(!client.traffic_manager_sync());
        let restores = client
            .journal()
            .iter()
            .filter(|c| matches!(c, SimCall::ApplySettings(s) if !s.synchronous_mode))
            .count();
        assert_eq!(restores, 1);
    }

    #[tokio::test]
    async fn test_restore_failure_is_reported_not_raised() {
        let client = connected(MockConfig {
            fail_restore_settings: true,
            ..Default::default()
        })
        .await;
        let mut clock = SimulationClockDriver::new(client.clone());
        clock.enable_lockstep(LOCKSTEP_DELTA_SECONDS).await.unwrap();

        let failures = clock.restore_freerunning().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(clock.state(), ClockState::FreeRunning);
        // Traffic manager is still restored
        assert!(!client.traffic_manager_sync());
    }

    #[tokio::test]
    async fn test_restore_without_enable_is_noop() {
        let client = connected(MockConfig::default()).await;
        let mut clock = SimulationClockDriver::new(client.clone());
        assert!(clock.restore_freerunning().await.is_empty());
        assert!(client.journal().iter().all(|c| !matches!(c, SimCall::ApplySettings(_))));
    }
}
