//! # Actor Factory
//!
//! Simulation connection and actor lifecycle.
//!
//! Responsibilities:
//! - Define the `SimulationClient` collaborator contract
//! - Spawn the ego vehicle and its camera in order, track them
//! - Guaranteed reverse-order teardown
//! - Mock simulator for tests and offline runs
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate and a
//!   libcarla build environment)

pub mod client;
pub mod error;
pub mod lifecycle;
pub mod mock_client;
pub mod mock_sensor;

#[cfg(feature = "real-carla")]
pub mod carla_client;
#[cfg(feature = "real-carla")]
pub mod carla_sensor_source;
#[cfg(feature = "real-carla")]
pub mod sensor_data_converter;

pub use client::SimulationClient;
pub use contracts::{Actor, ActorId, SensorSource};
pub use error::{Result, SimulationError, TeardownError};
pub use lifecycle::{ActorLifecycleManager, TeardownReport};
pub use mock_client::{MockConfig, MockSimulationClient, SimCall};
pub use mock_sensor::{DeliveryMode, MockCamera, MockCameraConfig};

#[cfg(feature = "real-carla")]
pub use carla_client::RealCarlaClient;
#[cfg(feature = "real-carla")]
pub use carla_sensor_source::CarlaSensorSource;
