//! # Contracts
//!
//! Frozen interface contracts shared by every session crate: the data model,
//! configuration, and the traits external collaborators implement.
//! Business crates depend on this crate, never the reverse.
//!
//! ## Time Model
//! - Simulated elapsed time (seconds, f64) is the only clock
//! - `frame` numbers come from the simulator and are used for diagnostics

mod collaborator;
mod error;
mod frame;
mod runtime;
mod sensor_source;
mod session_config;

pub use collaborator::*;
pub use error::*;
pub use frame::*;
pub use runtime::*;
pub use sensor_source::{SensorDataCallback, SensorSource};
pub use session_config::*;

pub use image::{GrayImage, RgbImage};
