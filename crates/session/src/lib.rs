//! # Session
//!
//! Closed-loop lane-detection session.
//!
//! Responsibilities:
//! - Setup: connect, load the town, enable lock-step, spawn vehicle then camera
//! - Main loop: advance → validation gate → input → control → render → pace
//! - Guaranteed cleanup on every exit path
//! - Explicit error kinds and their policies
//!
//! ## Usage Example
//!
//! ```ignore
//! use session::SessionController;
//!
//! let controller = SessionController::new(config, Arc::new(client))
//!     .with_input(Box::new(terminal_input));
//! let stop = controller.stop_handle();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     stop.request(StopReason::Interrupt);
//! });
//! let report = controller.run().await?;
//! report.stats.print_summary();
//! ```

mod control;
mod controller;
mod error;
mod input;
mod stats;
mod stop;
mod validation;

pub use control::{ControlDecision, ControlInputTranslator, MANUAL_STEER};
pub use controller::{SessionController, SessionReport};
pub use error::{FailureKind, FailurePolicy, Result, SessionError, SetupStage};
pub use input::{HeldKeys, InputEvent, InputSnapshot, InputSource, Key, NoInput, ScriptedInput};
pub use stats::SessionStats;
pub use stop::{StopHandle, StopReason};
pub use validation::{FrameLogValidator, ValidationPhase, ValidationScheduler};
