//! Session error types and failure policies

use actor_factory::{ActorId, SimulationError};
use display::RenderError;
use thiserror::Error;

/// Setup step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    Connect,
    LoadWorld,
    Lockstep,
    SpawnPoints,
    Vehicle,
    Autopilot,
    Camera,
}

impl std::fmt::Display for SetupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::LoadWorld => "load world",
            Self::Lockstep => "enable lock-step",
            Self::SpawnPoints => "read spawn points",
            Self::Vehicle => "spawn vehicle",
            Self::Autopilot => "set initial autopilot",
            Self::Camera => "spawn camera",
        };
        f.write_str(name)
    }
}

/// Errors that end a session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Setup step failed; the loop was never entered
    #[error("setup failed at '{stage}': {source}")]
    Setup {
        stage: SetupStage,
        #[source]
        source: SimulationError,
    },

    /// Recording could not be opened
    #[error("failed to open recording: {0}")]
    Recording(#[source] RenderError),

    /// Spawned camera has no data source
    #[error("camera actor {actor_id} has no sensor source")]
    SensorUnavailable { actor_id: ActorId },

    /// World tick failed inside the loop
    #[error("simulation tick failed: {0}")]
    Tick(#[source] SimulationError),

    /// A loop step panicked
    #[error("session loop panicked: {message}")]
    Panicked { message: String },
}

impl SessionError {
    pub(crate) fn setup(stage: SetupStage) -> impl FnOnce(SimulationError) -> Self {
        move |source| Self::Setup { stage, source }
    }

    /// Failure kind for the policy table
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Setup { .. } | Self::Recording(_) | Self::SensorUnavailable { .. } => {
                FailureKind::Setup
            }
            Self::Tick(_) | Self::Panicked { .. } => FailureKind::Loop,
        }
    }
}

/// Failure categories seen by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection, world load, spawn or recording open
    Setup,
    /// Tick failure or panic inside the loop
    Loop,
    /// Decode / detection failure in the sensor callback
    Callback,
    /// Compose / present / recording append failure
    Render,
    /// Autopilot toggle or manual control failure
    Control,
    /// Actor destroy or settings restore failure
    Teardown,
    /// External stop request
    Interrupt,
}

/// What the session does about a failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort before the loop; release what was spawned and report
    AbortSetup,
    /// Leave the loop through cleanup and report
    EndSession,
    /// Log and keep going
    LogAndContinue,
    /// Leave the loop through cleanup as a normal stop
    StopGracefully,
}

impl FailureKind {
    pub fn policy(self) -> FailurePolicy {
        match self {
            Self::Setup => FailurePolicy::AbortSetup,
            Self::Loop => FailurePolicy::EndSession,
            Self::Callback | Self::Render | Self::Control | Self::Teardown => {
                FailurePolicy::LogAndContinue
            }
            Self::Interrupt => FailurePolicy::StopGracefully,
        }
    }

    /// Whether this kind is returned to the caller as an error
    pub fn is_fatal(self) -> bool {
        matches!(
            self.policy(),
            FailurePolicy::AbortSetup | FailurePolicy::EndSession
        )
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SessionError>;
