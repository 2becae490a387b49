//! Input events and sources

use std::collections::VecDeque;

/// Keys the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    /// Autopilot toggle
    Space,
    /// Throttle
    W,
    /// Brake
    S,
    /// Steer left
    A,
    /// Steer right
    D,
}

/// Discrete input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Window closed or equivalent
    Quit,
    KeyDown(Key),
}

/// Keys currently held down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys {
    pub forward: bool,
    pub brake: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldKeys {
    pub fn any(&self) -> bool {
        self.forward || self.brake || self.left || self.right
    }
}

/// Input gathered during one loop iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub events: Vec<InputEvent>,
    pub held: HeldKeys,
}

impl InputSnapshot {
    pub fn key(key: Key) -> Self {
        Self {
            events: vec![InputEvent::KeyDown(key)],
            held: HeldKeys::default(),
        }
    }

    pub fn holding(held: HeldKeys) -> Self {
        Self {
            events: Vec::new(),
            held,
        }
    }
}

/// Source of per-iteration input
pub trait InputSource: Send {
    /// Drain pending events and report held keys. Must not block.
    fn poll(&mut self) -> InputSnapshot;
}

/// No input at all
#[derive(Debug, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn poll(&mut self) -> InputSnapshot {
        InputSnapshot::default()
    }
}

/// Replays a fixed sequence of snapshots, one per poll, then empty ones
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: VecDeque<InputSnapshot>,
}

impl ScriptedInput {
    pub fn new(script: impl IntoIterator<Item = InputSnapshot>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> InputSnapshot {
        self.script.pop_front().unwrap_or_default()
    }
}
