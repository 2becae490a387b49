//! Control input translation

use contracts::VehicleControl;

use crate::input::{InputEvent, InputSnapshot, Key};

/// Steering magnitude for the left / right keys
pub const MANUAL_STEER: f32 = 0.3;

/// Translator output for one iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlDecision {
    /// Autopilot state after this iteration's toggles
    pub autopilot_enabled: bool,
    /// Manual command; only produced while autopilot is off
    pub manual: Option<VehicleControl>,
    /// Quit or escape seen
    pub stop_requested: bool,
}

/// Maps input to an autopilot toggle or a manual command
///
/// Stateless: the caller owns the autopilot flag and passes it in each time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlInputTranslator;

impl ControlInputTranslator {
    pub fn new() -> Self {
        Self
    }

    pub fn translate(&self, input: &InputSnapshot, autopilot_enabled: bool) -> ControlDecision {
        let mut autopilot = autopilot_enabled;
        let mut stop_requested = false;

        for event in &input.events {
            match event {
                InputEvent::Quit | InputEvent::KeyDown(Key::Escape) => stop_requested = true,
                InputEvent::KeyDown(Key::Space) => autopilot = !autopilot,
                InputEvent::KeyDown(_) => {}
            }
        }

        let manual = (!autopilot).then(|| {
            let held = input.held;
            let mut control = VehicleControl::default();
            if held.forward {
                control.throttle = 1.0;
            }
            if held.brake {
                control.brake = 1.0;
            }
            if held.left {
                control.steer = MANUAL_STEER;
            }
            // Evaluated last, so right wins when both are held
            if held.right {
                control.steer = -MANUAL_STEER;
            }
            control
        });

        ControlDecision {
            autopilot_enabled: autopilot,
            manual,
            stop_requested,
        }
    }
}
