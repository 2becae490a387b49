//! Keyboard input from the terminal
//!
//! Terminals report presses (and auto-repeats) but usually no releases, so a
//! key counts as held for a short window after its last press or repeat.
//! Terminals that do report releases end the hold immediately.

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use session::{HeldKeys, InputEvent, InputSnapshot, InputSource, Key, StopHandle, StopReason};
use tracing::{debug, warn};

/// How long a key stays held after its last press or repeat
const HOLD_WINDOW: Duration = Duration::from_millis(150);

/// Raw-mode terminal keyboard
///
/// Raw mode is enabled on construction and restored on drop.
pub struct TerminalInput {
    last_seen: HashMap<Key, Instant>,
    /// Ctrl-C lands here as an interrupt
    stop: StopHandle,
}

impl TerminalInput {
    pub fn enable(stop: StopHandle) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        debug!("terminal raw mode enabled");
        Ok(Self {
            last_seen: HashMap::new(),
            stop,
        })
    }

    fn apply(&mut self, key: KeyEvent, now: Instant, events: &mut Vec<InputEvent>) {
        // Ctrl-C does not raise SIGINT in raw mode
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            debug!("Ctrl-C from terminal, requesting interrupt");
            self.stop.request(StopReason::Interrupt);
            return;
        }
        let Some(mapped) = map_key(key.code) else {
            return;
        };

        match key.kind {
            KeyEventKind::Press => {
                events.push(InputEvent::KeyDown(mapped));
                self.last_seen.insert(mapped, now);
            }
            KeyEventKind::Repeat => {
                self.last_seen.insert(mapped, now);
            }
            KeyEventKind::Release => {
                self.last_seen.remove(&mapped);
            }
        }
    }

    fn held(&self, now: Instant) -> HeldKeys {
        let is_held = |key| {
            self.last_seen
                .get(&key)
                .is_some_and(|seen| now.duration_since(*seen) <= HOLD_WINDOW)
        };
        HeldKeys {
            forward: is_held(Key::W),
            brake: is_held(Key::S),
            left: is_held(Key::A),
            right: is_held(Key::D),
        }
    }
}

impl InputSource for TerminalInput {
    fn poll(&mut self) -> InputSnapshot {
        let now = Instant::now();
        let mut events = Vec::new();

        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.apply(key, now, &mut events),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "failed to read terminal event");
                        break;
                    }
                },
                Ok(false) => break,
                Err(e) => {
                    warn!(error = %e, "failed to poll terminal events");
                    break;
                }
            }
        }

        InputSnapshot {
            events,
            held: self.held(now),
        }
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::Esc => Key::Escape,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'w' => Key::W,
            's' => Key::S,
            'a' => Key::A,
            'd' => Key::D,
            _ => return None,
        },
        _ => return None,
    })
}
