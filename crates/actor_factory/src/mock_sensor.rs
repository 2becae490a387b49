//! Mock camera implementation
//!
//! Implements `SensorSource`, producing one synthetic BGRA frame per world tick.
//! Used for testing and development without CARLA environment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use bytes::Bytes;
use contracts::{ActorId, CameraImage, SensorDataCallback, SensorSource};
use tracing::{debug, trace, warn};

/// How frames reach the callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Callback runs on the ticking thread before `tick()` returns
    Inline,
    /// Callback runs on a dedicated sensor thread, some time after the tick
    #[default]
    Threaded,
}

/// Mock camera configuration
#[derive(Debug, Clone)]
pub struct MockCameraConfig {
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Delivery context
    pub delivery: DeliveryMode,
    /// Frames delivered with a truncated payload (decode failure)
    pub corrupt_frames: Vec<u64>,
}

impl Default for MockCameraConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            delivery: DeliveryMode::Threaded,
            corrupt_frames: Vec::new(),
        }
    }
}

struct Shared {
    actor_id: ActorId,
    config: MockCameraConfig,
    listening: AtomicBool,
    callback: Mutex<Option<SensorDataCallback>>,
    worker_tx: Mutex<Option<Sender<(u64, f64)>>>,
}

/// Mock camera
///
/// Cheap to clone; clones share state so the mock client can trigger
/// delivery on the same instance the ingestion layer listens on.
#[derive(Clone)]
pub struct MockCamera {
    shared: Arc<Shared>,
}

impl MockCamera {
    /// Create new mock camera
    pub fn new(actor_id: ActorId, config: MockCameraConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                actor_id,
                config,
                listening: AtomicBool::new(false),
                callback: Mutex::new(None),
                worker_tx: Mutex::new(None),
            }),
        }
    }

    /// Deliver the frame for a completed tick
    ///
    /// No-op while not listening.
    pub fn trigger(&self, frame: u64, timestamp: f64) {
        if !self.shared.listening.load(Ordering::SeqCst) {
            return;
        }

        match self.shared.config.delivery {
            DeliveryMode::Inline => {
                let callback = self.shared.callback.lock().unwrap().clone();
                if let Some(callback) = callback {
                    callback(Self::generate_image(&self.shared.config, frame, timestamp));
                }
            }
            DeliveryMode::Threaded => {
                if let Some(tx) = self.shared.worker_tx.lock().unwrap().as_ref() {
                    if tx.send((frame, timestamp)).is_err() {
                        warn!(actor_id = self.shared.actor_id, "mock camera worker gone");
                    }
                }
            }
        }
    }

    /// Generate a synthetic road image: dark asphalt with two bright lane markings
    /// converging toward the horizon.
    fn generate_image(config: &MockCameraConfig, frame: u64, timestamp: f64) -> CameraImage {
        let (w, h) = (config.width as usize, config.height as usize);
        let mut data = vec![0u8; w * h * 4];
        let horizon = h / 2;

        for y in 0..h {
            let depth = if y > horizon {
                (y - horizon) as f64 / (h - horizon).max(1) as f64
            } else {
                0.0
            };
            let half_span = depth * w as f64 * 0.35;
            let left = (w as f64 / 2.0 - half_span) as usize;
            let right = (w as f64 / 2.0 + half_span) as usize;

            for x in 0..w {
                let idx = (y * w + x) * 4;
                let on_lane = y > horizon && (x.abs_diff(left) <= 1 || x.abs_diff(right) <= 1);
                let value = if on_lane {
                    240
                } else if y > horizon {
                    70
                } else {
                    150
                };
                data[idx] = value; // B
                data[idx + 1] = value; // G
                data[idx + 2] = value; // R
                data[idx + 3] = 255; // A
            }
        }

        if config.corrupt_frames.contains(&frame) {
            data.truncate(data.len() / 2);
        }

        CameraImage {
            frame,
            timestamp,
            width: config.width,
            height: config.height,
            data: Bytes::from(data),
        }
    }

    fn spawn_worker(&self) {
        let (tx, rx) = mpsc::channel::<(u64, f64)>();
        *self.shared.worker_tx.lock().unwrap() = Some(tx);

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(format!("mock-camera-{}", shared.actor_id))
            .spawn(move || {
                debug!(actor_id = shared.actor_id, "mock camera worker started");
                while let Ok((frame, timestamp)) = rx.recv() {
                    if !shared.listening.load(Ordering::SeqCst) {
                        break;
                    }
                    let callback = shared.callback.lock().unwrap().clone();
                    if let Some(callback) = callback {
                        callback(Self::generate_image(&shared.config, frame, timestamp));
                        trace!(actor_id = shared.actor_id, frame, "mock frame delivered");
                    }
                }
                debug!(actor_id = shared.actor_id, "mock camera worker stopped");
            });

        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn mock camera worker");
        }
    }
}

impl SensorSource for MockCamera {
    fn actor_id(&self) -> ActorId {
        self.shared.actor_id
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't register again
        if self.shared.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        *self.shared.callback.lock().unwrap() = Some(callback);
        if self.shared.config.delivery == DeliveryMode::Threaded {
            self.spawn_worker();
        }
    }

    fn stop(&self) {
        if self.shared.listening.swap(false, Ordering::SeqCst) {
            // Dropping the sender ends the worker loop
            self.shared.worker_tx.lock().unwrap().take();
            self.shared.callback.lock().unwrap().take();
        }
    }

    fn is_listening(&self) -> bool {
        self.shared.listening.load(Ordering::SeqCst)
    }
}
