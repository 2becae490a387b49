//! CARLA Sensor SensorSource wrapper
//!
//! Wraps CARLA native camera Sensor as a type implementing `SensorSource` trait.
//! Only compiled when `real-carla` feature is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use carla::client::Sensor;
use contracts::{ActorId, SensorDataCallback, SensorSource};
use tracing::{debug, trace, warn};

use crate::sensor_data_converter::convert_camera_image;

/// CARLA camera wrapper
///
/// The simulator invokes the listener on its own thread, once per tick.
pub struct CarlaSensorSource {
    actor_id: ActorId,
    sensor: Sensor,
    listening: Arc<AtomicBool>,
}

impl CarlaSensorSource {
    pub fn new(actor_id: ActorId, sensor: Sensor) -> Self {
        Self {
            actor_id,
            sensor,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SensorSource for CarlaSensorSource {
    fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't register again
        if self.listening.swap(true, Ordering::SeqCst) {
            warn!(actor_id = self.actor_id, "sensor already listening");
            return;
        }

        let actor_id = self.actor_id;
        let listening = self.listening.clone();
        debug!(actor_id, "starting CARLA camera");

        self.sensor.listen(move |sensor_data| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            match convert_camera_image(&sensor_data) {
                Some(image) => {
                    trace!(actor_id, frame = image.frame, "CARLA camera image received");
                    callback(image);
                }
                None => trace!(actor_id, "sensor data is not a camera image"),
            }
        });
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(actor_id = self.actor_id, "stopping CARLA camera");
            self.sensor.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
