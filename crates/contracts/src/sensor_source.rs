//! SensorSource trait - camera data source abstraction
//!
//! Decouples the ingestion callback from the concrete sensor, so real CARLA
//! cameras and mock cameras are handled the same way.

use std::sync::Arc;

use crate::CameraImage;

/// Camera data callback type
///
/// Invoked on the simulator-owned callback context, once per tick.
pub type SensorDataCallback = Arc<dyn Fn(CameraImage) + Send + Sync>;

/// Sensor data source trait
///
/// # Example
///
/// ```ignore
/// let camera: Box<dyn SensorSource> = client.sensor_source(actor_id)?;
/// camera.listen(Arc::new(|image| {
///     println!("frame {}", image.frame);
/// }));
/// // ... run the loop ...
/// camera.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Actor handle of the sensor
    fn actor_id(&self) -> crate::ActorId;

    /// Register data callback
    ///
    /// Repeated calls while listening are ignored.
    fn listen(&self, callback: SensorDataCallback);

    /// Stop delivering data
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
