//! Camera ingestion: the sensor-callback side of the session
//!
//! Owns the camera's `SensorSource` and the producer end of the frame slot.
//! Each delivered image is decoded, run through the lane detector and
//! published; failures are logged and the slot is left untouched.

use std::sync::Arc;

use contracts::{CameraImage, LaneDetector, ProcessedFrame, SensorDataCallback, SensorSource};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::IngestionMetrics;
use crate::decode::decode_bgra;
use crate::error::{CallbackError, Result};
use crate::handoff::FrameWriter;

/// Camera ingestion
pub struct CameraIngestion {
    source: Box<dyn SensorSource>,
    handler: Arc<FrameHandler>,
}

struct FrameHandler {
    detector: Arc<dyn LaneDetector>,
    writer: FrameWriter,
    capture_size: (u32, u32),
    metrics: Arc<IngestionMetrics>,
}

impl FrameHandler {
    fn process(&self, image: &CameraImage) -> Result<ProcessedFrame> {
        if (image.width, image.height) != self.capture_size {
            return Err(CallbackError::Resolution {
                frame: image.frame,
                expected: self.capture_size,
                actual: (image.width, image.height),
            });
        }

        let rgb = decode_bgra(image)?;
        let detection =
            self.detector
                .process_image(&rgb)
                .map_err(|source| CallbackError::Detection {
                    frame: image.frame,
                    source,
                })?;

        ProcessedFrame::new(image.frame, image.timestamp, detection).map_err(|source| {
            CallbackError::InvalidFrame {
                frame: image.frame,
                source,
            }
        })
    }

    fn handle(&self, image: CameraImage) {
        self.metrics.record_received();

        match self.process(&image) {
            Ok(frame) => {
                let overwrote = self.writer.write(frame);
                self.metrics.record_published(overwrote);
                trace!(frame = image.frame, overwrote, "frame published");
            }
            Err(e) => {
                self.metrics.record_callback_error();
                warn!(frame = e.frame(), error = %e, "camera callback failed, frame dropped");
            }
        }
    }
}

impl CameraIngestion {
    /// Create ingestion for one camera
    ///
    /// # Arguments
    /// * `source` - camera data source
    /// * `detector` - lane-detection collaborator
    /// * `writer` - producer end of the handoff slot
    /// * `capture_size` - configured (width, height); other sizes are rejected
    pub fn new(
        source: Box<dyn SensorSource>,
        detector: Arc<dyn LaneDetector>,
        writer: FrameWriter,
        capture_size: (u32, u32),
    ) -> Self {
        Self {
            source,
            handler: Arc::new(FrameHandler {
                detector,
                writer,
                capture_size,
                metrics: Arc::new(IngestionMetrics::new()),
            }),
        }
    }

    /// Register the callback with the sensor
    #[instrument(name = "ingestion_start", skip(self), fields(actor_id = self.source.actor_id()))]
    pub fn start(&self) {
        if self.source.is_listening() {
            debug!("camera already listening");
            return;
        }

        let handler = self.handler.clone();
        let callback: SensorDataCallback = Arc::new(move |image| handler.handle(image));
        self.source.listen(callback);
        info!("camera ingestion started");
    }

    /// Stop the sensor; safe to call repeatedly
    #[instrument(name = "ingestion_stop", skip(self), fields(actor_id = self.source.actor_id()))]
    pub fn stop(&self) {
        if self.source.is_listening() {
            self.source.stop();
            info!("camera ingestion stopped");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.source.is_listening()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.handler.metrics.clone()
    }
}

impl Drop for CameraIngestion {
    fn drop(&mut self) {
        self.stop();
    }
}
