//! # Ingestion
//!
//! Sensor-callback side of the session.
//!
//! Responsibilities:
//! - Decode BGRA camera payloads to RGB
//! - Run the lane-detection collaborator inside the callback context
//! - Publish each result into the single-slot `FrameHandoffSlot`
//! - Log and count callback failures without touching the slot
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{BasicLaneDetector, CameraIngestion, FrameHandoffSlot};
//!
//! let (writer, reader) = FrameHandoffSlot::new();
//! let source = client.sensor_source(camera_id).unwrap();
//! let ingestion = CameraIngestion::new(source, Arc::new(BasicLaneDetector::default()), writer, (1280, 720));
//! ingestion.start();
//!
//! // main loop
//! if let Some(frame) = reader.read() {
//!     // render
//! }
//! ```

mod config;
mod decode;
mod detector;
mod error;
mod handoff;
mod pipeline;

pub use config::{IngestionMetrics, MetricsSnapshot};
pub use decode::decode_bgra;
pub use detector::{BasicLaneDetector, RegionOfInterest};
pub use error::{CallbackError, Result};
pub use handoff::{FrameHandoffSlot, FrameReader, FrameWriter};
pub use pipeline::CameraIngestion;
