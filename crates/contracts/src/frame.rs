//! Camera payloads and processed frames.

use bytes::Bytes;
use image::{GrayImage, RgbImage};

use crate::ContractError;

/// Raw camera image as delivered by the sensor callback
///
/// Pixels are interleaved BGRA8, row-major, `width * height * 4` bytes.
#[derive(Debug, Clone)]
pub struct CameraImage {
    /// Simulator frame number
    pub frame: u64,

    /// Simulated time of capture (seconds)
    pub timestamp: f64,

    pub width: u32,

    pub height: u32,

    /// BGRA8 pixel data (zero-copy)
    pub data: Bytes,
}

impl CameraImage {
    /// Expected payload length for the declared dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Lane-detection collaborator output
///
/// `(result, gray, edges, masked)`, all at capture resolution.
#[derive(Debug, Clone)]
pub struct LaneDetection {
    pub result: RgbImage,
    pub gray: GrayImage,
    pub edges: GrayImage,
    pub masked: GrayImage,
}

/// Frame ready for display
///
/// Constructed only in the sensor-callback context and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFrame {
    frame: u64,
    timestamp: f64,
    result: RgbImage,
    gray: GrayImage,
    edges: GrayImage,
    masked: GrayImage,
}

impl ProcessedFrame {
    /// Build a frame, checking every image has the same dimensions
    ///
    /// # Errors
    /// `ContractError::FrameShape` if any debug image differs in size from `result`.
    pub fn new(frame: u64, timestamp: f64, detection: LaneDetection) -> Result<Self, ContractError> {
        let expected = detection.result.dimensions();
        for (name, dims) in [
            ("gray", detection.gray.dimensions()),
            ("edges", detection.edges.dimensions()),
            ("masked", detection.masked.dimensions()),
        ] {
            if dims != expected {
                return Err(ContractError::FrameShape {
                    image: name.to_string(),
                    expected,
                    actual: dims,
                });
            }
        }

        Ok(Self {
            frame,
            timestamp,
            result: detection.result,
            gray: detection.gray,
            edges: detection.edges,
            masked: detection.masked,
        })
    }

    /// Simulator frame number the image was captured at
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated capture time (seconds)
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.result.dimensions()
    }

    /// Annotated RGB result
    pub fn result(&self) -> &RgbImage {
        &self.result
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn edges(&self) -> &GrayImage {
        &self.edges
    }

    pub fn masked(&self) -> &GrayImage {
        &self.masked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(w: u32, h: u32) -> LaneDetection {
        LaneDetection {
            result: RgbImage::new(w, h),
            gray: GrayImage::new(w, h),
            edges: GrayImage::new(w, h),
            masked: GrayImage::new(w, h),
        }
    }

    #[test]
    fn test_matching_dimensions_accepted() {
        let frame = ProcessedFrame::new(3, 0.15, detection(8, 4)).unwrap();
        assert_eq!(frame.dimensions(), (8, 4));
        assert_eq!(frame.frame(), 3);
    }

    #[test]
    fn test_mismatched_edges_rejected() {
        let mut det = detection(8, 4);
        det.edges = GrayImage::new(4, 4);
        let err = ProcessedFrame::new(0, 0.0, det).unwrap_err();
        assert!(matches!(err, ContractError::FrameShape { ref image, .. } if image == "edges"));
    }
}
