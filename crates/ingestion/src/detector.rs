//! Built-in lane detector
//!
//! Grayscale, blur, gradient edges, trapezoid region of interest, then paints
//! the surviving edge pixels onto the input frame. Any `LaneDetector` can be
//! used in its place.

use contracts::{ContractError, GrayImage, LaneDetection, LaneDetector, RgbImage};
use image::{imageops, Luma, Rgb};

/// Region of interest as fractions of (width, height)
#[derive(Debug, Clone, Copy)]
pub struct RegionOfInterest {
    /// Top edge of the trapezoid
    pub top: f32,
    /// Half-width of the top edge around the image center
    pub top_half_width: f32,
    /// Half-width of the bottom edge around the image center
    pub bottom_half_width: f32,
}

impl Default for RegionOfInterest {
    fn default() -> Self {
        Self {
            top: 0.6,
            top_half_width: 0.05,
            bottom_half_width: 0.4,
        }
    }
}

impl RegionOfInterest {
    fn contains(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        let fy = y as f32 / height as f32;
        if fy < self.top {
            return false;
        }
        let t = (fy - self.top) / (1.0 - self.top);
        let half = self.top_half_width + t * (self.bottom_half_width - self.top_half_width);
        let fx = x as f32 / width as f32;
        (fx - 0.5).abs() <= half
    }
}

/// Simple gradient-based lane detector
#[derive(Debug, Clone)]
pub struct BasicLaneDetector {
    pub blur_sigma: f32,
    /// Minimum |gx| + |gy| of the Sobel response to count as an edge
    pub edge_threshold: i32,
    pub region: RegionOfInterest,
    pub overlay: Rgb<u8>,
}

impl Default for BasicLaneDetector {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            edge_threshold: 150,
            region: RegionOfInterest::default(),
            overlay: Rgb([255, 0, 0]),
        }
    }
}

impl BasicLaneDetector {
    fn sobel(&self, gray: &GrayImage) -> GrayImage {
        let (w, h) = gray.dimensions();
        let mut edges = GrayImage::new(w, h);
        let at = |x: u32, y: u32| gray.get_pixel(x, y)[0] as i32;

        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let gx = at(x + 1, y - 1) + 2 * at(x + 1, y) + at(x + 1, y + 1)
                    - at(x - 1, y - 1)
                    - 2 * at(x - 1, y)
                    - at(x - 1, y + 1);
                let gy = at(x - 1, y + 1) + 2 * at(x, y + 1) + at(x + 1, y + 1)
                    - at(x - 1, y - 1)
                    - 2 * at(x, y - 1)
                    - at(x + 1, y - 1);
                if gx.abs() + gy.abs() >= self.edge_threshold {
                    edges.put_pixel(x, y, Luma([255]));
                }
            }
        }
        edges
    }
}

impl LaneDetector for BasicLaneDetector {
    fn process_image(&self, rgb: &RgbImage) -> Result<LaneDetection, ContractError> {
        let (w, h) = rgb.dimensions();
        if w < 3 || h < 3 {
            return Err(ContractError::detection(format!(
                "image {w}x{h} too small for edge detection"
            )));
        }

        let gray = imageops::grayscale(rgb);
        let blurred = imageops::blur(&gray, self.blur_sigma);
        let edges = self.sobel(&blurred);

        let mut masked = GrayImage::new(w, h);
        for (x, y, px) in edges.enumerate_pixels() {
            if px[0] > 0 && self.region.contains(x, y, w, h) {
                masked.put_pixel(x, y, *px);
            }
        }

        let mut result = rgb.clone();
        for (x, y, px) in masked.enumerate_pixels() {
            if px[0] > 0 {
                result.put_pixel(x, y, self.overlay);
            }
        }

        Ok(LaneDetection {
            result,
            gray,
            edges,
            masked,
        })
    }
}
