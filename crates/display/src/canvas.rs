//! Drawing collaborator

use contracts::RgbImage;
use image::{imageops, Rgb};
use tracing::trace;

use crate::error::RenderError;

/// Drawing surface the compositor renders onto
///
/// Pixel rendering and font rasterization belong to the implementation.
pub trait Canvas: Send {
    /// Surface size (width, height)
    fn size(&self) -> (u32, u32);

    /// Copy `image` with its top-left corner at (x, y), clipping at the edges
    fn blit(&mut self, image: &RgbImage, x: u32, y: u32) -> Result<(), RenderError>;

    /// Draw a white text label with its top-left corner at (x, y)
    fn draw_text(&mut self, text: &str, x: u32, y: u32) -> Result<(), RenderError>;

    /// Show the composed frame
    fn present(&mut self) -> Result<(), RenderError>;
}

/// A label drawn on the headless canvas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLabel {
    pub text: String,
    pub x: u32,
    pub y: u32,
}

/// In-memory canvas
///
/// Composites into an `RgbImage`. Labels are recorded rather than rasterized.
pub struct HeadlessCanvas {
    back: RgbImage,
    front: RgbImage,
    pending_labels: Vec<TextLabel>,
    labels: Vec<TextLabel>,
    presented: u64,
}

impl HeadlessCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            back: RgbImage::new(width, height),
            front: RgbImage::new(width, height),
            pending_labels: Vec::new(),
            labels: Vec::new(),
            presented: 0,
        }
    }

    /// Last presented frame
    pub fn frame(&self) -> &RgbImage {
        &self.front
    }

    /// Labels of the last presented frame
    pub fn labels(&self) -> &[TextLabel] {
        &self.labels
    }

    /// Number of `present` calls
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Canvas for HeadlessCanvas {
    fn size(&self) -> (u32, u32) {
        self.back.dimensions()
    }

    fn blit(&mut self, image: &RgbImage, x: u32, y: u32) -> Result<(), RenderError> {
        imageops::overlay(&mut self.back, image, x as i64, y as i64);
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: u32, y: u32) -> Result<(), RenderError> {
        let (w, h) = self.back.dimensions();
        if x >= w || y >= h {
            // Clipped like an off-surface blit
            trace!(text, x, y, "label outside the surface, dropped");
            return Ok(());
        }
        // Marker pixel so the position is visible in the composed frame
        self.back.put_pixel(x, y, Rgb([255, 255, 255]));
        self.pending_labels.push(TextLabel {
            text: text.to_string(),
            x,
            y,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.front.clone_from(&self.back);
        self.labels = std::mem::take(&mut self.pending_labels);
        self.presented += 1;
        Ok(())
    }
}
