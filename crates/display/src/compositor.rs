//! Display compositor

use contracts::{GrayImage, ProcessedFrame, RgbImage};
use image::{imageops, imageops::FilterType, DynamicImage};
use tracing::{info, warn};

use crate::canvas::Canvas;
use crate::error::RenderError;
use crate::recorder::{ChannelOrder, FrameRecorder, RecordingSummary};

/// Debug thumbnail size (width, height)
pub const THUMBNAIL_SIZE: (u32, u32) = (160, 120);

/// Thumbnails sit this far from the right edge
const THUMBNAIL_RIGHT_MARGIN: u32 = 200;

/// Vertical offsets of the Gray / Edges / Masked thumbnails
const THUMBNAIL_OFFSETS: [u32; 3] = [20, 160, 300];

/// Render counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub rendered: u64,
    /// `render(None)` calls
    pub skipped: u64,
    pub failures: u64,
    pub recorded: u64,
    pub recording_failures: u64,
}

/// Composes the latest frame with debug thumbnails and optionally records it
pub struct DisplayCompositor {
    canvas: Box<dyn Canvas>,
    recorder: Option<Box<dyn FrameRecorder>>,
    stats: RenderStats,
}

impl DisplayCompositor {
    pub fn new(canvas: Box<dyn Canvas>, recorder: Option<Box<dyn FrameRecorder>>) -> Self {
        Self {
            canvas,
            recorder,
            stats: RenderStats::default(),
        }
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Render one frame; no-op without a frame
    ///
    /// Failures are logged and counted, never returned.
    pub fn render(&mut self, frame: Option<&ProcessedFrame>) {
        let Some(frame) = frame else {
            self.stats.skipped += 1;
            return;
        };

        if let Err(e) = self.compose(frame) {
            self.stats.failures += 1;
            metrics::counter!("lane_session_render_errors_total").increment(1);
            warn!(frame = frame.frame(), error = %e, "render failed, skipping frame");
            return;
        }
        self.stats.rendered += 1;
        metrics::counter!("lane_session_frames_rendered_total").increment(1);
    }

    fn compose(&mut self, frame: &ProcessedFrame) -> Result<(), RenderError> {
        self.canvas.blit(frame.result(), 0, 0)?;
        self.record(frame.result());

        let x = self.canvas.size().0.saturating_sub(THUMBNAIL_RIGHT_MARGIN);
        let debug_images = [
            ("Gray", frame.gray()),
            ("Edges", frame.edges()),
            ("Masked", frame.masked()),
        ];
        for ((label, image), y) in debug_images.into_iter().zip(THUMBNAIL_OFFSETS) {
            self.canvas.blit(&thumbnail(image), x, y)?;
            self.canvas.draw_text(label, x, y + THUMBNAIL_SIZE.1)?;
        }

        self.canvas.present()
    }

    fn record(&mut self, result: &RgbImage) {
        let Some(recorder) = self.recorder.as_mut() else {
            return;
        };

        let (width, height) = result.dimensions();
        let appended = match recorder.channel_order() {
            ChannelOrder::Rgb => recorder.append(result.as_raw(), width, height),
            ChannelOrder::Bgr => recorder.append(&rgb_to_bgr(result), width, height),
        };

        match appended {
            Ok(()) => self.stats.recorded += 1,
            Err(e) => {
                self.stats.recording_failures += 1;
                metrics::counter!("lane_session_recording_errors_total").increment(1);
                warn!(error = %e, "failed to append frame to recording");
            }
        }
    }

    /// Finalize the recording, if any
    pub fn finish(&mut self) -> Result<Option<RecordingSummary>, RenderError> {
        let Some(mut recorder) = self.recorder.take() else {
            return Ok(None);
        };
        let summary = recorder.finish()?;
        info!(
            path = %summary.path.display(),
            frames = summary.frames,
            "recording saved"
        );
        Ok(Some(summary))
    }
}

fn thumbnail(image: &GrayImage) -> RgbImage {
    let (w, h) = THUMBNAIL_SIZE;
    let small = imageops::resize(image, w, h, FilterType::Triangle);
    DynamicImage::ImageLuma8(small).into_rgb8()
}

fn rgb_to_bgr(image: &RgbImage) -> Vec<u8> {
    let mut bgr = image.as_raw().clone();
    for px in bgr.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    bgr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::HeadlessCanvas;
    use contracts::LaneDetection;
    use image::{Luma, Rgb};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    fn frame(w: u32, h: u32) -> ProcessedFrame {
        ProcessedFrame::new(
            7,
            0.35,
            LaneDetection {
                result: RgbImage::from_pixel(w, h, Rgb([200, 10, 30])),
                gray: GrayImage::from_pixel(w, h, Luma([100])),
                edges: GrayImage::from_pixel(w, h, Luma([255])),
                masked: GrayImage::from_pixel(w, h, Luma([50])),
            },
        )
        .unwrap()
    }

    /// Canvas handle the test keeps after handing a box to the compositor
    #[derive(Clone)]
    struct SharedCanvas(Arc<Mutex<HeadlessCanvas>>);

    impl Canvas for SharedCanvas {
        fn size(&self) -> (u32, u32) {
            self.0.lock().unwrap().size()
        }
        fn blit(&mut self, image: &RgbImage, x: u32, y: u32) -> Result<(), RenderError> {
            self.0.lock().unwrap().blit(image, x, y)
        }
        fn draw_text(&mut self, text: &str, x: u32, y: u32) -> Result<(), RenderError> {
            self.0.lock().unwrap().draw_text(text, x, y)
        }
        fn present(&mut self) -> Result<(), RenderError> {
            self.0.lock().unwrap().present()
        }
    }

    struct BrokenCanvas;

    impl Canvas for BrokenCanvas {
        fn size(&self) -> (u32, u32) {
            (640, 480)
        }
        fn blit(&mut self, _: &RgbImage, _: u32, _: u32) -> Result<(), RenderError> {
            Err(RenderError::canvas("surface lost"))
        }
        fn draw_text(&mut self, _: &str, _: u32, _: u32) -> Result<(), RenderError> {
            Ok(())
        }
        fn present(&mut self) -> Result<(), RenderError> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct CapturingRecorder(Arc<Mutex<Vec<Vec<u8>>>>);

    impl FrameRecorder for CapturingRecorder {
        fn channel_order(&self) -> ChannelOrder {
            ChannelOrder::Bgr
        }
        fn append(&mut self, pixels: &[u8], _: u32, _: u32) -> Result<(), RenderError> {
            self.0.lock().unwrap().push(pixels.to_vec());
            Ok(())
        }
        fn finish(&mut self) -> Result<RecordingSummary, RenderError> {
            Ok(RecordingSummary {
                path: PathBuf::from("mem"),
                width: 0,
                height: 0,
                fps: 30.0,
                pixel_format: "bgr24",
                frames: self.0.lock().unwrap().len() as u64,
            })
        }
        fn path(&self) -> &Path {
            Path::new("mem")
        }
    }

    #[test]
    fn test_render_none_is_noop() {
        let canvas = SharedCanvas(Arc::new(Mutex::new(HeadlessCanvas::new(640, 480))));
        let mut compositor = DisplayCompositor::new(Box::new(canvas.clone()), None);

        compositor.render(None);

        assert_eq!(canvas.0.lock().unwrap().presented(), 0);
        assert_eq!(compositor.stats().skipped, 1);
        assert_eq!(compositor.stats().rendered, 0);
    }

    #[test]
    fn test_thumbnails_and_labels_at_fixed_offsets() {
        let canvas = SharedCanvas(Arc::new(Mutex::new(HeadlessCanvas::new(640, 480))));
        let mut compositor = DisplayCompositor::new(Box::new(canvas.clone()), None);

        compositor.render(Some(&frame(640, 480)));

        let canvas = canvas.0.lock().unwrap();
        assert_eq!(canvas.presented(), 1);
        let labels: Vec<_> = canvas
            .labels()
            .iter()
            .map(|l| (l.text.as_str(), l.x, l.y))
            .collect();
        assert_eq!(
            labels,
            vec![("Gray", 440, 140), ("Edges", 440, 280), ("Masked", 440, 420)]
        );

        let composed = canvas.frame();
        // Primary image outside the thumbnails
        assert_eq!(composed.get_pixel(10, 10).0, [200, 10, 30]);
        // Inside each thumbnail
        assert_eq!(composed.get_pixel(500, 60).0, [100, 100, 100]);
        assert_eq!(composed.get_pixel(500, 200).0, [255, 255, 255]);
        assert_eq!(composed.get_pixel(500, 340).0, [50, 50, 50]);
    }

    #[test]
    fn test_capture_smaller_than_thumbnail_layout() {
        let recorder = CapturingRecorder::default();
        let canvas = SharedCanvas(Arc::new(Mutex::new(HeadlessCanvas::new(64, 48))));
        let mut compositor = DisplayCompositor::new(
            Box::new(canvas.clone()),
            Some(Box::new(recorder.clone())),
        );

        compositor.render(Some(&frame(64, 48)));

        let stats = compositor.stats();
        assert_eq!(stats.rendered, 1);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.recorded, 1);

        let canvas = canvas.0.lock().unwrap();
        assert_eq!(canvas.presented(), 1);
        // Every label falls below a 48 px surface
        assert!(canvas.labels().is_empty());
        // The Gray thumbnail starts at (0, 20) once the right margin saturates
        assert_eq!(canvas.frame().get_pixel(10, 10).0, [200, 10, 30]);
        assert_eq!(canvas.frame().get_pixel(10, 30).0, [100, 100, 100]);
    }

    #[test]
    fn test_render_failure_is_contained() {
        let mut compositor = DisplayCompositor::new(Box::new(BrokenCanvas), None);
        compositor.render(Some(&frame(32, 24)));
        compositor.render(Some(&frame(32, 24)));
        assert_eq!(compositor.stats().failures, 2);
        assert_eq!(compositor.stats().rendered, 0);
    }

    #[test]
    fn test_recording_gets_bgr_order() {
        let recorder = CapturingRecorder::default();
        let canvas = HeadlessCanvas::new(640, 480);
        let mut compositor =
            DisplayCompositor::new(Box::new(canvas), Some(Box::new(recorder.clone())));

        compositor.render(Some(&frame(640, 480)));
        compositor.render(None);

        let frames = recorder.0.lock().unwrap().clone();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..3], &[30, 10, 200]);

        let summary = compositor.finish().unwrap().unwrap();
        assert_eq!(summary.frames, 1);
        assert!(compositor.finish().unwrap().is_none());
    }
}
