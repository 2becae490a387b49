//! Recording collaborator
//!
//! Appends the primary result image of every rendered frame. Each recorder
//! declares the channel order it expects; the compositor converts.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use contracts::{RecordingConfig, RecordingFormat};
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::RenderError;

/// Interleaved channel order expected by a recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// Summary written when a recording is finalized
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub pixel_format: &'static str,
    pub frames: u64,
}

/// Recording sink
pub trait FrameRecorder: Send {
    fn channel_order(&self) -> ChannelOrder;

    /// Append one frame, interleaved 8-bit pixels in `channel_order()`
    fn append(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<(), RenderError>;

    /// Flush and close. Safe to call more than once.
    fn finish(&mut self) -> Result<RecordingSummary, RenderError>;

    /// Output location
    fn path(&self) -> &Path;
}

/// Recording base name: `lane_detection_<YYYYMMDD_HHMMSS>`
pub fn recording_name(started_at: DateTime<Local>) -> String {
    format!("lane_detection_{}", started_at.format("%Y%m%d_%H%M%S"))
}

/// Open the recorder selected by the configuration
pub fn open_recorder(
    config: &RecordingConfig,
    started_at: DateTime<Local>,
) -> Result<Box<dyn FrameRecorder>, RenderError> {
    let name = recording_name(started_at);
    fs::create_dir_all(&config.output_dir)?;

    let recorder: Box<dyn FrameRecorder> = match config.format {
        RecordingFormat::RawBgr => Box::new(RawBgrRecorder::create(
            config.output_dir.join(format!("{name}.bgr")),
            config.fps,
        )?),
        RecordingFormat::PngSequence => Box::new(PngSequenceRecorder::create(
            config.output_dir.join(name),
            config.fps,
        )?),
    };
    info!(path = %recorder.path().display(), format = ?config.format, "recording started");
    Ok(recorder)
}

/// Raw BGR24 stream plus a JSON sidecar describing it
pub struct RawBgrRecorder {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    fps: f64,
    size: Option<(u32, u32)>,
    frames: u64,
}

impl RawBgrRecorder {
    pub fn create(path: PathBuf, fps: f64) -> Result<Self, RenderError> {
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            fps,
            size: None,
            frames: 0,
        })
    }

    fn sidecar_path(&self) -> PathBuf {
        self.path.with_extension("json")
    }

    fn summary(&self) -> RecordingSummary {
        let (width, height) = self.size.unwrap_or_default();
        RecordingSummary {
            path: self.path.clone(),
            width,
            height,
            fps: self.fps,
            pixel_format: "bgr24",
            frames: self.frames,
        }
    }
}

impl FrameRecorder for RawBgrRecorder {
    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Bgr
    }

    fn append(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<(), RenderError> {
        let expected = *self.size.get_or_insert((width, height));
        if expected != (width, height) {
            return Err(RenderError::RecordingShape {
                expected,
                actual: (width, height),
            });
        }

        let writer = self.writer.as_mut().ok_or_else(|| {
            RenderError::Io(std::io::Error::other("recording already finished"))
        })?;
        writer.write_all(pixels)?;
        self.frames += 1;
        Ok(())
    }

    #[instrument(name = "raw_recorder_finish", skip(self), fields(path = %self.path.display()))]
    fn finish(&mut self) -> Result<RecordingSummary, RenderError> {
        let summary = self.summary();
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            let sidecar = File::create(self.sidecar_path())?;
            serde_json::to_writer_pretty(sidecar, &summary)?;
            info!(frames = summary.frames, "recording finalized");
        }
        Ok(summary)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

/// One PNG per frame in a directory
pub struct PngSequenceRecorder {
    dir: PathBuf,
    fps: f64,
    size: Option<(u32, u32)>,
    frames: u64,
}

impl PngSequenceRecorder {
    pub fn create(dir: PathBuf, fps: f64) -> Result<Self, RenderError> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            fps,
            size: None,
            frames: 0,
        })
    }
}

impl FrameRecorder for PngSequenceRecorder {
    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Rgb
    }

    fn append(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<(), RenderError> {
        let expected = *self.size.get_or_insert((width, height));
        if expected != (width, height) {
            return Err(RenderError::RecordingShape {
                expected,
                actual: (width, height),
            });
        }

        let path = self.dir.join(format!("frame_{:06}.png", self.frames + 1));
        let image = RgbImage::from_raw(width, height, pixels.to_vec()).ok_or_else(|| {
            RenderError::RecordingShape {
                expected,
                actual: (width, height),
            }
        })?;
        image
            .save(&path)
            .map_err(|source| RenderError::Encode { path: path.clone(), source })?;

        self.frames += 1;
        debug!(path = %path.display(), "frame written");
        Ok(())
    }

    fn finish(&mut self) -> Result<RecordingSummary, RenderError> {
        let (width, height) = self.size.unwrap_or_default();
        Ok(RecordingSummary {
            path: self.dir.clone(),
            width,
            height,
            fps: self.fps,
            pixel_format: "png",
            frames: self.frames,
        })
    }

    fn path(&self) -> &Path {
        &self.dir
    }
}
