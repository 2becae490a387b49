//! # Display
//!
//! 画面合成与录制模块。
//!
//! 负责：
//! - 合成主画面与三个调试缩略图（Gray / Edges / Masked）
//! - 通过 `Canvas` 绘图协作者输出
//! - 可选录制：按录制协作者要求的通道顺序追加结果图像
//! - 渲染失败只记录，不终止 session

pub mod canvas;
pub mod compositor;
pub mod error;
pub mod recorder;

pub use canvas::{Canvas, HeadlessCanvas, TextLabel};
pub use compositor::{DisplayCompositor, RenderStats, THUMBNAIL_SIZE};
pub use error::RenderError;
pub use recorder::{
    open_recorder, recording_name, ChannelOrder, FrameRecorder, PngSequenceRecorder,
    RawBgrRecorder, RecordingSummary,
};
