//! CARLA 传感器数据转换
//!
//! 将 CARLA 原生相机数据转换为 `CameraImage`。
//! 仅在 `real-carla` feature 启用时编译。

use bytes::Bytes;
use carla::sensor::data::Image;
use carla::sensor::{SensorData, SensorDataBase};
use contracts::CameraImage;

/// 将 CARLA 传感器数据转换为 CameraImage
///
/// 数据不是图像时返回 None。像素保持 CARLA 的 BGRA 排列，由 ingestion 解码。
pub fn convert_camera_image(data: &SensorData) -> Option<CameraImage> {
    let timestamp = data.timestamp();
    let frame = data.frame() as u64;
    let image = Image::try_from(data.clone()).ok()?;

    Some(CameraImage {
        frame,
        timestamp,
        width: image.width() as u32,
        height: image.height() as u32,
        data: Bytes::copy_from_slice(image.as_raw_bytes()),
    })
}
