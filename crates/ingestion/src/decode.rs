//! Camera payload decoding

use contracts::{CameraImage, RgbImage};

use crate::error::{CallbackError, Result};

/// Decode a BGRA8 camera payload into an RGB image, dropping alpha
pub fn decode_bgra(image: &CameraImage) -> Result<RgbImage> {
    let expected = image.expected_len();
    let length_error = || CallbackError::PayloadLength {
        frame: image.frame,
        expected,
        actual: image.data.len(),
    };

    if image.data.len() != expected {
        return Err(length_error());
    }

    let mut rgb = Vec::with_capacity(expected / 4 * 3);
    for px in image.data.chunks_exact(4) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }

    RgbImage::from_raw(image.width, image.height, rgb).ok_or_else(length_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn camera_image(data: Vec<u8>, width: u32, height: u32) -> CameraImage {
        CameraImage {
            frame: 1,
            timestamp: 0.05,
            width,
            height,
            data: Bytes::from(data),
        }
    }

    #[test]
    fn test_bgra_to_rgb_channel_order() {
        // 2x1: pure blue, pure red (BGRA)
        let image = camera_image(vec![255, 0, 0, 255, 0, 0, 255, 255], 2, 1);
        let rgb = decode_bgra(&image).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 0, 0]);
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let image = camera_image(vec![0; 7], 2, 1);
        let err = decode_bgra(&image).unwrap_err();
        assert!(matches!(
            err,
            CallbackError::PayloadLength {
                expected: 8,
                actual: 7,
                ..
            }
        ));
    }
}
