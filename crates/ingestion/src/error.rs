//! Ingestion 错误类型

use contracts::ContractError;
use thiserror::Error;

/// Failure inside the sensor-callback context
///
/// Always logged and counted; the handoff slot is left unwritten for that tick.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// 相机数据长度与声明尺寸不符
    #[error("frame {frame}: payload is {actual} bytes, expected {expected}")]
    PayloadLength {
        frame: u64,
        expected: usize,
        actual: usize,
    },

    /// 相机分辨率与配置不符
    #[error("frame {frame}: image is {actual:?}, capture size is {expected:?}")]
    Resolution {
        frame: u64,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// 车道检测失败
    #[error("frame {frame}: lane detection failed: {source}")]
    Detection {
        frame: u64,
        #[source]
        source: ContractError,
    },

    /// 检测输出尺寸不一致
    #[error("frame {frame}: invalid processed frame: {source}")]
    InvalidFrame {
        frame: u64,
        #[source]
        source: ContractError,
    },
}

impl CallbackError {
    /// Simulator frame the failure belongs to
    pub fn frame(&self) -> u64 {
        match self {
            Self::PayloadLength { frame, .. }
            | Self::Resolution { frame, .. }
            | Self::Detection { frame, .. }
            | Self::InvalidFrame { frame, .. } => *frame,
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, CallbackError>;
