//! # Lockstep
//!
//! 仿真时钟驱动与主循环节拍。
//!
//! 负责：
//! - 进入固定步长同步模式（世界设置 + traffic manager 一起切换）
//! - 每次主循环迭代恰好推进一次
//! - 退出时恢复自由运行模式（幂等，失败只记录）
//! - 将主循环限制在目标频率
//!
//! ## 使用示例
//!
//! ```ignore
//! use lockstep::{FramePacer, SimulationClockDriver, LOCKSTEP_DELTA_SECONDS};
//!
//! let mut clock = SimulationClockDriver::new(client.clone());
//! clock.enable_lockstep(LOCKSTEP_DELTA_SECONDS).await?;
//! let mut pacer = FramePacer::new(20);
//!
//! loop {
//!     let sim_time = clock.advance().await?;
//!     // ...
//!     pacer.wait().await;
//! }
//!
//! clock.restore_freerunning().await;
//! ```

mod clock;
mod pacer;

pub use clock::{ClockState, SimulationClockDriver, LOCKSTEP_DELTA_SECONDS};
pub use pacer::FramePacer;
