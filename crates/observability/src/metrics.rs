//! Session 指标定义与统计
//!
//! 指标名称集中定义在这里；各 crate 在热路径上直接调用 `metrics` 宏。

use std::time::Duration;

use metrics::{describe_counter, describe_gauge, describe_histogram, histogram, Unit};

pub const TICKS_TOTAL: &str = "lane_session_ticks_total";
pub const SIM_TIME_SECONDS: &str = "lane_session_sim_time_seconds";
pub const FRAMES_RECEIVED_TOTAL: &str = "lane_session_frames_received_total";
pub const FRAMES_PUBLISHED_TOTAL: &str = "lane_session_frames_published_total";
pub const FRAMES_OVERWRITTEN_TOTAL: &str = "lane_session_frames_overwritten_total";
pub const CALLBACK_ERRORS_TOTAL: &str = "lane_session_callback_errors_total";
pub const FRAMES_RENDERED_TOTAL: &str = "lane_session_frames_rendered_total";
pub const RENDER_ERRORS_TOTAL: &str = "lane_session_render_errors_total";
pub const RECORDING_ERRORS_TOTAL: &str = "lane_session_recording_errors_total";
pub const VALIDATION_RUNS_TOTAL: &str = "lane_session_validation_runs_total";
pub const CONTROL_ERRORS_TOTAL: &str = "lane_session_control_errors_total";
pub const TEARDOWN_FAILURES_TOTAL: &str = "lane_session_teardown_failures_total";
pub const LOOP_ITERATION_SECONDS: &str = "lane_session_loop_iteration_seconds";

/// 注册指标描述（在 recorder 安装之后调用）
pub fn describe_session_metrics() {
    describe_counter!(TICKS_TOTAL, "World advances issued by the session loop");
    describe_gauge!(
        SIM_TIME_SECONDS,
        Unit::Seconds,
        "Simulated elapsed time after the latest advance"
    );
    describe_counter!(FRAMES_RECEIVED_TOTAL, "Camera images delivered to the callback");
    describe_counter!(FRAMES_PUBLISHED_TOTAL, "Processed frames written into the handoff slot");
    describe_counter!(
        FRAMES_OVERWRITTEN_TOTAL,
        "Published frames that replaced an unread frame"
    );
    describe_counter!(CALLBACK_ERRORS_TOTAL, "Decode or detection failures in the callback");
    describe_counter!(FRAMES_RENDERED_TOTAL, "Frames composed and presented");
    describe_counter!(RENDER_ERRORS_TOTAL, "Compose or present failures");
    describe_counter!(RECORDING_ERRORS_TOTAL, "Recording append failures");
    describe_counter!(VALIDATION_RUNS_TOTAL, "Validator invocations");
    describe_counter!(CONTROL_ERRORS_TOTAL, "Autopilot toggle or manual control failures");
    describe_counter!(TEARDOWN_FAILURES_TOTAL, "Resource release failures during teardown");
    describe_histogram!(
        LOOP_ITERATION_SECONDS,
        Unit::Seconds,
        "Main loop iteration time, excluding pacing"
    );
}

/// 记录一次主循环迭代耗时
pub fn record_loop_iteration(elapsed: Duration) {
    histogram!(LOOP_ITERATION_SECONDS).record(elapsed.as_secs_f64());
}

/// 统计摘要
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
