//! # Observability
//!
//! Session 的日志与指标出口。
//!
//! - `tracing` 订阅器：JSON / Pretty / Compact 三种格式，统一写 stderr，
//!   stdout 留给 banner 和统计摘要
//! - 可选的 Prometheus HTTP 导出器
//! - `lane_session_*` 指标描述、循环耗时统计
//!
//! ```ignore
//! use observability::{init_logging, install_metrics_exporter, LogFormat, ObservabilityConfig};
//!
//! init_logging(&ObservabilityConfig::from_verbosity(LogFormat::Compact, false, 1))?;
//! install_metrics_exporter(9000)?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    describe_session_metrics, record_loop_iteration, RunningStats, StatsSummary,
};

/// 日志初始化参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// 没有设置 `RUST_LOG` 时使用的过滤指令
    pub default_directive: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            default_directive: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// `-q` 优先于 `-v`；`-v` 为 debug，`-vv` 及以上为 trace
    pub fn from_verbosity(log_format: LogFormat, quiet: bool, verbose: u8) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        Self {
            log_format,
            default_directive: level.to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志（带线程与源码位置）
    Json,
    /// 多行人类可读格式
    Pretty,
    /// 紧凑单行格式
    #[default]
    Compact,
}

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

fn fmt_layer(format: LogFormat) -> BoxedLayer {
    let base = fmt::layer().with_writer(std::io::stderr);
    match format {
        LogFormat::Json => base
            .json()
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Compact => base.compact().with_target(false).boxed(),
    }
}

/// 安装全局 tracing 订阅器
///
/// 进程内只能调用一次，重复调用返回错误。
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));

    tracing_subscriber::registry()
        .with(fmt_layer(config.log_format))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        log_format = ?config.log_format,
        directive = %config.default_directive,
        "logging initialized"
    );
    Ok(())
}

/// 在 `0.0.0.0:port` 上暴露 Prometheus 指标，并注册 session 指标描述
pub fn install_metrics_exporter(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {port}"))?;
    describe_session_metrics();

    tracing::info!(port, "Prometheus metrics endpoint listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(config.default_directive, "info");
    }

    #[test]
    fn test_verbosity_levels() {
        let level = |quiet, verbose| {
            ObservabilityConfig::from_verbosity(LogFormat::Json, quiet, verbose).default_directive
        };
        assert_eq!(level(false, 0), "info");
        assert_eq!(level(false, 1), "debug");
        assert_eq!(level(false, 5), "trace");
        assert_eq!(level(true, 2), "warn");
    }
}
