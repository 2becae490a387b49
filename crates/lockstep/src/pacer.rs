//! Main loop frame-rate limiter

use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

/// Paces loop iterations to a target rate
///
/// A target of 0 disables pacing. The interval is created on first use so the
/// pacer can be built outside a runtime.
pub struct FramePacer {
    period: Option<Duration>,
    interval: Option<Interval>,
}

impl FramePacer {
    pub fn new(target_fps: u32) -> Self {
        let period = (target_fps > 0).then(|| Duration::from_secs_f64(1.0 / target_fps as f64));
        Self {
            period,
            interval: None,
        }
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Wait until the next iteration may start
    pub async fn wait(&mut self) {
        let Some(period) = self.period else {
            return;
        };

        let interval = self.interval.get_or_insert_with(|| {
            let mut i = interval(period);
            i.set_missed_tick_behavior(MissedTickBehavior::Delay);
            i
        });
        interval.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_disabled_pacer_returns_immediately() {
        let mut pacer = FramePacer::new(0);
        assert!(pacer.period().is_none());
        let start = Instant::now();
        for _ in 0..100 {
            pacer.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_pacer_spaces_iterations() {
        let mut pacer = FramePacer::new(100);
        let start = Instant::now();
        // First tick completes immediately
        for _ in 0..4 {
            pacer.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
