//! Session statistics

use std::time::Duration;

use display::RenderStats;
use observability::StatsSummary;

use crate::stop::StopReason;

/// Statistics from one session run
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// World advances issued
    pub ticks: u64,

    /// Simulated time at the last advance (seconds)
    pub sim_time: f64,

    /// Frames the callback published into the slot
    pub frames_published: u64,

    /// Published frames that replaced an unread one
    pub frames_overwritten: u64,

    /// Decode / detection failures in the callback
    pub callback_errors: u64,

    /// Compositor counters
    pub render: RenderStats,

    /// Validator invocations
    pub validation_runs: u64,

    /// Autopilot toggle / manual command failures
    pub control_failures: u64,

    /// Loop iteration time excluding pacing (ms)
    pub loop_latency_ms: StatsSummary,

    /// Destroy / restore failures during teardown
    pub teardown_failures: usize,

    pub stop_reason: Option<StopReason>,

    /// Wall-clock duration
    pub duration: Duration,
}

impl SessionStats {
    /// Loop iterations per wall-clock second
    pub fn loop_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {}", self.ticks);
        println!("   ├─ Simulated time: {:.2}s", self.sim_time);
        println!("   ├─ Loop rate: {:.2} it/s", self.loop_rate());
        println!("   ├─ Iteration (ms): {}", self.loop_latency_ms);
        match self.stop_reason {
            Some(reason) => println!("   └─ Stop reason: {}", reason),
            None => println!("   └─ Stop reason: -"),
        }

        println!("\n📷 Camera");
        println!("   ├─ Frames published: {}", self.frames_published);
        println!("   ├─ Overwritten before read: {}", self.frames_overwritten);
        println!("   └─ Callback errors: {}", self.callback_errors);

        println!("\n🖼️  Display");
        println!("   ├─ Rendered: {}", self.render.rendered);
        println!("   ├─ Skipped (no frame): {}", self.render.skipped);
        println!("   ├─ Render failures: {}", self.render.failures);
        println!("   ├─ Recorded: {}", self.render.recorded);
        println!("   └─ Recording failures: {}", self.render.recording_failures);

        println!("\n🔍 Validation runs: {}", self.validation_runs);

        if self.control_failures > 0 || self.teardown_failures > 0 {
            println!("\n⚠️  Failures");
            println!("   ├─ Control: {}", self.control_failures);
            println!("   └─ Teardown: {}", self.teardown_failures);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_rate() {
        let stats = SessionStats {
            ticks: 40,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert!((stats.loop_rate() - 20.0).abs() < f64::EPSILON);
        assert_eq!(SessionStats::default().loop_rate(), 0.0);
    }
}
