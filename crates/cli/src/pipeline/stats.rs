//! Run statistics.

use std::time::Duration;

use camera::MetricsSnapshot;
use contracts::RunSummary;
use observability::MetricsSummary;

/// Statistics from one acquisition run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Finished notification of the run
    pub summary: RunSummary,

    /// Aggregated per-frame metrics from the frame ring
    pub metrics: MetricsSummary,

    /// Sink adapter counters
    pub sink: MetricsSnapshot,

    /// Wall time including camera setup and teardown
    pub duration: Duration,
}

impl PipelineStats {
    /// Delivered frames per second over the run itself
    pub fn fps(&self) -> f64 {
        let secs = self.summary.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.summary.frames_delivered as f64 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Acquisition Statistics                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Status: {}", self.summary.status);
        println!("   ├─ Run time: {:.3}s", self.summary.elapsed.as_secs_f64());
        println!("   ├─ Frames delivered: {}", self.summary.frames_delivered);
        println!("   └─ FPS: {:.2}", self.fps());

        println!("\n📤 Sink");
        println!("   ├─ Inserts: {}", self.sink.insert_count);
        println!("   ├─ Overflows: {}", self.sink.overflow_count);
        println!("   ├─ Clears: {}", self.sink.clear_count);
        println!("   └─ Buffered: {}", self.sink.buffered_len);

        if self.metrics.total_frames > 0 {
            println!("\n{}", self.metrics);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RunStatus;

    #[test]
    fn test_fps_uses_run_elapsed() {
        let stats = PipelineStats {
            summary: RunSummary {
                frames_delivered: 50,
                status: RunStatus::Completed,
                elapsed: Duration::from_secs(2),
            },
            metrics: MetricsSummary::default(),
            sink: MetricsSnapshot::default(),
            duration: Duration::from_secs(3),
        };
        assert_eq!(stats.fps(), 25.0);
    }
}
