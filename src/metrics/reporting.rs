//! Metrics reporting and output formatting

use crate::constants::READY_REPLICAS_LABEL;
use crate::metrics::stats::{LabelStats, StatsSink};
use crate::polling::TerminalOutcome;

use std::sync::atomic::Ordering;
use std::time::Duration;

impl StatsSink {
    /// Print the end-of-run report
    pub async fn print_report(&self, config_summary: &str, test_duration: Option<Duration>) {
        let labels = self.labels().await;

        let completed = self.iterations_completed.load(Ordering::Relaxed);
        let failed = self.iterations_failed.load(Ordering::Relaxed);
        let users_failed = self.users_failed.load(Ordering::Relaxed);

        println!("\n📊 Fleet Allocation Load Test Results");
        println!("═══════════════════════════════════════════════════════════════");

        println!("\n🔧 Configuration:");
        print!("{}", config_summary);

        println!("📈 Overall Results:");
        if let Some(duration) = test_duration {
            println!("   Test Duration:    {:.2}s", duration.as_secs_f64());
        }
        println!("   Attempts:         {}", completed + failed);
        println!("   Completed:        {}", completed);
        println!("   Failed:           {}", failed);
        println!("   Success Rate:     {:.2}%", self.iteration_success_rate());
        if users_failed > 0 {
            println!("   Users Failed:     {}", users_failed);
        }

        self.print_outcomes(&labels, test_duration);
        self.print_latency_table(&labels);

        println!("\n🎯 Test completed!");
        println!("═══════════════════════════════════════════════════════════════");
    }

    fn print_outcomes(&self, labels: &[LabelStats], test_duration: Option<Duration>) {
        let count_of = |outcome: TerminalOutcome| {
            labels
                .iter()
                .find(|l| l.label == outcome.label())
                .map_or(0, |l| l.count)
        };

        let allocated = count_of(TerminalOutcome::Allocated);
        let unallocated = count_of(TerminalOutcome::UnAllocated);
        let timed_out = count_of(TerminalOutcome::TimedOut);

        println!("\n🎮 Allocation Outcomes:");
        println!("   Allocated:        {}", allocated);
        println!("   UnAllocated:      {}", unallocated);
        if timed_out > 0 {
            println!("   Timed Out:        {}", timed_out);
        }

        if let Some(duration) = test_duration {
            let seconds = duration.as_secs_f64();
            let per_sec = if seconds > 0.0 {
                allocated as f64 / seconds
            } else {
                0.0
            };
            println!("   Allocations/sec:  {:.2}", per_sec);
        }
    }

    fn print_latency_table(&self, labels: &[LabelStats]) {
        if labels.is_empty() {
            return;
        }

        println!("\n⏱️  Measurements:");
        println!(
            "   {:<32} {:>8} {:>10} {:>8} {:>8}",
            "Label", "Count", "Mean", "Min", "Max"
        );
        for stats in labels {
            let unit = if stats.label == READY_REPLICAS_LABEL {
                ""
            } else {
                "ms"
            };
            println!(
                "   {:<32} {:>8} {:>8.2}{:<2} {:>6}{:<2} {:>6}{:<2}",
                stats.label,
                stats.count,
                stats.mean(),
                unit,
                stats.min.unwrap_or(0),
                unit,
                stats.max.unwrap_or(0),
                unit
            );
        }
    }
}
