//! Epoch and summary reporting (spec §4.7).

use std::time::Duration;

use crate::coverage::CoverageSample;

/// `HH:MM:SS`, matching spec §4.7's elapsed format.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let (hours, rest) = (total_secs / 3600, total_secs % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[derive(Debug, Clone, Copy)]
pub struct EpochReport {
    pub epoch: u64,
    pub epoch_interval: Duration,
    pub cumulative_active_time: Duration,
    pub best_coverage: CoverageSample,
    pub queue_len: usize,
}

impl EpochReport {
    pub fn as_line(&self) -> String {
        format!(
            "[epoch {}] interval={:.2}s total={} line_cov={}/{:.1}% branch_cov={}/{:.1}% queue={}",
            self.epoch,
            self.epoch_interval.as_secs_f64(),
            format_elapsed(self.cumulative_active_time),
            self.best_coverage.line_abs,
            self.best_coverage.line_pct,
            self.best_coverage.branch_abs,
            self.best_coverage.branch_pct,
            self.queue_len,
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub total_epochs: u64,
    pub total_active_time: Duration,
    pub final_coverage: CoverageSample,
    pub final_queue_len: usize,
}

impl RunSummary {
    pub fn as_line(&self) -> String {
        format!(
            "[summary] epochs={} active_time={} line_cov={} branch_cov={} queue={}",
            self.total_epochs,
            format_elapsed(self.total_active_time),
            self.final_coverage.line_abs,
            self.final_coverage.branch_abs,
            self.final_queue_len,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(3661)), "01:01:01");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "00:00:59");
    }
}
