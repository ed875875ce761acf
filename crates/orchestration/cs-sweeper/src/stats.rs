//! Statistics for deletion runs.

use chrono::{DateTime, Duration, Utc};
use cs_types::{DeletionOutcome, DeletionSummary, OutcomeKind};
use serde::{Deserialize, Serialize};

/// Failure messages kept for the final report.
pub const MAX_RECORDED_ERRORS: usize = 100;

/// Statistics collected during a deletion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletionStats {
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Delete batches issued (or simulated)
    pub batches: usize,

    /// Objects confirmed deleted
    pub deleted: u64,

    /// Objects whose deletion failed
    pub failed: u64,

    /// Objects reported by a dry run
    pub simulated: u64,

    /// Bytes confirmed deleted
    pub bytes_deleted: u64,

    /// Bytes a dry run would have deleted
    pub bytes_simulated: u64,

    /// First failure messages, as `bucket/key: cause`
    pub errors: Vec<String>,
}

impl DeletionStats {
    /// Create a new stats tracker with the current time as start time.
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Mark the run as complete with the current time.
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Record one outcome.
    pub fn record(&mut self, outcome: &DeletionOutcome) {
        match outcome.kind {
            OutcomeKind::Deleted => {
                self.deleted += 1;
                self.bytes_deleted += outcome.size;
            }
            OutcomeKind::Simulated => {
                self.simulated += 1;
                self.bytes_simulated += outcome.size;
            }
            OutcomeKind::Failed => {
                self.failed += 1;
                if self.errors.len() < MAX_RECORDED_ERRORS {
                    self.errors.push(format!(
                        "{}/{}: {}",
                        outcome.bucket,
                        outcome.key,
                        outcome.error.as_deref().unwrap_or("unknown error")
                    ));
                }
            }
        }
    }

    /// Record a dry run straight from a scan summary.
    ///
    /// Every matched file counts as simulated, and batches are counted the
    /// way the deleter would flush them: per bucket, `batch_size` at a time.
    pub fn record_dry_run(&mut self, summary: &DeletionSummary, batch_size: usize) {
        let batch_size = batch_size.max(1) as u64;

        self.simulated += summary.total_files;
        self.bytes_simulated += summary.total_bytes;
        self.batches += summary
            .buckets
            .values()
            .map(|totals| totals.files.div_ceil(batch_size) as usize)
            .sum::<usize>();
    }

    /// Total outcomes recorded.
    pub fn total(&self) -> u64 {
        self.deleted + self.failed + self.simulated
    }

    /// Check if any object failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Get the duration of the run.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Outcomes per second over the run.
    pub fn objects_per_second(&self) -> Option<f64> {
        self.duration().map(|d| {
            let secs = d.num_milliseconds() as f64 / 1000.0;
            if secs > 0.0 {
                self.total() as f64 / secs
            } else {
                0.0
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_types::FileDescriptor;

    fn file(key: &str, size: u64) -> FileDescriptor {
        FileDescriptor::new("bucket", key, size, Utc::now())
    }

    #[test]
    fn test_record_dry_run_from_summary() {
        let mut summary = DeletionSummary::new(cs_types::ProviderKind::Aliyun);
        for i in 0..5 {
            summary.record(&FileDescriptor::new("a", format!("{i}.log"), 10, Utc::now()));
        }
        summary.record(&FileDescriptor::new("b", "x.log", 7, Utc::now()));

        let mut stats = DeletionStats::new();
        stats.record_dry_run(&summary, 2);

        assert_eq!(stats.simulated, 6);
        assert_eq!(stats.bytes_simulated, 57);
        // a: 2 + 2 + 1, b: 1
        assert_eq!(stats.batches, 4);
        assert_eq!(stats.deleted, 0);
        assert!(!stats.has_failures());
    }

    #[test]
    fn test_stats_new() {
        let stats = DeletionStats::new();
        assert!(stats.started_at.is_some());
        assert!(stats.completed_at.is_none());
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_stats_record() {
        let mut stats = DeletionStats::new();
        stats.record(&DeletionOutcome::deleted(&file("a", 10)));
        stats.record(&DeletionOutcome::deleted(&file("b", 20)));
        stats.record(&DeletionOutcome::failed(&file("c", 40), "AccessDenied: no"));

        assert_eq!(stats.deleted, 2);
        assert_eq!(stats.bytes_deleted, 30);
        assert_eq!(stats.failed, 1);
        assert!(stats.has_failures());
        assert_eq!(stats.errors, vec!["bucket/c: AccessDenied: no".to_string()]);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_stats_simulated() {
        let mut stats = DeletionStats::new();
        stats.record(&DeletionOutcome::simulated(&file("a", 5)));

        assert_eq!(stats.simulated, 1);
        assert_eq!(stats.bytes_simulated, 5);
        assert_eq!(stats.deleted, 0);
        assert!(!stats.has_failures());
    }

    #[test]
    fn test_error_list_is_capped() {
        let mut stats = DeletionStats::new();
        for i in 0..(MAX_RECORDED_ERRORS + 10) {
            stats.record(&DeletionOutcome::failed(&file(&i.to_string(), 1), "boom"));
        }

        assert_eq!(stats.failed, (MAX_RECORDED_ERRORS + 10) as u64);
        assert_eq!(stats.errors.len(), MAX_RECORDED_ERRORS);
    }

    #[test]
    fn test_stats_duration() {
        let mut stats = DeletionStats::new();
        assert!(stats.duration().is_none());
        stats.complete();
        assert!(stats.duration().is_some());
        assert!(stats.objects_per_second().is_some());
    }
}
