//! Configuration for a sweep run.

use chrono::{DateTime, Utc};
use cs_error::{Result, SweepError};
use cs_types::MAX_BATCH_SIZE;
use serde::{Deserialize, Serialize};

use crate::pattern::CompiledPatterns;

/// Default keys per delete call.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default API calls per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Configuration for a scan and delete run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Bucket-name regex
    pub bucket_pattern: String,

    /// Object-key glob
    pub file_pattern: String,

    /// Objects modified strictly before this instant are eligible
    pub cutoff: DateTime<Utc>,

    /// Only list keys under this prefix
    pub prefix: Option<String>,

    /// Keys per delete call (1..=1000)
    pub batch_size: usize,

    /// API calls per second
    pub rate_limit: u32,

    /// Burst capacity (defaults to `rate_limit`)
    pub burst: Option<u32>,

    /// Simulate deletions without calling the provider
    pub dry_run: bool,
}

impl SweepConfig {
    /// Create a configuration with default batching and rate limits.
    pub fn new(
        bucket_pattern: impl Into<String>,
        file_pattern: impl Into<String>,
        cutoff: DateTime<Utc>,
    ) -> Self {
        Self {
            bucket_pattern: bucket_pattern.into(),
            file_pattern: file_pattern.into(),
            cutoff,
            prefix: None,
            batch_size: DEFAULT_BATCH_SIZE,
            rate_limit: DEFAULT_RATE_LIMIT,
            burst: None,
            dry_run: false,
        }
    }

    /// Restrict listings to a key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the rate limit in calls per second.
    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Set the burst capacity.
    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = Some(burst);
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Burst capacity actually used.
    pub fn effective_burst(&self) -> u32 {
        self.burst.unwrap_or(self.rate_limit)
    }

    /// Check ranges and compile both patterns.
    ///
    /// Fails with `Config` for out-of-range numbers and `Pattern` for
    /// malformed patterns, before any network call.
    pub fn validate(&self) -> Result<CompiledPatterns> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(SweepError::Config(format!(
                "Batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.rate_limit == 0 {
            return Err(SweepError::Config(
                "Rate limit must be at least 1 call per second".to_string(),
            ));
        }
        if self.burst == Some(0) {
            return Err(SweepError::Config("Burst must be at least 1".to_string()));
        }

        Ok(CompiledPatterns::new(&self.bucket_pattern, &self.file_pattern)?)
    }
}
