//! Aggregates computed from a scan before anything is deleted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{FileDescriptor, ProviderKind};

/// File count and byte total for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketTotals {
    /// Number of matched files
    pub files: u64,

    /// Total size of matched files in bytes
    pub bytes: u64,
}

/// Summary of what a deletion run would remove.
///
/// Built by folding scan output, so it can be shown to the user before any
/// destructive call is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionSummary {
    /// Provider the files were found on
    pub provider: ProviderKind,

    /// Total number of matched files
    pub total_files: u64,

    /// Total size of matched files in bytes
    pub total_bytes: u64,

    /// Per-bucket breakdown, ordered by bucket name
    pub buckets: BTreeMap<String, BucketTotals>,
}

impl DeletionSummary {
    /// Create an empty summary.
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            total_files: 0,
            total_bytes: 0,
            buckets: BTreeMap::new(),
        }
    }

    /// Fold one matched file into the summary.
    pub fn record(&mut self, file: &FileDescriptor) {
        self.total_files += 1;
        self.total_bytes += file.size;

        let totals = self.buckets.entry(file.bucket.clone()).or_default();
        totals.files += 1;
        totals.bytes += file.size;
    }

    /// Returns true if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }
}

/// Label used for keys without an extension.
pub const NO_EXTENSION: &str = "(no ext)";

/// File count and size for one extension within one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeSummary {
    /// Bucket name
    pub bucket: String,

    /// Extension including the dot, or [`NO_EXTENSION`]
    pub extension: String,

    /// Number of files with this extension
    pub file_count: u64,

    /// Total size of those files in bytes
    pub total_size: u64,
}
