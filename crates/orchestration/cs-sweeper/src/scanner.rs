//! Lazy bucket and object scanning.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_stream::try_stream;
use chrono::{DateTime, Utc};
use cs_error::{ErrorCategory, OperationKind, Result, SweepError, classify_error};
use cs_traits::StorageProvider;
use cs_types::{BucketDescriptor, FileDescriptor, FileTypeSummary, NO_EXTENSION};
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, info, warn};

use crate::pattern::CompiledPatterns;

/// Finds objects eligible for deletion.
///
/// An object is eligible when its bucket matches the bucket regex, its key
/// matches the key glob, and it was last modified strictly before the
/// cutoff. Streams are single-pass and request each backend page only when
/// the consumer advances; calling a scan method again re-lists everything.
pub struct Scanner<P> {
    provider: Arc<P>,
    patterns: CompiledPatterns,
    cutoff: DateTime<Utc>,
    prefix: Option<String>,
}

impl<P: StorageProvider> Scanner<P> {
    /// Create a scanner over every bucket and key.
    pub fn new(provider: Arc<P>, patterns: CompiledPatterns, cutoff: DateTime<Utc>) -> Self {
        Self {
            provider,
            patterns,
            cutoff,
            prefix: None,
        }
    }

    /// Only list keys under `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into()).filter(|p: &String| !p.is_empty());
        self
    }

    /// The provider being scanned.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// The cutoff instant.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// The compiled patterns.
    pub fn patterns(&self) -> &CompiledPatterns {
        &self.patterns
    }

    /// Key glob and cutoff check for one object.
    pub fn is_eligible(&self, file: &FileDescriptor) -> bool {
        file.last_modified < self.cutoff && self.patterns.matches_key(&file.key)
    }

    /// Buckets whose names match the bucket regex, in provider order.
    pub fn matching_buckets(&self) -> BoxStream<'_, Result<BucketDescriptor>> {
        self.provider
            .list_buckets()
            .filter(move |result| {
                let keep = match result {
                    Ok(bucket) => {
                        let matched = self.patterns.matches_bucket(&bucket.name);
                        if !matched {
                            debug!(bucket = %bucket.name, "Bucket does not match pattern");
                        }
                        matched
                    }
                    Err(_) => true,
                };
                futures::future::ready(keep)
            })
            .boxed()
    }

    /// Eligible objects across all matching buckets.
    ///
    /// A bucket that disappears mid-scan is skipped with a warning. Any other
    /// error is yielded once and ends the stream.
    pub fn scan(&self) -> BoxStream<'_, Result<FileDescriptor>> {
        Box::pin(try_stream! {
            info!(
                bucket_pattern = self.patterns.bucket_pattern(),
                file_pattern = self.patterns.key_pattern(),
                cutoff = %self.cutoff,
                prefix = ?self.prefix,
                "Scan started"
            );

            let mut buckets_matched = 0usize;
            let mut files_matched = 0u64;
            let mut buckets = self.matching_buckets();

            while let Some(bucket) = buckets.next().await {
                let bucket = bucket?;
                buckets_matched += 1;
                info!(bucket = %bucket.name, "Scanning bucket");

                let mut matched_here = 0u64;
                let mut objects = self.provider.list_objects(&bucket.name, self.prefix.as_deref());

                while let Some(object) = objects.next().await {
                    let file = match object {
                        Ok(file) => file,
                        Err(e) => {
                            skip_or_fail(&bucket.name, e)?;
                            break;
                        }
                    };

                    if self.is_eligible(&file) {
                        matched_here += 1;
                        yield file;
                    }
                }

                debug!(bucket = %bucket.name, files = matched_here, "Bucket scan finished");
                files_matched += matched_here;
            }

            info!(buckets = buckets_matched, files = files_matched, "Scan completed");
        })
    }

    /// Per-bucket extension breakdown of eligible objects.
    ///
    /// Summaries for a bucket are emitted once its listing finishes, sorted
    /// by extension.
    pub fn file_types(&self) -> BoxStream<'_, Result<FileTypeSummary>> {
        Box::pin(try_stream! {
            let mut buckets = self.matching_buckets();

            while let Some(bucket) = buckets.next().await {
                let bucket = bucket?;
                let mut by_extension: BTreeMap<String, (u64, u64)> = BTreeMap::new();
                let mut objects = self.provider.list_objects(&bucket.name, self.prefix.as_deref());

                while let Some(object) = objects.next().await {
                    let file = match object {
                        Ok(file) => file,
                        Err(e) => {
                            skip_or_fail(&bucket.name, e)?;
                            break;
                        }
                    };

                    if !self.is_eligible(&file) {
                        continue;
                    }

                    let extension = file.extension().unwrap_or(NO_EXTENSION);
                    let entry = by_extension.entry(extension.to_string()).or_default();
                    entry.0 += 1;
                    entry.1 += file.size;
                }

                debug!(bucket = %bucket.name, extensions = by_extension.len(), "File types collected");

                for (extension, (file_count, total_size)) in by_extension {
                    yield FileTypeSummary {
                        bucket: bucket.name.clone(),
                        extension,
                        file_count,
                        total_size,
                    };
                }
            }
        })
    }
}

/// Returns `Ok` when a listing error only means the bucket should be skipped.
fn skip_or_fail(bucket: &str, error: SweepError) -> Result<()> {
    match classify_error(&error, OperationKind::List) {
        ErrorCategory::SkipBucket => {
            warn!(bucket, error = %error, "Bucket not found, skipping");
            Ok(())
        }
        _ => Err(error),
    }
}
