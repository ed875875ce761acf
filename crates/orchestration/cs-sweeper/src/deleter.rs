//! Batched deletion with per-object outcomes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_stream::try_stream;
use cs_error::{ErrorCategory, OperationKind, Result, SweepError, classify_error};
use cs_traits::StorageProvider;
use cs_types::{DeletionOutcome, FileDescriptor, MAX_BATCH_SIZE};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, pin_mut};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Error recorded for a key the provider returned no result for.
const MISSING_RESULT: &str = "no result returned for key";

/// Deletes scanned objects in single-bucket batches.
///
/// Descriptors are accumulated per bucket and flushed when the batch is
/// full, when the next descriptor belongs to another bucket, or when the
/// input ends. Every descriptor that reaches a flushed batch produces exactly
/// one [`DeletionOutcome`]; nothing is retried.
pub struct SafeDeleter<P> {
    provider: Arc<P>,
    batch_size: usize,
    dry_run: bool,
    cancel: Option<CancellationToken>,
    batches: AtomicUsize,
}

impl<P: StorageProvider> SafeDeleter<P> {
    /// Create a deleter.
    ///
    /// `batch_size` is clamped to `1..=min(provider max, 1000)`.
    pub fn new(provider: Arc<P>, batch_size: usize) -> Self {
        let ceiling = provider.max_batch_size().clamp(1, MAX_BATCH_SIZE);

        Self {
            batch_size: batch_size.clamp(1, ceiling),
            provider,
            dry_run: false,
            cancel: None,
            batches: AtomicUsize::new(0),
        }
    }

    /// Simulate deletions instead of calling the provider.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Stop between batches once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Effective batch size after clamping.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Whether this deleter simulates.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Number of batches flushed so far.
    pub fn batches_flushed(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Delete everything `files` yields.
    ///
    /// Outcomes are emitted in flush order, which is input order. An error
    /// from `files` is passed through and ends the run; descriptors still
    /// waiting in the current batch are dropped without an outcome.
    pub fn run<'a, S>(&'a self, files: S) -> BoxStream<'a, Result<DeletionOutcome>>
    where
        S: Stream<Item = Result<FileDescriptor>> + Send + 'a,
    {
        Box::pin(try_stream! {
            pin_mut!(files);
            let mut batch: Vec<FileDescriptor> = Vec::with_capacity(self.batch_size);

            loop {
                // Waiting on the scan is abandoned as soon as the token fires
                let next = match &self.cancel {
                    Some(token) => tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            info!(pending = batch.len(), "Deletion cancelled");
                            break;
                        }
                        next = files.next() => next,
                    },
                    None => files.next().await,
                };
                let next = match next {
                    Some(item) => Some(item?),
                    None => None,
                };

                // A batch never spans buckets
                let flush_pending = match (&next, batch.first()) {
                    (Some(file), Some(first)) => file.bucket != first.bucket,
                    (None, Some(_)) => true,
                    _ => false,
                };

                if flush_pending {
                    if self.is_cancelled() {
                        info!(pending = batch.len(), "Deletion cancelled");
                        break;
                    }
                    let (outcomes, fatal) = self.flush(std::mem::take(&mut batch)).await;
                    for outcome in outcomes {
                        yield outcome;
                    }
                    if let Some(e) = fatal {
                        Err::<(), SweepError>(e)?;
                    }
                }

                let Some(file) = next else {
                    break;
                };
                batch.push(file);

                if batch.len() >= self.batch_size {
                    if self.is_cancelled() {
                        info!(pending = batch.len(), "Deletion cancelled");
                        break;
                    }
                    let (outcomes, fatal) = self.flush(std::mem::take(&mut batch)).await;
                    for outcome in outcomes {
                        yield outcome;
                    }
                    if let Some(e) = fatal {
                        Err::<(), SweepError>(e)?;
                    }
                }
            }

            debug!(batches = self.batches_flushed(), "Deletion run finished");
        })
    }

    /// Delete one single-bucket batch and map the results back to descriptors.
    ///
    /// A failed call marks the whole batch failed. When the failure also
    /// means no later batch can succeed (rejected credentials), the error is
    /// returned alongside the outcomes so the run can stop.
    async fn flush(&self, batch: Vec<FileDescriptor>) -> (Vec<DeletionOutcome>, Option<SweepError>) {
        let Some(bucket) = batch.first().map(|f| f.bucket.clone()) else {
            return (Vec::new(), None);
        };
        self.batches.fetch_add(1, Ordering::Relaxed);

        if self.dry_run {
            debug!(bucket = %bucket, files = batch.len(), "Dry run: simulating batch");
            return (batch.iter().map(DeletionOutcome::simulated).collect(), None);
        }

        let keys: Vec<String> = batch.iter().map(|f| f.key.clone()).collect();
        debug!(bucket = %bucket, files = keys.len(), "Deleting batch");

        match self.provider.delete_objects(&bucket, &keys).await {
            Ok(results) => {
                let by_key: HashMap<String, Option<String>> =
                    results.into_iter().map(|r| (r.key, r.error)).collect();

                let outcomes = batch
                    .iter()
                    .map(|file| match by_key.get(&file.key) {
                        Some(None) => DeletionOutcome::deleted(file),
                        Some(Some(cause)) => {
                            warn!(bucket = %file.bucket, key = %file.key, error = %cause, "Delete failed");
                            DeletionOutcome::failed(file, cause.clone())
                        }
                        None => {
                            warn!(bucket = %file.bucket, key = %file.key, "No delete result returned");
                            DeletionOutcome::failed(file, MISSING_RESULT)
                        }
                    })
                    .collect();
                (outcomes, None)
            }
            Err(e) => {
                // Some keys may have been removed server-side; all are reported failed
                error!(bucket = %bucket, files = batch.len(), error = %e, "Batch delete failed");
                let cause = e.to_string();
                let outcomes = batch
                    .iter()
                    .map(|file| DeletionOutcome::failed(file, cause.clone()))
                    .collect();

                match classify_error(&e, OperationKind::Delete) {
                    ErrorCategory::Fatal => (outcomes, Some(e)),
                    ErrorCategory::ObjectFailure
                    | ErrorCategory::Retryable
                    | ErrorCategory::SkipBucket => (outcomes, None),
                }
            }
        }
    }
}
