//! Pre-deletion summaries.

use cs_error::Result;
use cs_types::{DeletionSummary, FileDescriptor, ProviderKind};
use futures::{Stream, StreamExt, pin_mut};
use tracing::debug;

/// Fold a scan into a [`DeletionSummary`] without deleting anything.
///
/// Stops at the first error from `files`.
pub async fn summarize<S>(provider: ProviderKind, files: S) -> Result<DeletionSummary>
where
    S: Stream<Item = Result<FileDescriptor>>,
{
    pin_mut!(files);
    let mut summary = DeletionSummary::new(provider);

    while let Some(file) = files.next().await {
        summary.record(&file?);
    }

    debug!(
        files = summary.total_files,
        bytes = summary.total_bytes,
        buckets = summary.buckets.len(),
        "Summary computed"
    );

    Ok(summary)
}
