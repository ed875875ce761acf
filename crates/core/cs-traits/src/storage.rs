//! Storage backend and provider traits.

use async_trait::async_trait;
use cs_error::Result;
use cs_types::{BucketDescriptor, FileDescriptor, KeyDeletion, Page, ProviderKind};
use futures::stream::BoxStream;

/// Trait for storage backend adapters.
///
/// A backend translates exactly one request into one backend API call and
/// knows nothing about pagination loops or throttling. Implementations
/// include:
/// - Tencent COS and Aliyun OSS over their S3-compatible APIs
/// - In-memory stubs (for testing)
///
/// # Error mapping
///
/// Every implementation maps backend failures onto the same taxonomy:
/// rejected credentials become `Authentication`, a missing bucket becomes
/// `BucketNotFound`, throttling becomes `RateLimited`, and everything else
/// becomes `Provider`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Which provider this backend talks to.
    fn kind(&self) -> ProviderKind;

    /// Maximum number of keys accepted by one [`delete_objects`](Self::delete_objects) call.
    fn max_batch_size(&self) -> usize {
        cs_types::MAX_BATCH_SIZE
    }

    /// Fetches one page of buckets.
    ///
    /// `marker` is `None` for the first page and the previous page's
    /// `next_marker` afterwards.
    async fn list_buckets_page(&self, marker: Option<&str>) -> Result<Page<BucketDescriptor>>;

    /// Fetches one page of objects from `bucket`.
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        marker: Option<&str>,
    ) -> Result<Page<FileDescriptor>>;

    /// Looks up the region or location `bucket` lives in.
    ///
    /// `Ok(None)` means the backend cannot tell; callers then use the
    /// configured default.
    async fn bucket_location(&self, _bucket: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// Deletes up to [`max_batch_size`](Self::max_batch_size) keys in one call.
    ///
    /// Returns one [`KeyDeletion`] per input key, in input order. An `Err`
    /// means no per-key result is known for any key in the batch.
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<KeyDeletion>>;
}

/// Trait for the storage capability consumed by the scanner and deleter.
///
/// Listings are lazy: each backend page is requested only when the consumer
/// advances past the previous one, so memory stays bounded by one page.
/// Every underlying API call is admitted through the shared rate limiter
/// before it is issued.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Which provider this is.
    fn kind(&self) -> ProviderKind;

    /// Maximum number of keys accepted by one delete call.
    fn max_batch_size(&self) -> usize;

    /// Lists all accessible buckets in provider order.
    fn list_buckets(&self) -> BoxStream<'_, Result<BucketDescriptor>>;

    /// Lists objects in `bucket` in provider order, across all pages.
    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        prefix: Option<&'a str>,
    ) -> BoxStream<'a, Result<FileDescriptor>>;

    /// Region or location of `bucket`, if it can be determined.
    async fn bucket_location(&self, _bucket: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// Deletes `keys` from `bucket` with a single backend call.
    ///
    /// Returns one result per key, in input order.
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<KeyDeletion>>;
}
