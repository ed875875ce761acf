//! Pagination and throttling on top of a [`StorageBackend`].

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use cs_error::{Result, SweepError};
use cs_ratelimit::RateLimiter;
use cs_traits::{StorageBackend, StorageProvider};
use cs_types::{BucketDescriptor, FileDescriptor, KeyDeletion, Page, ProviderKind};
use futures::stream::BoxStream;
use tracing::{debug, trace};

/// A [`StorageProvider`] that admits every backend call through a shared
/// [`RateLimiter`] and turns page-at-a-time calls into lazy streams.
///
/// Listing and deleting share one limiter, so the configured rate bounds
/// the total call rate of a run.
pub struct RateLimitedProvider<B> {
    backend: B,
    limiter: Arc<RateLimiter>,
}

impl<B: StorageBackend> RateLimitedProvider<B> {
    /// Wrap `backend` with `limiter`.
    pub fn new(backend: B, limiter: Arc<RateLimiter>) -> Self {
        Self { backend, limiter }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The shared limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

/// Decide the marker for the next page.
///
/// A backend that hands back the marker it was given would loop forever,
/// so that is reported as an error.
fn next_marker(
    operation: &str,
    current: Option<&str>,
    next: Option<String>,
) -> Result<Option<String>> {
    match next {
        Some(next) if next.is_empty() => Ok(None),
        Some(next) if current == Some(next.as_str()) => Err(SweepError::Provider(format!(
            "{operation} pagination did not advance past marker '{next}'"
        ))),
        other => Ok(other),
    }
}

#[async_trait]
impl<B: StorageBackend> StorageProvider for RateLimitedProvider<B> {
    fn kind(&self) -> ProviderKind {
        self.backend.kind()
    }

    fn max_batch_size(&self) -> usize {
        self.backend.max_batch_size().min(cs_types::MAX_BATCH_SIZE)
    }

    fn list_buckets(&self) -> BoxStream<'_, Result<BucketDescriptor>> {
        Box::pin(try_stream! {
            let mut marker: Option<String> = None;
            let mut pages = 0usize;

            loop {
                self.limiter.acquire().await;
                let Page { items, next_marker: next } =
                    self.backend.list_buckets_page(marker.as_deref()).await?;
                pages += 1;

                let next = next_marker("ListBuckets", marker.as_deref(), next)?;

                for bucket in items {
                    yield bucket;
                }

                match next {
                    Some(next) => marker = Some(next),
                    None => break,
                }
            }

            debug!(pages, "Bucket listing complete");
        })
    }

    fn list_objects<'a>(
        &'a self,
        bucket: &'a str,
        prefix: Option<&'a str>,
    ) -> BoxStream<'a, Result<FileDescriptor>> {
        Box::pin(try_stream! {
            let mut marker: Option<String> = None;
            let mut pages = 0usize;

            loop {
                self.limiter.acquire().await;
                let Page { items, next_marker: next } = self
                    .backend
                    .list_objects_page(bucket, prefix, marker.as_deref())
                    .await?;
                pages += 1;
                trace!(bucket, page = pages, objects = items.len(), "Fetched object page");

                let next = next_marker("ListObjects", marker.as_deref(), next)?;

                for file in items {
                    yield file;
                }

                match next {
                    Some(next) => marker = Some(next),
                    None => break,
                }
            }

            debug!(bucket, pages, "Object listing complete");
        })
    }

    async fn bucket_location(&self, bucket: &str) -> Result<Option<String>> {
        self.limiter.acquire().await;
        self.backend.bucket_location(bucket).await
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<KeyDeletion>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let max = self.max_batch_size();
        if keys.len() > max {
            return Err(SweepError::Config(format!(
                "Batch of {} keys exceeds the provider limit of {max}",
                keys.len()
            )));
        }

        self.limiter.acquire().await;
        self.backend.delete_objects(bucket, keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures::{StreamExt, TryStreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Backend serving `pages` pages of `per_page` objects each.
    struct PagedBackend {
        pages: usize,
        per_page: usize,
        list_calls: AtomicUsize,
        delete_calls: AtomicUsize,
        stuck: bool,
    }

    impl PagedBackend {
        fn new(pages: usize, per_page: usize) -> Self {
            Self {
                pages,
                per_page,
                list_calls: AtomicUsize::new(0),
                delete_calls: AtomicUsize::new(0),
                stuck: false,
            }
        }
    }

    #[async_trait]
    impl StorageBackend for PagedBackend {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Tencent
        }

        async fn list_buckets_page(&self, marker: Option<&str>) -> Result<Page<BucketDescriptor>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(match marker {
                None => Page::with_next(vec![BucketDescriptor::new("a")], "1"),
                Some(_) => Page::last(vec![BucketDescriptor::new("b")]),
            })
        }

        async fn list_objects_page(
            &self,
            bucket: &str,
            _prefix: Option<&str>,
            marker: Option<&str>,
        ) -> Result<Page<FileDescriptor>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let page: usize = marker.map_or(0, |m| m.parse().unwrap());

            let items = (0..self.per_page)
                .map(|i| {
                    FileDescriptor::new(bucket, format!("p{page}/k{i}"), 1, Utc::now())
                })
                .collect();

            if self.stuck {
                return Ok(Page::with_next(items, "0"));
            }
            Ok(if page + 1 < self.pages {
                Page::with_next(items, (page + 1).to_string())
            } else {
                Page::last(items)
            })
        }

        async fn bucket_location(&self, bucket: &str) -> Result<Option<String>> {
            Ok(Some(format!("{bucket}-region")))
        }

        async fn delete_objects(&self, _bucket: &str, keys: &[String]) -> Result<Vec<KeyDeletion>> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            Ok(keys.iter().map(KeyDeletion::deleted).collect())
        }
    }

    fn provider(backend: PagedBackend, rate: u32) -> RateLimitedProvider<PagedBackend> {
        RateLimitedProvider::new(backend, Arc::new(RateLimiter::new(rate)))
    }

    #[tokio::test]
    async fn test_list_objects_walks_all_pages() {
        let provider = provider(PagedBackend::new(3, 4), 1000);

        let files: Vec<FileDescriptor> =
            provider.list_objects("b", None).try_collect().await.unwrap();

        assert_eq!(files.len(), 12);
        assert_eq!(files[0].key, "p0/k0");
        assert_eq!(files[11].key, "p2/k3");
        assert_eq!(provider.backend().list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_list_objects_is_lazy() {
        let provider = provider(PagedBackend::new(100, 10), 1000);

        let first_five: Vec<_> = provider.list_objects("b", None).take(5).collect().await;

        assert_eq!(first_five.len(), 5);
        assert_eq!(provider.backend().list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_list_buckets_follows_marker() {
        let provider = provider(PagedBackend::new(1, 1), 1000);

        let names: Vec<String> = provider
            .list_buckets()
            .map_ok(|b| b.name)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stuck_marker_is_an_error() {
        let mut backend = PagedBackend::new(5, 2);
        backend.stuck = true;
        let provider = provider(backend, 1000);

        let results: Vec<_> = provider.list_objects("b", None).collect().await;

        // The first page is yielded, then the repeated marker is rejected
        assert_eq!(results.len(), 3);
        assert!(results[..2].iter().all(|r| r.is_ok()));
        assert!(matches!(results[2], Err(SweepError::Provider(_))));
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let provider = provider(PagedBackend::new(1, 1), 1000);
        let keys: Vec<String> = (0..1001).map(|i| i.to_string()).collect();

        let err = provider.delete_objects("b", &keys).await.unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
        assert_eq!(provider.backend().delete_calls.load(Ordering::SeqCst), 0);

        assert!(provider.delete_objects("b", &[]).await.unwrap().is_empty());
        assert_eq!(provider.backend().delete_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_throttled() {
        // Burst of 2 at 10/s: 6 page calls need at least 400ms
        let provider = RateLimitedProvider::new(
            PagedBackend::new(6, 1),
            Arc::new(RateLimiter::with_burst(10, 2)),
        );
        let start = Instant::now();

        let files: Vec<FileDescriptor> =
            provider.list_objects("b", None).try_collect().await.unwrap();

        assert_eq!(files.len(), 6);
        assert!(start.elapsed() >= Duration::from_millis(399));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_location_is_throttled() {
        let provider = RateLimitedProvider::new(
            PagedBackend::new(1, 1),
            Arc::new(RateLimiter::with_burst(10, 1)),
        );
        let start = Instant::now();

        assert_eq!(
            provider.bucket_location("logs").await.unwrap().as_deref(),
            Some("logs-region")
        );
        provider.bucket_location("logs").await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(99));
    }

    #[test]
    fn test_next_marker() {
        assert_eq!(next_marker("op", None, None).unwrap(), None);
        assert_eq!(next_marker("op", Some("a"), Some(String::new())).unwrap(), None);
        assert_eq!(
            next_marker("op", Some("a"), Some("b".into())).unwrap(),
            Some("b".to_string())
        );
        assert!(next_marker("op", Some("a"), Some("a".into())).is_err());
    }
}
