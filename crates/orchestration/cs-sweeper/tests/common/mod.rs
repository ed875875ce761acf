//! Shared stub backend for sweeper integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use cs_error::{Result, SweepError};
use cs_provider::RateLimitedProvider;
use cs_ratelimit::RateLimiter;
use cs_traits::StorageBackend;
use cs_types::{BucketDescriptor, FileDescriptor, KeyDeletion, Page, ProviderKind};
use parking_lot::Mutex;

pub type StubProvider = RateLimitedProvider<StubBackend>;

/// Objects served by one stub bucket.
pub enum Contents {
    /// Fixed objects, served `page_size` at a time
    Files(Vec<FileDescriptor>),
    /// `count` objects built on demand, 1000 per page
    Synthetic {
        count: usize,
        last_modified: DateTime<Utc>,
    },
}

/// How a bucket's listing behaves.
pub enum Listing {
    Ok(Contents),
    NotFound,
    /// The bucket exists but the credentials may not read it
    Inaccessible,
    /// The credentials themselves are rejected
    Unauthenticated,
}

/// Page-level backend with call recording and injectable failures.
pub struct StubBackend {
    buckets: Vec<(String, Listing)>,
    page_size: usize,
    failing_keys: HashSet<String>,
    failing_calls: HashSet<usize>,
    unauthenticated_calls: HashSet<usize>,
    dropped_keys: HashSet<String>,
    pub bucket_pages: AtomicUsize,
    pub object_pages: AtomicUsize,
    pub prefixes: Mutex<Vec<Option<String>>>,
    pub delete_calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            buckets: Vec::new(),
            page_size: 2,
            failing_keys: HashSet::new(),
            failing_calls: HashSet::new(),
            unauthenticated_calls: HashSet::new(),
            dropped_keys: HashSet::new(),
            bucket_pages: AtomicUsize::new(0),
            object_pages: AtomicUsize::new(0),
            prefixes: Mutex::new(Vec::new()),
            delete_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bucket(mut self, name: &str, files: Vec<FileDescriptor>) -> Self {
        self.buckets
            .push((name.to_string(), Listing::Ok(Contents::Files(files))));
        self
    }

    pub fn with_synthetic_bucket(
        mut self,
        name: &str,
        count: usize,
        last_modified: DateTime<Utc>,
    ) -> Self {
        self.buckets.push((
            name.to_string(),
            Listing::Ok(Contents::Synthetic {
                count,
                last_modified,
            }),
        ));
        self
    }

    pub fn with_missing_bucket(mut self, name: &str) -> Self {
        self.buckets.push((name.to_string(), Listing::NotFound));
        self
    }

    pub fn with_inaccessible_bucket(mut self, name: &str) -> Self {
        self.buckets.push((name.to_string(), Listing::Inaccessible));
        self
    }

    pub fn with_unauthenticated_bucket(mut self, name: &str) -> Self {
        self.buckets.push((name.to_string(), Listing::Unauthenticated));
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Keys the backend reports in the delete error list.
    pub fn failing_key(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    /// Delete calls (0-based) that fail as a whole.
    pub fn failing_call(mut self, call: usize) -> Self {
        self.failing_calls.insert(call);
        self
    }

    /// Delete calls (0-based) whose credentials are rejected.
    pub fn unauthenticated_call(mut self, call: usize) -> Self {
        self.unauthenticated_calls.insert(call);
        self
    }

    /// Keys the backend leaves out of its delete response.
    pub fn dropped_key(mut self, key: &str) -> Self {
        self.dropped_keys.insert(key.to_string());
        self
    }

    pub fn delete_batches(&self) -> Vec<(String, Vec<String>)> {
        self.delete_calls.lock().clone()
    }

    pub fn delete_batch_sizes(&self) -> Vec<usize> {
        self.delete_calls.lock().iter().map(|(_, k)| k.len()).collect()
    }
}

#[async_trait]
impl StorageBackend for StubBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tencent
    }

    async fn list_buckets_page(&self, marker: Option<&str>) -> Result<Page<BucketDescriptor>> {
        self.bucket_pages.fetch_add(1, Ordering::SeqCst);

        // One bucket per page to exercise bucket pagination
        let index: usize = marker.map_or(0, |m| m.parse().unwrap());
        let items: Vec<BucketDescriptor> = self
            .buckets
            .get(index)
            .map(|(name, _)| BucketDescriptor::new(name.clone()).with_region("ap-guangzhou"))
            .into_iter()
            .collect();

        Ok(if index + 1 < self.buckets.len() {
            Page::with_next(items, (index + 1).to_string())
        } else {
            Page::last(items)
        })
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        marker: Option<&str>,
    ) -> Result<Page<FileDescriptor>> {
        self.object_pages.fetch_add(1, Ordering::SeqCst);
        self.prefixes.lock().push(prefix.map(str::to_string));

        let Some((_, listing)) = self.buckets.iter().find(|(name, _)| name == bucket) else {
            return Err(SweepError::bucket_not_found(bucket, "NoSuchBucket"));
        };

        let offset: usize = marker.map_or(0, |m| m.parse().unwrap());

        let (items, total) = match listing {
            Listing::NotFound => {
                return Err(SweepError::bucket_not_found(bucket, "NoSuchBucket"));
            }
            // What the S3 adapters report for AccessDenied on a bucket call
            Listing::Inaccessible => {
                return Err(SweepError::bucket_not_found(
                    bucket,
                    "ListObjects failed: AccessDenied: Access Denied",
                ));
            }
            Listing::Unauthenticated => {
                return Err(SweepError::Authentication(
                    "ListObjects failed: InvalidAccessKeyId: unknown key".to_string(),
                ));
            }
            Listing::Ok(Contents::Files(files)) => {
                let items: Vec<FileDescriptor> = files
                    .iter()
                    .filter(|f| prefix.is_none_or(|p| f.key.starts_with(p)))
                    .skip(offset)
                    .take(self.page_size)
                    .cloned()
                    .collect();
                let total = files
                    .iter()
                    .filter(|f| prefix.is_none_or(|p| f.key.starts_with(p)))
                    .count();
                (items, total)
            }
            Listing::Ok(Contents::Synthetic {
                count,
                last_modified,
            }) => {
                let end = (offset + 1000).min(*count);
                let items = (offset..end)
                    .map(|i| FileDescriptor::new(bucket, format!("obj-{i:06}.log"), 1, *last_modified))
                    .collect();
                (items, *count)
            }
        };

        let next = offset + items.len();
        Ok(if next < total {
            Page::with_next(items, next.to_string())
        } else {
            Page::last(items)
        })
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<KeyDeletion>> {
        let call = {
            let mut calls = self.delete_calls.lock();
            calls.push((bucket.to_string(), keys.to_vec()));
            calls.len() - 1
        };

        if self.failing_calls.contains(&call) {
            return Err(SweepError::Provider(
                "DeleteObjects failed: InternalError: backend unavailable".to_string(),
            ));
        }
        if self.unauthenticated_calls.contains(&call) {
            return Err(SweepError::Authentication(
                "DeleteObjects failed: SignatureDoesNotMatch: bad signature".to_string(),
            ));
        }

        Ok(keys
            .iter()
            .filter(|key| !self.dropped_keys.contains(*key))
            .map(|key| {
                if self.failing_keys.contains(key) {
                    KeyDeletion::failed(key, "AccessDenied: denied")
                } else {
                    KeyDeletion::deleted(key)
                }
            })
            .collect())
    }
}

pub fn provider(backend: StubBackend) -> Arc<StubProvider> {
    Arc::new(RateLimitedProvider::new(
        backend,
        Arc::new(RateLimiter::new(100_000)),
    ))
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn file(bucket: &str, key: &str, size: u64, last_modified: DateTime<Utc>) -> FileDescriptor {
    FileDescriptor::new(bucket, key, size, last_modified)
}
