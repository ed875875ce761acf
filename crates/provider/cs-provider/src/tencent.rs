//! Tencent COS backend over the S3-compatible API.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use cs_error::Result;
use cs_traits::StorageBackend;
use cs_types::{BucketDescriptor, FileDescriptor, KeyDeletion, LIST_PAGE_SIZE, Page, ProviderKind};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::{SessionSettings, TencentConfig};
use crate::s3::{self, S3Session};

/// COS backend.
///
/// Buckets are served from regional endpoints
/// (`cos.<region>.myqcloud.com`). The region of each bucket is looked up
/// once with GetBucketLocation and cached; a failed lookup falls back to
/// the configured region.
pub struct TencentBackend {
    config: TencentConfig,
    session: S3Session,
    /// `None` records a lookup that returned nothing usable
    bucket_regions: Mutex<HashMap<String, Option<String>>>,
}

impl TencentBackend {
    /// Validate the config and load an SDK session.
    pub async fn connect(config: TencentConfig, settings: &SessionSettings) -> Result<Self> {
        config.validate()?;

        let session =
            S3Session::connect(&config.secret_id, &config.secret_key, "cloud-sweep-cos", settings)
                .await;

        debug!(region = %config.region, scheme = %config.scheme, "Connected to Tencent COS");

        Ok(Self {
            config,
            session,
            bucket_regions: Mutex::new(HashMap::new()),
        })
    }

    fn service_client(&self) -> Client {
        let endpoint = service_endpoint(&self.config.scheme);
        self.session.client(&endpoint, &self.config.region)
    }

    fn region_client(&self, region: &str) -> Client {
        let endpoint = regional_endpoint(&self.config.scheme, region);
        self.session.client(&endpoint, region)
    }

    /// Region of `bucket`, asking COS on the first call.
    async fn locate(&self, bucket: &str) -> Result<Option<String>> {
        let cached = self.bucket_regions.lock().get(bucket).cloned();
        if let Some(region) = cached {
            return Ok(region);
        }

        let response = self
            .region_client(&self.config.region)
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| s3::map_sdk_error(&e, "GetBucketLocation", Some(bucket)))?;

        let region = s3::location_name(response.location_constraint());
        debug!(bucket, region = ?region, "Resolved bucket region");

        self.bucket_regions
            .lock()
            .insert(bucket.to_string(), region.clone());
        Ok(region)
    }

    async fn bucket_client(&self, bucket: &str) -> Client {
        let region = match self.locate(bucket).await {
            Ok(region) => region,
            Err(e) => {
                debug!(bucket, error = %e, "Region lookup failed, using configured region");
                self.bucket_regions.lock().insert(bucket.to_string(), None);
                None
            }
        };

        self.region_client(region.as_deref().unwrap_or(&self.config.region))
    }
}

/// Endpoint serving the bucket listing.
pub(crate) fn service_endpoint(scheme: &str) -> String {
    format!("{scheme}://service.cos.myqcloud.com")
}

/// Endpoint serving buckets in `region`.
pub(crate) fn regional_endpoint(scheme: &str, region: &str) -> String {
    format!("{scheme}://cos.{region}.myqcloud.com")
}

#[async_trait]
impl StorageBackend for TencentBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tencent
    }

    async fn list_buckets_page(&self, marker: Option<&str>) -> Result<Page<BucketDescriptor>> {
        let response = self
            .service_client()
            .list_buckets()
            .set_continuation_token(marker.map(str::to_string))
            .send()
            .await
            .map_err(|e| s3::map_sdk_error(&e, "ListBuckets", None))?;

        let mut regions = self.bucket_regions.lock();
        let mut buckets = Vec::with_capacity(response.buckets().len());

        for bucket in response.buckets() {
            let Some(name) = bucket.name().filter(|n| !n.is_empty()) else {
                continue;
            };

            let mut descriptor = BucketDescriptor::new(name);
            if let Some(region) = bucket.bucket_region().filter(|r| !r.is_empty()) {
                regions.insert(name.to_string(), Some(region.to_string()));
                descriptor = descriptor.with_region(region);
            }
            if let Some(created) = bucket.creation_date().and_then(s3::to_chrono) {
                descriptor = descriptor.with_created_at(created);
            }
            buckets.push(descriptor);
        }

        Ok(match response.continuation_token() {
            Some(token) if !token.is_empty() => Page::with_next(buckets, token),
            _ => Page::last(buckets),
        })
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        marker: Option<&str>,
    ) -> Result<Page<FileDescriptor>> {
        let response = self
            .bucket_client(bucket)
            .await
            .list_objects()
            .bucket(bucket)
            .max_keys(LIST_PAGE_SIZE)
            .set_prefix(prefix.map(str::to_string))
            .set_marker(marker.map(str::to_string))
            .send()
            .await
            .map_err(|e| s3::map_sdk_error(&e, "ListObjects", Some(bucket)))?;

        let contents = response.contents();
        let files = contents
            .iter()
            .filter_map(|object| {
                s3::file_descriptor(
                    bucket,
                    object.key(),
                    object.size(),
                    object.last_modified(),
                    object.storage_class().map(|c| c.as_str()),
                )
            })
            .collect();

        if !response.is_truncated().unwrap_or(false) {
            return Ok(Page::last(files));
        }

        // V1 listings only return NextMarker when a delimiter is set
        let next = response
            .next_marker()
            .filter(|m| !m.is_empty())
            .or_else(|| contents.last().and_then(|o| o.key()));

        Ok(match next {
            Some(marker) => Page::with_next(files, marker),
            None => Page::last(files),
        })
    }

    async fn bucket_location(&self, bucket: &str) -> Result<Option<String>> {
        self.locate(bucket).await
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<KeyDeletion>> {
        let response = self
            .bucket_client(bucket)
            .await
            .delete_objects()
            .bucket(bucket)
            .delete(s3::delete_request(keys)?)
            .send()
            .await
            .map_err(|e| s3::map_sdk_error(&e, "DeleteObjects", Some(bucket)))?;

        let deleted = response.deleted().iter().filter_map(|d| d.key());
        let errors = response.errors().iter().filter_map(|e| {
            e.key()
                .map(|key| (key, s3::delete_error(e.code(), e.message())))
        });

        Ok(s3::collect_delete_results(keys, deleted, errors))
    }
}
