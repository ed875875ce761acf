//! Aliyun OSS backend over the S3-compatible API.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use cs_error::Result;
use cs_traits::StorageBackend;
use cs_types::{BucketDescriptor, FileDescriptor, KeyDeletion, LIST_PAGE_SIZE, Page, ProviderKind};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::{AliyunConfig, SessionSettings};
use crate::s3::{self, S3Session};

const OSS_DOMAIN: &str = "aliyuncs.com";

/// OSS backend.
///
/// The bucket listing is served from the configured endpoint. Each bucket's
/// location is looked up once with GetBucketLocation and the bucket is then
/// addressed through that location's endpoint; a failed lookup falls back
/// to the configured endpoint.
pub struct AliyunBackend {
    endpoint: String,
    region: String,
    session: S3Session,
    /// Location per bucket, `None` when the lookup returned nothing usable
    bucket_locations: Mutex<HashMap<String, Option<String>>>,
}

impl AliyunBackend {
    /// Validate the config and load an SDK session.
    pub async fn connect(config: AliyunConfig, settings: &SessionSettings) -> Result<Self> {
        config.validate()?;

        let endpoint = endpoint_url(&config.endpoint);
        let region = region_from_endpoint(&config.endpoint);

        let session = S3Session::connect(
            &config.access_key_id,
            &config.access_key_secret,
            "cloud-sweep-oss",
            settings,
        )
        .await;

        debug!(endpoint = %endpoint, region = %region, "Connected to Aliyun OSS");

        Ok(Self {
            endpoint,
            region,
            session,
            bucket_locations: Mutex::new(HashMap::new()),
        })
    }

    fn default_client(&self) -> Client {
        self.session.client(&self.endpoint, &self.region)
    }

    /// Location of `bucket`, asking OSS on the first call.
    async fn locate(&self, bucket: &str) -> Result<Option<String>> {
        let cached = self.bucket_locations.lock().get(bucket).cloned();
        if let Some(location) = cached {
            return Ok(location);
        }

        let response = self
            .default_client()
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| s3::map_sdk_error(&e, "GetBucketLocation", Some(bucket)))?;

        let location = s3::location_name(response.location_constraint());
        debug!(bucket, location = ?location, "Resolved bucket location");

        self.bucket_locations
            .lock()
            .insert(bucket.to_string(), location.clone());
        Ok(location)
    }

    async fn bucket_client(&self, bucket: &str) -> Client {
        match self.locate(bucket).await {
            Ok(Some(location)) => {
                let (endpoint, region) = location_endpoint(&location);
                self.session.client(&endpoint, &region)
            }
            Ok(None) => self.default_client(),
            Err(e) => {
                debug!(bucket, error = %e, "Location lookup failed, using configured endpoint");
                self.bucket_locations.lock().insert(bucket.to_string(), None);
                self.default_client()
            }
        }
    }
}

/// Turn a configured endpoint into a URL, defaulting to https.
pub(crate) fn endpoint_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

/// Signing region for an endpoint, e.g. `cn-hangzhou` for
/// `oss-cn-hangzhou.aliyuncs.com`.
pub(crate) fn region_from_endpoint(endpoint: &str) -> String {
    let host = endpoint
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let first = host.split('.').next().unwrap_or_default();
    let region = first.strip_prefix("oss-").unwrap_or(first);
    let region = region.strip_suffix("-internal").unwrap_or(region);

    if region.is_empty() {
        "cn-hangzhou".to_string()
    } else {
        region.to_string()
    }
}

/// Endpoint URL and signing region for a bucket location such as
/// `oss-cn-shanghai` (or `cn-shanghai`).
pub(crate) fn location_endpoint(location: &str) -> (String, String) {
    let region = location.strip_prefix("oss-").unwrap_or(location);
    (
        format!("https://oss-{region}.{OSS_DOMAIN}"),
        region.to_string(),
    )
}

#[async_trait]
impl StorageBackend for AliyunBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aliyun
    }

    async fn list_buckets_page(&self, marker: Option<&str>) -> Result<Page<BucketDescriptor>> {
        let response = self
            .default_client()
            .list_buckets()
            .set_continuation_token(marker.map(str::to_string))
            .send()
            .await
            .map_err(|e| s3::map_sdk_error(&e, "ListBuckets", None))?;

        let mut locations = self.bucket_locations.lock();
        let mut buckets = Vec::with_capacity(response.buckets().len());

        for bucket in response.buckets() {
            let Some(name) = bucket.name().filter(|n| !n.is_empty()) else {
                continue;
            };

            let mut descriptor = BucketDescriptor::new(name);
            if let Some(location) = bucket.bucket_region().filter(|r| !r.is_empty()) {
                locations.insert(name.to_string(), Some(location.to_string()));
                descriptor = descriptor.with_region(location);
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
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(LIST_PAGE_SIZE)
            .set_prefix(prefix.map(str::to_string))
            .set_continuation_token(marker.map(str::to_string))
            .send()
            .await
            .map_err(|e| s3::map_sdk_error(&e, "ListObjectsV2", Some(bucket)))?;

        let files = response
            .contents()
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

        let truncated = response.is_truncated().unwrap_or(false);
        Ok(match response.next_continuation_token() {
            Some(token) if truncated && !token.is_empty() => Page::with_next(files, token),
            _ => Page::last(files),
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

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::types::BucketLocationConstraint;

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("oss-cn-hangzhou.aliyuncs.com"),
            "https://oss-cn-hangzhou.aliyuncs.com"
        );
        assert_eq!(
            endpoint_url("http://oss-cn-beijing.aliyuncs.com/"),
            "http://oss-cn-beijing.aliyuncs.com"
        );
    }

    #[test]
    fn test_region_from_endpoint() {
        assert_eq!(region_from_endpoint("oss-cn-hangzhou.aliyuncs.com"), "cn-hangzhou");
        assert_eq!(
            region_from_endpoint("https://oss-cn-shenzhen-internal.aliyuncs.com"),
            "cn-shenzhen"
        );
        assert_eq!(region_from_endpoint(""), "cn-hangzhou");
    }

    #[test]
    fn test_location_endpoint() {
        let (url, region) = location_endpoint("oss-cn-shanghai");
        assert_eq!(url, "https://oss-cn-shanghai.aliyuncs.com");
        assert_eq!(region, "cn-shanghai");

        assert_eq!(location_endpoint("cn-beijing").1, "cn-beijing");
    }

    #[test]
    fn test_located_bucket_endpoint() {
        let constraint = BucketLocationConstraint::from("oss-cn-beijing");
        let location = s3::location_name(Some(&constraint)).unwrap();

        let (url, region) = location_endpoint(&location);
        assert_eq!(url, "https://oss-cn-beijing.aliyuncs.com");
        assert_eq!(region, "cn-beijing");
    }
}
