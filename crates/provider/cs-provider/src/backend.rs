//! Runtime backend selection.

use async_trait::async_trait;
use cs_error::Result;
use cs_traits::StorageBackend;
use cs_types::{BucketDescriptor, FileDescriptor, KeyDeletion, Page, ProviderKind};

use crate::aliyun::AliyunBackend;
use crate::config::{ProviderConfig, SessionSettings};
use crate::tencent::TencentBackend;

/// One of the supported backends, chosen at runtime.
pub enum Backend {
    Tencent(TencentBackend),
    Aliyun(AliyunBackend),
}

impl Backend {
    /// Connect to the backend selected by `config`.
    pub async fn connect(config: ProviderConfig, settings: &SessionSettings) -> Result<Self> {
        match config {
            ProviderConfig::Tencent(config) => {
                Ok(Self::Tencent(TencentBackend::connect(config, settings).await?))
            }
            ProviderConfig::Aliyun(config) => {
                Ok(Self::Aliyun(AliyunBackend::connect(config, settings).await?))
            }
        }
    }
}

#[async_trait]
impl StorageBackend for Backend {
    fn kind(&self) -> ProviderKind {
        match self {
            Self::Tencent(b) => b.kind(),
            Self::Aliyun(b) => b.kind(),
        }
    }

    fn max_batch_size(&self) -> usize {
        match self {
            Self::Tencent(b) => b.max_batch_size(),
            Self::Aliyun(b) => b.max_batch_size(),
        }
    }

    async fn list_buckets_page(&self, marker: Option<&str>) -> Result<Page<BucketDescriptor>> {
        match self {
            Self::Tencent(b) => b.list_buckets_page(marker).await,
            Self::Aliyun(b) => b.list_buckets_page(marker).await,
        }
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        marker: Option<&str>,
    ) -> Result<Page<FileDescriptor>> {
        match self {
            Self::Tencent(b) => b.list_objects_page(bucket, prefix, marker).await,
            Self::Aliyun(b) => b.list_objects_page(bucket, prefix, marker).await,
        }
    }

    async fn bucket_location(&self, bucket: &str) -> Result<Option<String>> {
        match self {
            Self::Tencent(b) => b.bucket_location(bucket).await,
            Self::Aliyun(b) => b.bucket_location(bucket).await,
        }
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<Vec<KeyDeletion>> {
        match self {
            Self::Tencent(b) => b.delete_objects(bucket, keys).await,
            Self::Aliyun(b) => b.delete_objects(bucket, keys).await,
        }
    }
}
