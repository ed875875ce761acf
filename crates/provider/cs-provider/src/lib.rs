//! cs-provider - Storage providers for cloud-sweep.
//!
//! This crate connects the sweep pipeline to real object storage:
//! - [`TencentBackend`] / [`AliyunBackend`] - One backend call per request
//!   against the COS and OSS S3-compatible APIs
//! - [`Backend`] - Runtime selection between them
//! - [`RateLimitedProvider`] - Lazy pagination plus shared rate limiting,
//!   implementing [`StorageProvider`](cs_traits::StorageProvider)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cs_provider::{ProviderConfig, SessionSettings, TencentConfig, connect};
//! use cs_ratelimit::RateLimiter;
//!
//! # async fn example() -> cs_error::Result<()> {
//! let config = ProviderConfig::Tencent(TencentConfig::new("id", "key"));
//! let limiter = Arc::new(RateLimiter::new(100));
//! let provider = connect(config, &SessionSettings::default(), limiter).await?;
//! # Ok(())
//! # }
//! ```

mod aliyun;
mod backend;
mod config;
mod rate_limited;
mod s3;
mod tencent;

use std::sync::Arc;

use cs_error::Result;
use cs_ratelimit::RateLimiter;

pub use aliyun::AliyunBackend;
pub use backend::Backend;
pub use config::{
    AliyunConfig, DEFAULT_ALIYUN_ENDPOINT, DEFAULT_TENCENT_REGION, DEFAULT_TENCENT_SCHEME,
    ProviderConfig, SessionSettings, TencentConfig,
};
pub use rate_limited::RateLimitedProvider;
pub use tencent::TencentBackend;

/// Connect to the configured backend and wrap it with `limiter`.
pub async fn connect(
    config: ProviderConfig,
    settings: &SessionSettings,
    limiter: Arc<RateLimiter>,
) -> Result<RateLimitedProvider<Backend>> {
    let backend = Backend::connect(config, settings).await?;
    Ok(RateLimitedProvider::new(backend, limiter))
}
