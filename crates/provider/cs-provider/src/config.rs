//! Provider credentials and connection settings.

use std::fmt;

use cs_error::{Result, SweepError};
use cs_types::ProviderKind;
use serde::{Deserialize, Serialize};

/// Default COS region.
pub const DEFAULT_TENCENT_REGION: &str = "ap-guangzhou";

/// Default COS URL scheme.
pub const DEFAULT_TENCENT_SCHEME: &str = "https";

/// Default OSS endpoint.
pub const DEFAULT_ALIYUN_ENDPOINT: &str = "oss-cn-hangzhou.aliyuncs.com";

/// Tencent COS credentials and region.
#[derive(Clone, Serialize, Deserialize)]
pub struct TencentConfig {
    /// SecretId
    pub secret_id: String,

    /// SecretKey
    pub secret_key: String,

    /// Region used for the service endpoint and for buckets whose region is unknown
    pub region: String,

    /// URL scheme (`https` or `http`)
    pub scheme: String,
}

impl TencentConfig {
    /// Create a config with the default region and scheme.
    pub fn new(secret_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            region: DEFAULT_TENCENT_REGION.to_string(),
            scheme: DEFAULT_TENCENT_SCHEME.to_string(),
        }
    }

    /// Set the default region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the URL scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Check that credentials are present and the scheme is usable.
    pub fn validate(&self) -> Result<()> {
        if self.secret_id.trim().is_empty() || self.secret_key.trim().is_empty() {
            return Err(SweepError::Config(
                "Tencent credentials missing: set TENCENT_SECRET_ID and TENCENT_SECRET_KEY"
                    .to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(SweepError::Config("Tencent region must not be empty".to_string()));
        }
        match self.scheme.as_str() {
            "https" | "http" => Ok(()),
            other => Err(SweepError::Config(format!(
                "Unsupported Tencent scheme '{other}'. Expected https or http"
            ))),
        }
    }
}

impl fmt::Debug for TencentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TencentConfig")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// Aliyun OSS credentials and endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct AliyunConfig {
    /// AccessKey ID
    pub access_key_id: String,

    /// AccessKey secret
    pub access_key_secret: String,

    /// Endpoint host, e.g. `oss-cn-hangzhou.aliyuncs.com`
    pub endpoint: String,
}

impl AliyunConfig {
    /// Create a config with the default endpoint.
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            endpoint: DEFAULT_ALIYUN_ENDPOINT.to_string(),
        }
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Check that credentials and endpoint are present.
    pub fn validate(&self) -> Result<()> {
        if self.access_key_id.trim().is_empty() || self.access_key_secret.trim().is_empty() {
            return Err(SweepError::Config(
                "Aliyun credentials missing: set ALIYUN_ACCESS_KEY_ID and ALIYUN_ACCESS_KEY_SECRET"
                    .to_string(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(SweepError::Config("Aliyun endpoint must not be empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for AliyunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliyunConfig")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Backend selection plus its credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderConfig {
    Tencent(TencentConfig),
    Aliyun(AliyunConfig),
}

impl ProviderConfig {
    /// Which provider this config selects.
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Tencent(_) => ProviderKind::Tencent,
            Self::Aliyun(_) => ProviderKind::Aliyun,
        }
    }

    /// Validate the selected provider's settings.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Tencent(config) => config.validate(),
            Self::Aliyun(config) => config.validate(),
        }
    }
}

/// SDK client settings shared by both backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Per-operation timeout in seconds
    pub timeout_secs: u64,

    /// Total attempts per call, including the first one
    pub max_attempts: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_attempts: 3,
        }
    }
}

impl SessionSettings {
    /// Set the per-operation timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the total attempts per call.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}
