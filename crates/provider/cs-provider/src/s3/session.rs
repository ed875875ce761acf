//! SDK session and per-endpoint client cache.

use std::collections::HashMap;
use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{
    Credentials, RequestChecksumCalculation, ResponseChecksumValidation,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::config::SessionSettings;

/// Loaded SDK configuration plus one client per endpoint.
///
/// Buckets live in different regions and each region has its own endpoint,
/// so clients are built lazily the first time an endpoint is needed.
pub(crate) struct S3Session {
    base: SdkConfig,
    clients: Mutex<HashMap<String, Client>>,
}

impl S3Session {
    /// Load the base SDK configuration with explicit credentials.
    pub(crate) async fn connect(
        access_key: &str,
        secret_key: &str,
        provider_name: &'static str,
        settings: &SessionSettings,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, provider_name);

        let timeouts = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(settings.timeout_secs))
            .build();

        let base = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .timeout_config(timeouts)
            .retry_config(RetryConfig::standard().with_max_attempts(settings.max_attempts))
            .load()
            .await;

        Self {
            base,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Get (or build) the client for an endpoint URL.
    pub(crate) fn client(&self, endpoint: &str, region: &str) -> Client {
        let mut clients = self.clients.lock();
        clients
            .entry(endpoint.to_string())
            .or_insert_with(|| {
                debug!(endpoint, region, "Creating storage client");

                // Neither backend understands the SDK's default flexible checksums
                let config = aws_sdk_s3::config::Builder::from(&self.base)
                    .region(Region::new(region.to_string()))
                    .endpoint_url(endpoint)
                    .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
                    .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
                    .build();

                Client::from_conf(config)
            })
            .clone()
    }
}
