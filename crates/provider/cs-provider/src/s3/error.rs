//! Mapping of SDK failures onto the sweep error taxonomy.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use cs_error::SweepError;

/// Codes that reject the credentials themselves.
const CREDENTIAL_CODES: &[&str] = &["InvalidAccessKeyId", "SignatureDoesNotMatch", "InvalidSecretId"];

/// Codes that deny access to the addressed resource.
const DENIED_CODES: &[&str] = &["AccessDenied", "AccessForbidden"];

const THROTTLE_CODES: &[&str] = &[
    "SlowDown",
    "TooManyRequests",
    "RequestLimitExceeded",
    "Throttling",
];

/// Map an SDK error from `operation` onto a [`SweepError`].
///
/// `bucket` is the bucket the call addressed, if any; only bucket-scoped
/// calls can produce [`SweepError::BucketNotFound`]. A bucket that exists
/// but denies access is reported the same way as a missing one, so the
/// scan skips it. Rejected credentials are always
/// [`SweepError::Authentication`].
pub(crate) fn map_sdk_error<E>(
    err: &SdkError<E, HttpResponse>,
    operation: &str,
    bucket: Option<&str>,
) -> SweepError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let detail = match err.message() {
        Some(message) => message.to_string(),
        None => DisplayErrorContext(err).to_string(),
    };

    classify(operation, err.code(), status, bucket, &detail)
}

fn classify(
    operation: &str,
    code: Option<&str>,
    status: Option<u16>,
    bucket: Option<&str>,
    detail: &str,
) -> SweepError {
    let labelled = match code {
        Some(code) => format!("{operation} failed: {code}: {detail}"),
        None => format!("{operation} failed: {detail}"),
    };

    let code = code.unwrap_or_default();

    if CREDENTIAL_CODES.contains(&code) || status == Some(401) {
        return SweepError::Authentication(labelled);
    }

    let denied = DENIED_CODES.contains(&code) || status == Some(403);
    if let Some(bucket) = bucket {
        let missing = code == "NoSuchBucket" || (code.is_empty() && status == Some(404));
        if missing || denied {
            return SweepError::bucket_not_found(bucket, labelled);
        }
    }

    if denied {
        return SweepError::Authentication(labelled);
    }

    if THROTTLE_CODES.contains(&code) || status == Some(429) {
        return SweepError::RateLimited(labelled);
    }

    SweepError::Provider(labelled)
}
