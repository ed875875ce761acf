//! Translation between SDK shapes and sweep types.

use std::collections::HashMap;

use aws_sdk_s3::primitives::DateTime as SdkDateTime;
use aws_sdk_s3::types::{BucketLocationConstraint, Delete, ObjectIdentifier};
use chrono::{DateTime, Utc};
use cs_error::{Result, SweepError};
use cs_types::{FileDescriptor, KeyDeletion};
use tracing::warn;

/// Error recorded for keys the backend neither confirmed nor rejected.
pub(crate) const UNREPORTED_KEY: &str = "key not reported in delete response";

/// Build a descriptor from one listing entry.
///
/// Returns `None` for entries that cannot be evaluated: an empty key, or no
/// modification time. Negative sizes are clamped to zero.
pub(crate) fn file_descriptor(
    bucket: &str,
    key: Option<&str>,
    size: Option<i64>,
    last_modified: Option<&SdkDateTime>,
    storage_class: Option<&str>,
) -> Option<FileDescriptor> {
    let key = key.filter(|k| !k.is_empty())?;

    let Some(last_modified) = last_modified.and_then(to_chrono) else {
        warn!(bucket, key, "Skipping object without a modification time");
        return None;
    };

    let size = u64::try_from(size.unwrap_or(0)).unwrap_or(0);
    let descriptor = FileDescriptor::new(bucket, key, size, last_modified);

    Some(match storage_class {
        Some(class) if !class.is_empty() => descriptor.with_storage_class(class),
        _ => descriptor,
    })
}

/// Convert an SDK timestamp to UTC.
pub(crate) fn to_chrono(timestamp: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

/// Location name from a GetBucketLocation response, if one was returned.
///
/// COS answers with a region such as `ap-beijing`, OSS with a location such
/// as `oss-cn-beijing`.
pub(crate) fn location_name(constraint: Option<&BucketLocationConstraint>) -> Option<String> {
    constraint
        .map(|c| c.as_str().trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// Build a non-quiet batch delete request body.
pub(crate) fn delete_request(keys: &[String]) -> Result<Delete> {
    let objects = keys
        .iter()
        .map(|key| {
            ObjectIdentifier::builder()
                .key(key)
                .build()
                .map_err(|e| SweepError::Provider(format!("Invalid delete key '{key}': {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Delete::builder()
        .set_objects(Some(objects))
        .quiet(false)
        .build()
        .map_err(|e| SweepError::Provider(format!("Invalid delete request: {e}")))
}

/// Arrange a batch delete response into one result per input key, in input order.
///
/// `errors` carries `(key, "code: message")` pairs. A key reported in neither
/// list is marked failed with [`UNREPORTED_KEY`].
pub(crate) fn collect_delete_results<'a>(
    keys: &[String],
    deleted: impl IntoIterator<Item = &'a str>,
    errors: impl IntoIterator<Item = (&'a str, String)>,
) -> Vec<KeyDeletion> {
    let mut reported: HashMap<&str, Option<String>> = HashMap::new();
    for key in deleted {
        reported.insert(key, None);
    }
    for (key, error) in errors {
        reported.insert(key, Some(error));
    }

    keys.iter()
        .map(|key| match reported.get(key.as_str()) {
            Some(None) => KeyDeletion::deleted(key),
            Some(Some(error)) => KeyDeletion::failed(key, error.clone()),
            None => KeyDeletion::failed(key, UNREPORTED_KEY),
        })
        .collect()
}

/// Format a per-key delete error the way it is reported to the user.
pub(crate) fn delete_error(code: Option<&str>, message: Option<&str>) -> String {
    format!(
        "{}: {}",
        code.unwrap_or("Unknown"),
        message.unwrap_or("no message")
    )
}
