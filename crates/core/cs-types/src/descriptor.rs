//! Listing entries produced by storage providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An object found while listing a bucket.
///
/// Built by a provider adapter from a raw listing entry and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Bucket the object lives in
    pub bucket: String,

    /// The object key (full path within the bucket)
    pub key: String,

    /// Size of the object in bytes
    pub size: u64,

    /// Last modified timestamp
    pub last_modified: DateTime<Utc>,

    /// Storage class reported by the backend, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub storage_class: Option<String>,
}

impl FileDescriptor {
    /// Create a new descriptor without a storage class.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        size: u64,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            size,
            last_modified,
            storage_class: None,
        }
    }

    /// Attach the storage class reported by the backend.
    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = Some(storage_class.into());
        self
    }

    /// The extension of the key's final path segment, including the dot.
    ///
    /// Returns `None` for keys without an extension and for dot-files such as
    /// `.env`.
    pub fn extension(&self) -> Option<&str> {
        let filename = self.key.rsplit('/').next().unwrap_or(&self.key);
        match filename.rfind('.') {
            Some(0) | None => None,
            Some(idx) if idx + 1 == filename.len() => None,
            Some(idx) => Some(&filename[idx..]),
        }
    }
}

/// A bucket returned by a provider's bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDescriptor {
    /// Bucket name
    pub name: String,

    /// Region or location reported by the backend
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub region: Option<String>,

    /// Creation timestamp, if the backend reports one
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl BucketDescriptor {
    /// Create a descriptor with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: None,
            created_at: None,
        }
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// One page of a backend listing.
///
/// `next_marker` is the opaque continuation token for the following page,
/// or `None` when the listing is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Entries on this page, in backend order
    pub items: Vec<T>,

    /// Marker to request the next page
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_marker: None,
        }
    }

    /// A page followed by another page at `marker`.
    pub fn with_next(items: Vec<T>, marker: impl Into<String>) -> Self {
        Self {
            items,
            next_marker: Some(marker.into()),
        }
    }

    /// Returns true if no further page follows.
    pub fn is_last(&self) -> bool {
        self.next_marker.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_file(key: &str) -> FileDescriptor {
        FileDescriptor::new(
            "test-1",
            key,
            1024,
            Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_extension() {
        assert_eq!(make_file("app.log").extension(), Some(".log"));
        assert_eq!(make_file("logs/2023/app.log.gz").extension(), Some(".gz"));
        assert_eq!(make_file("README").extension(), None);
        assert_eq!(make_file("config/.env").extension(), None);
        assert_eq!(make_file("dir.d/file").extension(), None);
        assert_eq!(make_file("trailing.").extension(), None);
    }

    #[test]
    fn test_storage_class_serialization() {
        let plain = make_file("a.log");
        let json = serde_json::to_string(&plain).unwrap();
        assert!(!json.contains("storage_class"));

        let archived = make_file("a.log").with_storage_class("ARCHIVE");
        let json = serde_json::to_string(&archived).unwrap();
        assert!(json.contains("\"storage_class\":\"ARCHIVE\""));
    }

    #[test]
    fn test_bucket_builder() {
        let bucket = BucketDescriptor::new("logs-1250000000").with_region("ap-guangzhou");
        assert_eq!(bucket.name, "logs-1250000000");
        assert_eq!(bucket.region.as_deref(), Some("ap-guangzhou"));
        assert!(bucket.created_at.is_none());
    }

    #[test]
    fn test_page_markers() {
        let page = Page::with_next(vec![1, 2, 3], "3");
        assert!(!page.is_last());
        assert_eq!(page.next_marker.as_deref(), Some("3"));

        let last: Page<u32> = Page::last(Vec::new());
        assert!(last.is_last());
    }
}
