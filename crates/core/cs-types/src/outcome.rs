//! Per-object deletion results.

use serde::{Deserialize, Serialize};

use crate::FileDescriptor;

/// What happened to one object handed to the deleter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The backend confirmed the deletion
    Deleted,
    /// The deletion was attempted and failed
    Failed,
    /// Dry-run: the object would have been deleted
    Simulated,
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deleted => write!(f, "deleted"),
            Self::Failed => write!(f, "failed"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

/// The result of deleting (or simulating deletion of) one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    /// Bucket of the object
    pub bucket: String,

    /// Key of the object
    pub key: String,

    /// Size of the object in bytes, as listed
    pub size: u64,

    /// Outcome kind
    pub kind: OutcomeKind,

    /// Failure detail for [`OutcomeKind::Failed`]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl DeletionOutcome {
    /// A confirmed deletion.
    pub fn deleted(file: &FileDescriptor) -> Self {
        Self::from_file(file, OutcomeKind::Deleted, None)
    }

    /// A failed deletion with its cause.
    pub fn failed(file: &FileDescriptor, error: impl Into<String>) -> Self {
        Self::from_file(file, OutcomeKind::Failed, Some(error.into()))
    }

    /// A dry-run deletion.
    pub fn simulated(file: &FileDescriptor) -> Self {
        Self::from_file(file, OutcomeKind::Simulated, None)
    }

    fn from_file(file: &FileDescriptor, kind: OutcomeKind, error: Option<String>) -> Self {
        Self {
            bucket: file.bucket.clone(),
            key: file.key.clone(),
            size: file.size,
            kind,
            error,
        }
    }

    /// Returns true only for a real, confirmed deletion.
    ///
    /// Simulated outcomes are never reported as succeeded.
    pub fn succeeded(&self) -> bool {
        self.kind == OutcomeKind::Deleted
    }

    /// Returns true for a dry-run outcome.
    pub fn is_simulated(&self) -> bool {
        self.kind == OutcomeKind::Simulated
    }

    /// Returns true for a failed deletion.
    pub fn is_failed(&self) -> bool {
        self.kind == OutcomeKind::Failed
    }
}

/// A provider's per-key answer to a batch delete call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeletion {
    /// The key that was submitted
    pub key: String,

    /// `None` when the backend confirmed deletion
    pub error: Option<String>,
}

impl KeyDeletion {
    /// A key the backend deleted.
    pub fn deleted(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            error: None,
        }
    }

    /// A key the backend failed to delete.
    pub fn failed(key: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            error: Some(error.into()),
        }
    }

    /// Returns true when the backend confirmed deletion.
    pub fn is_deleted(&self) -> bool {
        self.error.is_none()
    }
}
