//! Error types and classification for cloud-sweep.
//!
//! This crate provides:
//! - [`SweepError`] - Top-level error enum for the scan/delete pipeline
//! - [`PatternError`] - Construction-time failure for bucket/file patterns
//! - [`ErrorCategory`] for deciding whether a failure aborts, skips, or retries
//! - [`OperationKind`] and [`classify_error`] for context-aware classification

use std::fmt;

use thiserror::Error;

/// Top-level error type for cloud-sweep.
#[derive(Error, Debug)]
pub enum SweepError {
    /// A bucket or file pattern failed to compile
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Credentials were rejected, or a service-level call was denied
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The bucket does not exist or is not accessible
    #[error("Bucket not found: {bucket}: {message}")]
    BucketNotFound { bucket: String, message: String },

    /// The backend throttled a call despite local rate limiting
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Transport or API failure on a list or delete call
    #[error("Provider error: {0}")]
    Provider(String),

    /// Invalid configuration (batch size, cutoff, credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SweepError {
    /// Create a [`SweepError::BucketNotFound`] for the given bucket.
    pub fn bucket_not_found(bucket: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BucketNotFound {
            bucket: bucket.into(),
            message: message.into(),
        }
    }
}

/// Which pattern a [`PatternError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternTarget {
    /// The bucket-name regular expression
    Bucket,
    /// The object-key glob
    File,
}

impl fmt::Display for PatternTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bucket => write!(f, "bucket"),
            Self::File => write!(f, "file"),
        }
    }
}

/// A malformed bucket regex or file glob.
///
/// Always raised locally, before any network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {target} pattern '{pattern}': {reason}")]
pub struct PatternError {
    /// Which pattern failed
    pub target: PatternTarget,
    /// The pattern as supplied
    pub pattern: String,
    /// Why it was rejected
    pub reason: String,
}

impl PatternError {
    /// Create a new pattern error.
    pub fn new(target: PatternTarget, pattern: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            target,
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}

/// Error classification for pipeline decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Abort the pipeline.
    ///
    /// Examples: malformed pattern, rejected credentials, listing failure
    Fatal,

    /// Skip the affected bucket and continue with the others.
    SkipBucket,

    /// The backend throttled us; the caller may retry later.
    Retryable,

    /// Record a failed outcome for the affected objects and continue.
    ///
    /// Examples: transport failure during a batch delete
    ObjectFailure,
}

/// The kind of provider call that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Bucket or object listing
    List,
    /// Batch deletion
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Classifies an error to determine how the pipeline reacts.
///
/// # Arguments
///
/// * `error` - The error to classify
/// * `operation` - The provider call that failed
///
/// # Returns
///
/// The appropriate [`ErrorCategory`]
pub fn classify_error(error: &SweepError, operation: OperationKind) -> ErrorCategory {
    match error {
        SweepError::Pattern(_) => ErrorCategory::Fatal,
        SweepError::Config(_) => ErrorCategory::Fatal,
        SweepError::Authentication(_) => ErrorCategory::Fatal,
        SweepError::BucketNotFound { .. } => match operation {
            OperationKind::List => ErrorCategory::SkipBucket,
            OperationKind::Delete => ErrorCategory::ObjectFailure,
        },
        SweepError::RateLimited(_) => ErrorCategory::Retryable,
        SweepError::Provider(_) | SweepError::Other(_) => match operation {
            OperationKind::List => ErrorCategory::Fatal,
            OperationKind::Delete => ErrorCategory::ObjectFailure,
        },
    }
}

/// Result type alias using SweepError.
pub type Result<T> = std::result::Result<T, SweepError>;
