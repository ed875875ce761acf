//! Shared plumbing for the S3-compatible COS and OSS APIs.
//!
//! - Session setup with explicit credentials, timeout and retry settings
//! - Service error classification onto [`SweepError`](cs_error::SweepError)
//! - Listing and batch-delete response translation

mod error;
mod session;
mod translate;

pub(crate) use error::map_sdk_error;
pub(crate) use session::S3Session;
pub(crate) use translate::{
    collect_delete_results, delete_error, delete_request, file_descriptor, location_name, to_chrono,
};
