//! Core types for cloud-sweep.
//!
//! This crate provides the value types passed between the pipeline stages:
//! - [`FileDescriptor`] / [`BucketDescriptor`] - Listing entries produced by providers
//! - [`Page`] - One backend listing page with its continuation marker
//! - [`DeletionOutcome`] / [`KeyDeletion`] - Per-object deletion results
//! - [`DeletionSummary`] / [`FileTypeSummary`] - Aggregates computed from a scan
//! - [`ProviderKind`] - Tag selecting a storage backend

pub mod descriptor;
pub mod outcome;
pub mod provider;
pub mod summary;

pub use descriptor::*;
pub use outcome::*;
pub use provider::*;
pub use summary::*;
