//! Core traits for cloud-sweep.
//!
//! This crate defines the seams between the pipeline and storage backends:
//! - [`StorageBackend`] - Page-at-a-time adapter contract (Tencent COS, Aliyun OSS, test stubs)
//! - [`StorageProvider`] - Lazy, rate-limited contract consumed by the scanner and deleter

pub mod storage;

pub use storage::*;
