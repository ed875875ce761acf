//! cs-sweeper - Scan, filter and batch-delete pipeline.
//!
//! The pipeline is a chain of lazy streams:
//!
//! 1. [`Scanner::scan`] lists matching buckets and their objects, keeping
//!    objects whose key matches the glob and whose modification time is
//!    before the cutoff
//! 2. [`SafeDeleter::run`] groups them into single-bucket batches and issues
//!    one delete call per batch
//! 3. The caller consumes [`DeletionOutcome`](cs_types::DeletionOutcome)s and
//!    folds them into [`DeletionStats`]
//!
//! [`summarize`] runs step 1 on its own so totals can be shown before
//! anything is deleted.

mod config;
mod cutoff;
mod deleter;
mod pattern;
mod scanner;
mod stats;
mod summary;

pub use config::{DEFAULT_BATCH_SIZE, DEFAULT_RATE_LIMIT, SweepConfig};
pub use cutoff::{CutoffZone, parse_cutoff};
pub use deleter::SafeDeleter;
pub use pattern::{CompiledPatterns, compile_bucket_pattern, compile_key_pattern};
pub use scanner::Scanner;
pub use stats::{DeletionStats, MAX_RECORDED_ERRORS};
pub use summary::summarize;
