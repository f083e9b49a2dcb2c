//! Synchronization of destinations against the source structure

pub mod batch;
pub mod input;
pub mod orchestrator;
pub mod outcome;

pub use batch::{batch_key, Buckets, Phase};
pub use orchestrator::{plan_destination, sync_destination, SourceInput, SyncContext, SyncOrchestrator, SyncSettings};
pub use outcome::{BucketCounts, ResultCode, SyncOutcome, SyncReport};
