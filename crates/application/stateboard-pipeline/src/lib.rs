pub mod query;
pub mod sync;

// Re-export core engine components
pub use query::{QueryError, QueryFacade};
pub use sync::{
    s3_engine, spawn_sync_worker, CycleReport, KeyReport, KeySnapshot, ObjectSource,
    S3ObjectSource, SyncEngine, SyncError, SyncOptions,
};
