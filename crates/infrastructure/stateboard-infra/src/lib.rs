pub mod net;
pub mod s3;

// Re-exports for convenience
pub use net::{default_http_client, RequestLimiter};
pub use s3::{ObjectSummary, ObjectVersion, S3Client, S3Config, S3Error};
