mod api;
mod codec;
mod error;
mod maintenance;
mod record_key;
mod redb_store;

pub use api::*;
pub use error::*;
pub use record_key::RecordKey;
pub use redb_store::RedbVersionStore;
