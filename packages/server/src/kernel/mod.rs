//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod postgres_store;
pub mod stream_hub;
pub mod test_dependencies;
pub mod traits;
pub mod vapi_client;

pub use deps::{ServerDeps, SupabaseAdapter};
pub use postgres_store::PostgresRecordStore;
pub use stream_hub::StreamHub;
pub use test_dependencies::TestDependencies;
pub use traits::*;
pub use vapi_client::VapiClient;
