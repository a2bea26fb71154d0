pub mod provider;

pub use provider::{NewProviderProfile, ProviderDocuments, ProviderProfile, ProviderStatus};
