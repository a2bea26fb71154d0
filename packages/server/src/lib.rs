// Telehealth Provider Onboarding - API Core
//
// Drives the provider signup wizard and the multi-phase registration
// orchestrator, and serves the dashboard helpers (prescreening badges,
// voice assistant sessions, language/theme preferences).

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
