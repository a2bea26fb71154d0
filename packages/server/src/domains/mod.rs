// Business domains
pub mod documents;
pub mod preferences;
pub mod prescreening;
pub mod providers;
pub mod voice;
