pub mod store;

pub use store::{
    Language, PreferenceStore, Preferences, PreferencesError, PreferencesPatch, Theme,
};
