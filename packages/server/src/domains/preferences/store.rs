//! Process-wide language and theme preferences, persisted as JSON.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub language: Language,
    pub theme: Theme,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct PreferencesPatch {
    pub language: Option<Language>,
    pub theme: Option<Theme>,
}

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to access preferences file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Explicit preference store shared by handle.
#[derive(Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    current: Arc<RwLock<Preferences>>,
}

impl PreferenceStore {
    /// Load persisted preferences, falling back to defaults when the file is
    /// missing or unreadable.
    pub async fn init(path: impl Into<PathBuf>) -> Result<Self, PreferencesError> {
        let path = path.into();
        let preferences = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Preferences>(&bytes) {
                Ok(preferences) => preferences,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable preferences file");
                    Preferences::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
            Err(source) => return Err(PreferencesError::Io { path, source }),
        };

        info!(path = %path.display(), ?preferences, "Preferences loaded");
        Ok(Self {
            path,
            current: Arc::new(RwLock::new(preferences)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn current(&self) -> Preferences {
        *self.current.read().await
    }

    /// Apply a change and persist it before returning.
    pub async fn update(&self, patch: PreferencesPatch) -> Result<Preferences, PreferencesError> {
        let mut current = self.current.write().await;
        let mut next = *current;
        if let Some(language) = patch.language {
            next.language = language;
        }
        if let Some(theme) = patch.theme {
            next.theme = theme;
        }

        let bytes = serde_json::to_vec_pretty(&next)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|source| PreferencesError::Io {
                path: self.path.clone(),
                source,
            })?;

        *current = next;
        debug!(?next, "Preferences updated");
        Ok(next)
    }
}
