//! In-memory previews for documents picked in the wizard.
//!
//! A preview lives exactly as long as its `PreviewHandle`: replacing a file
//! or tearing the wizard down drops the handle and revokes the preview.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::capture::DocumentFile;
use crate::common::PreviewId;

#[derive(Debug, Clone)]
pub struct PreviewContent {
    pub content_type: String,
    pub data: Bytes,
}

/// Cloneable registry shared by every wizard session and the preview route.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Mutex<HashMap<PreviewId, PreviewContent>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PreviewId, PreviewContent>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a preview for `file`. Keep the handle alive while the
    /// preview should stay reachable.
    pub fn create(&self, file: &DocumentFile) -> PreviewHandle {
        let id = PreviewId::new();
        self.entries().insert(
            id,
            PreviewContent {
                content_type: file.content_type.clone(),
                data: file.data.clone(),
            },
        );
        debug!(preview_id = %id, content_type = %file.content_type, "Preview created");
        PreviewHandle {
            id,
            registry: self.clone(),
        }
    }

    pub fn get(&self, id: PreviewId) -> Option<PreviewContent> {
        self.entries().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn revoke(&self, id: PreviewId) {
        if self.entries().remove(&id).is_some() {
            debug!(preview_id = %id, "Preview revoked");
        }
    }
}

/// Owning handle for a registered preview; revokes it on drop.
pub struct PreviewHandle {
    id: PreviewId,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    pub fn id(&self) -> PreviewId {
        self.id
    }

    pub fn url(&self) -> String {
        format!("/api/previews/{}", self.id)
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.id).finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.revoke(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> DocumentFile {
        DocumentFile::new("me.png", Some("image/png"), Bytes::from_static(b"png"))
    }

    #[test]
    fn test_preview_available_while_handle_alive() {
        let registry = PreviewRegistry::new();
        let handle = registry.create(&png());

        let content = registry.get(handle.id()).unwrap();
        assert_eq!(content.content_type, "image/png");
        assert_eq!(handle.url(), format!("/api/previews/{}", handle.id()));
    }

    #[test]
    fn test_dropping_handle_revokes_preview() {
        let registry = PreviewRegistry::new();
        let handle = registry.create(&png());
        let id = handle.id();

        drop(handle);

        assert!(registry.get(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replacing_slot_releases_previous_preview() {
        let registry = PreviewRegistry::new();
        let mut slot = Some(registry.create(&png()));
        let first = slot.as_ref().unwrap().id();

        slot = Some(registry.create(&png()));

        assert!(registry.get(first).is_none());
        assert_eq!(registry.len(), 1);
        drop(slot);
        assert!(registry.is_empty());
    }
}
