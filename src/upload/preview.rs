//! Thumbnail handles for files that have not been uploaded yet.
//!
//! A [`PreviewHandle`] stands for a locally derived object URL. The pool that
//! issued it keeps a registry of every live handle; dropping a handle revokes
//! it, so no removal or reset path can leak one.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::file::SelectedFile;

#[derive(Default)]
struct Registry {
    live: Mutex<HashSet<Uuid>>,
}

impl Registry {
    fn live(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        // A panic while holding the lock cannot leave the set half-updated.
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Issues and tracks preview handles for one form instance.
#[derive(Clone, Default)]
pub struct PreviewPool {
    registry: Arc<Registry>,
}

impl PreviewPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, file: &SelectedFile) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.registry.live().insert(id);
        tracing::trace!(%id, file = file.name(), "preview created");

        PreviewHandle {
            id,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Number of handles issued by this pool that are still alive.
    pub fn live_count(&self) -> usize {
        self.registry.live().len()
    }

    pub fn is_live(&self, url: &str) -> bool {
        url.strip_prefix(URL_PREFIX)
            .and_then(|id| id.parse::<Uuid>().ok())
            .is_some_and(|id| self.registry.live().contains(&id))
    }
}

impl std::fmt::Debug for PreviewPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewPool")
            .field("live", &self.live_count())
            .finish()
    }
}

const URL_PREFIX: &str = "blob:preview/";

/// A revocable thumbnail reference. Revoked when dropped.
pub struct PreviewHandle {
    id: Uuid,
    registry: Arc<Registry>,
}

impl PreviewHandle {
    pub fn url(&self) -> String {
        format!("{URL_PREFIX}{}", self.id)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.live().remove(&self.id);
        tracing::trace!(id = %self.id, "preview revoked");
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.id).finish()
    }
}
