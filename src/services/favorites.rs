use std::sync::Arc;

use crate::{
    backend::VoiceBackend,
    models::{FavoriteRow, Identity},
    storage::{LocalStore, StoreKey},
};

/// Persistent ordered set of liked candidate ids
///
/// Order is insertion order (first liked first), no duplicates. The local
/// copy is the source of truth for the UI; remote mirroring is best-effort
/// and never rolls back a local mutation.
pub struct FavoritesStore {
    ids: Vec<String>,
    hydrated: bool,
    store: LocalStore,
    backend: Arc<dyn VoiceBackend>,
}

impl FavoritesStore {
    /// Hydrates the liked-id sequence from the local store
    pub fn load(store: LocalStore, backend: Arc<dyn VoiceBackend>) -> Self {
        let ids: Vec<String> = store.load(StoreKey::Favorites).unwrap_or_default();

        tracing::debug!(favorite_count = ids.len(), "Favorites hydrated");

        Self {
            ids,
            hydrated: true,
            store,
            backend,
        }
    }

    /// Distinguishes "not yet loaded" from "loaded and empty"
    pub fn hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    /// Liked ids in first-liked-first order
    pub fn ordered_ids(&self) -> &[String] {
        &self.ids
    }

    pub fn liked_count(&self) -> usize {
        self.ids.len()
    }

    /// Appends a liked id; idempotent
    ///
    /// Returns false (and does nothing) when the id is already present.
    /// With a known identity the row is also mirrored to the backend as a
    /// detached upsert.
    pub fn add(&mut self, id: &str, identity: Option<Identity>) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        self.store.persist_in_background(StoreKey::Favorites, &self.ids);

        if let Some(identity) = identity {
            let row = FavoriteRow {
                user_id: identity.0,
                post_id: id.to_string(),
            };
            let backend = Arc::clone(&self.backend);
            tokio::spawn(async move {
                if let Err(e) = backend.upsert_favorite(row).await {
                    tracing::warn!(error = %e, "Favorite upsert failed");
                }
            });
        }

        true
    }

    /// Removes a liked id; no-op when absent
    pub fn remove(&mut self, id: &str, identity: Option<Identity>) -> bool {
        let before = self.ids.len();
        self.ids.retain(|i| i != id);
        if self.ids.len() == before {
            return false;
        }
        self.store.persist_in_background(StoreKey::Favorites, &self.ids);

        if let Some(identity) = identity {
            let row = FavoriteRow {
                user_id: identity.0,
                post_id: id.to_string(),
            };
            let backend = Arc::clone(&self.backend);
            tokio::spawn(async move {
                if let Err(e) = backend.delete_favorite(row).await {
                    tracing::warn!(error = %e, "Favorite delete failed");
                }
            });
        }

        true
    }
}
