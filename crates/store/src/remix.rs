//! Persisted reference to the content currently being remixed.
//!
//! Written wholesale by the panel store after it loads image, audio or
//! video generation data; read directly by unrelated UI.

use std::sync::Arc;

use genpanel_core::{DbId, GenerationResource, Params, RemixOfProps};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::persist::{self, PersistError, PersistStorage};

/// Slot name for the persisted remix state.
pub const REMIX_SLOT: &str = "remixOf";
/// The remix slot carries no explicit schema version.
pub const REMIX_VERSION: f64 = 0.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemixState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<GenerationResource>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remix_of: Option<RemixOfProps>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remix_of_id: Option<DbId>,
}

pub struct RemixStore {
    state: RwLock<RemixState>,
    storage: Arc<dyn PersistStorage>,
}

impl RemixStore {
    pub async fn load(storage: Arc<dyn PersistStorage>) -> Result<Self, PersistError> {
        let state: RemixState = persist::hydrate(storage.as_ref(), REMIX_SLOT, REMIX_VERSION)
            .await?
            .unwrap_or_default();
        Ok(Self {
            state: RwLock::new(state),
            storage,
        })
    }

    pub async fn snapshot(&self) -> RemixState {
        self.state.read().await.clone()
    }

    /// Replace the whole state; nothing from the previous state survives.
    pub async fn replace(&self, next: RemixState) {
        let mut state = self.state.write().await;
        *state = next;
        self.save(&state).await;
    }

    pub async fn clear(&self) {
        self.replace(RemixState::default()).await;
    }

    async fn save(&self, state: &RemixState) {
        if let Err(e) =
            persist::persist(self.storage.as_ref(), REMIX_SLOT, REMIX_VERSION, state).await
        {
            tracing::warn!(slot = REMIX_SLOT, error = %e, "Failed to persist remix state");
        }
    }
}
