//! Persisted defaults for the generation form.
//!
//! The panel store writes `type`, `engine` and `workflow` here whenever its
//! data changes; the form reads them back on its own schedule. Persistence
//! failures are logged and otherwise ignored so a broken disk never blocks
//! the panel.

use std::sync::Arc;

use genpanel_core::MediaType;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::persist::{self, PersistError, PersistStorage};

/// Slot name for the persisted form defaults.
pub const FORM_SLOT: &str = "generation-form";
/// Schema version of the persisted form defaults.
pub const FORM_VERSION: f64 = 1.2;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefaults {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
}

/// Partial update merged into [`FormDefaults`].
///
/// `None` leaves a field alone. `workflow: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormUpdate {
    pub media_type: Option<MediaType>,
    pub engine: Option<String>,
    pub workflow: Option<Option<String>>,
}

impl FormUpdate {
    pub fn media_type(media_type: MediaType) -> Self {
        Self {
            media_type: Some(media_type),
            ..Default::default()
        }
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn with_workflow(mut self, workflow: Option<String>) -> Self {
        self.workflow = Some(workflow);
        self
    }

    fn apply_to(self, state: &mut FormDefaults) {
        if let Some(media_type) = self.media_type {
            state.media_type = media_type;
        }
        if let Some(engine) = self.engine {
            state.engine = Some(engine);
        }
        if let Some(workflow) = self.workflow {
            state.workflow = workflow;
        }
    }
}

pub struct GenerationFormStore {
    state: RwLock<FormDefaults>,
    storage: Arc<dyn PersistStorage>,
}

impl GenerationFormStore {
    /// Hydrate from `storage`, falling back to defaults when the slot is
    /// empty or from another schema version.
    pub async fn load(storage: Arc<dyn PersistStorage>) -> Result<Self, PersistError> {
        let state: FormDefaults = persist::hydrate(storage.as_ref(), FORM_SLOT, FORM_VERSION)
            .await?
            .unwrap_or_default();
        Ok(Self {
            state: RwLock::new(state),
            storage,
        })
    }

    pub async fn snapshot(&self) -> FormDefaults {
        self.state.read().await.clone()
    }

    pub async fn set_type(&self, media_type: MediaType) {
        self.apply(FormUpdate::media_type(media_type)).await;
    }

    pub async fn set_engine(&self, engine: impl Into<String>) {
        self.apply(FormUpdate {
            engine: Some(engine.into()),
            ..Default::default()
        })
        .await;
    }

    /// Merge `update` into the current defaults and persist.
    pub async fn apply(&self, update: FormUpdate) {
        let mut state = self.state.write().await;
        update.apply_to(&mut state);
        self.save(&state).await;
    }

    /// Drop everything except the media type.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = FormDefaults {
            media_type: state.media_type,
            ..Default::default()
        };
        self.save(&state).await;
    }

    async fn save(&self, state: &FormDefaults) {
        if let Err(e) = persist::persist(self.storage.as_ref(), FORM_SLOT, FORM_VERSION, state).await
        {
            tracing::warn!(slot = FORM_SLOT, error = %e, "Failed to persist form defaults");
        }
    }
}
