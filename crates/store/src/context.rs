//! One place that owns every generation store for an application instance.

use std::sync::Arc;

use genpanel_client::{GenerationDataFetcher, GenerationDataSource};
use genpanel_core::SourceImageResolver;

use crate::environment::Environment;
use crate::form::GenerationFormStore;
use crate::panel::GenerationStore;
use crate::persist::{PersistError, PersistStorage};
use crate::remix::RemixStore;

/// Shared handles to the panel store and its collaborators.
///
/// Cheaply cloneable; every field is behind an `Arc`.
#[derive(Clone)]
pub struct GenerationContext {
    pub panel: Arc<GenerationStore>,
    pub form: Arc<GenerationFormStore>,
    pub remix: Arc<RemixStore>,
    pub fetcher: Arc<GenerationDataFetcher>,
}

impl GenerationContext {
    /// Hydrate the persisted stores from `storage` and wire up the panel.
    pub async fn new(
        source: Arc<dyn GenerationDataSource>,
        resolver: Arc<dyn SourceImageResolver>,
        storage: Arc<dyn PersistStorage>,
        environment: Arc<dyn Environment>,
    ) -> Result<Self, PersistError> {
        let form = Arc::new(GenerationFormStore::load(Arc::clone(&storage)).await?);
        let remix = Arc::new(RemixStore::load(storage).await?);
        let fetcher = Arc::new(GenerationDataFetcher::new(source));

        let panel = Arc::new(GenerationStore::new(
            Arc::clone(&fetcher),
            resolver,
            Arc::clone(&form),
            Arc::clone(&remix),
            environment,
        ));

        tracing::debug!("Generation context created");

        Ok(Self {
            panel,
            form,
            remix,
            fetcher,
        })
    }
}
