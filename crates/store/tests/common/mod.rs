//! Shared fakes for panel store integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use genpanel_client::{FetchError, GenerationDataSource};
use genpanel_core::{
    GenerationData, GenerationDataReference, Params, ResolutionError, SourceImage,
    SourceImageResolver,
};
use genpanel_store::{GenerationContext, MemoryStorage, PersistStorage, StaticEnvironment};

/// Build a `Params` map from a JSON object literal.
pub fn params(value: serde_json::Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

/// Build `GenerationData` from its JSON wire form.
pub fn generation_data(value: serde_json::Value) -> GenerationData {
    serde_json::from_value(value).expect("valid generation data")
}

// ---------------------------------------------------------------------------
// FakeSource
// ---------------------------------------------------------------------------

/// In-memory generation data source keyed by cache key.
///
/// Unknown keys fail with 404. Per-key delays let tests control the order
/// in which overlapping requests complete.
#[derive(Default)]
pub struct FakeSource {
    responses: Mutex<HashMap<String, GenerationData>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, reference: &GenerationDataReference, data: GenerationData) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(reference.cache_key(), data);
    }

    pub fn delay(&self, reference: &GenerationDataReference, delay: Duration) {
        self.delays
            .lock()
            .expect("delays lock")
            .insert(reference.cache_key(), delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationDataSource for FakeSource {
    async fn get_generation_data(
        &self,
        reference: &GenerationDataReference,
    ) -> Result<GenerationData, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = reference.cache_key();

        let delay = self.delays.lock().expect("delays lock").get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().expect("responses lock").get(&key).cloned();
        response.ok_or_else(|| FetchError::Status {
            status: 404,
            status_text: "Not Found".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// FakeResolver
// ---------------------------------------------------------------------------

/// Resolves every URL to a 1024x768 image, except URLs containing
/// `missing`, which fail with 404.
#[derive(Default)]
pub struct FakeResolver {
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceImageResolver for FakeResolver {
    async fn resolve(&self, url: &str) -> Result<SourceImage, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("missing") {
            return Err(ResolutionError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(SourceImage {
            url: url.to_string(),
            width: 1024,
            height: 768,
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub ctx: GenerationContext,
    pub source: Arc<FakeSource>,
    pub resolver: Arc<FakeResolver>,
    pub storage: Arc<dyn PersistStorage>,
}

/// Context on the generation route of a desktop viewport.
pub async fn harness() -> Harness {
    harness_with(StaticEnvironment::new(false, "/generate"), Arc::new(MemoryStorage::new())).await
}

pub async fn harness_with(
    environment: StaticEnvironment,
    storage: Arc<dyn PersistStorage>,
) -> Harness {
    let source = FakeSource::new();
    let resolver = Arc::new(FakeResolver::default());
    let ctx = GenerationContext::new(
        source.clone(),
        resolver.clone(),
        Arc::clone(&storage),
        Arc::new(environment),
    )
    .await
    .expect("context");

    Harness {
        ctx,
        source,
        resolver,
        storage,
    }
}
