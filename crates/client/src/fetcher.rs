//! Memoizing front for a [`GenerationDataSource`].
//!
//! Generation data is immutable history: once the API has answered for a
//! reference, the answer never changes. The cache therefore has no eviction
//! and no invalidation; entries live as long as the fetcher does.
//!
//! Concurrent misses on the same key are not coalesced. Each caller performs
//! its own request and the last one to complete owns the slot.

use std::collections::HashMap;
use std::sync::Arc;

use genpanel_core::{GenerationData, GenerationDataReference};
use tokio::sync::RwLock;

use crate::api::{FetchError, GenerationDataSource};

/// Fetches generation data, serving repeats from an unbounded cache.
///
/// Designed to be wrapped in `Arc` and shared across the application.
pub struct GenerationDataFetcher {
    source: Arc<dyn GenerationDataSource>,
    cache: RwLock<HashMap<String, GenerationData>>,
}

impl GenerationDataFetcher {
    pub fn new(source: Arc<dyn GenerationDataSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Return the data for `reference`, fetching it on first use.
    pub async fn fetch(
        &self,
        reference: &GenerationDataReference,
    ) -> Result<GenerationData, FetchError> {
        let key = reference.cache_key();

        if let Some(hit) = self.cache.read().await.get(&key) {
            tracing::debug!(%key, "Generation data cache hit");
            return Ok(hit.clone());
        }

        tracing::debug!(%key, "Generation data cache miss");
        // The lock is not held across the request.
        let data = self.source.get_generation_data(reference).await?;

        self.cache.write().await.insert(key, data.clone());
        Ok(data)
    }

    /// Whether a value is cached for `reference`.
    pub async fn contains(&self, reference: &GenerationDataReference) -> bool {
        self.cache.read().await.contains_key(&reference.cache_key())
    }

    /// The cached value for `reference`, without fetching.
    pub async fn cached(&self, reference: &GenerationDataReference) -> Option<GenerationData> {
        self.cache.read().await.get(&reference.cache_key()).cloned()
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use genpanel_core::MediaType;

    use super::*;

    /// Source that answers with a prompt naming the reference, or fails
    /// with 500 when `fail` is set.
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl GenerationDataSource for CountingSource {
        async fn get_generation_data(
            &self,
            reference: &GenerationDataReference,
        ) -> Result<GenerationData, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Let a concurrent caller reach its own miss.
            tokio::task::yield_now().await;
            if self.fail {
                return Err(FetchError::Status {
                    status: 500,
                    status_text: "Internal Server Error".into(),
                });
            }
            let mut params = genpanel_core::Params::new();
            params.insert("prompt".into(), reference.cache_key().into());
            Ok(GenerationData {
                media_type: MediaType::Image,
                params,
                resources: vec![],
                remix_of: None,
            })
        }
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let source = Arc::new(CountingSource::default());
        let fetcher = GenerationDataFetcher::new(source.clone());
        let reference = GenerationDataReference::model_version(42);

        let first = fetcher.fetch(&reference).await.unwrap();
        let second = fetcher.fetch(&reference).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(fetcher.contains(&reference).await);
    }

    #[tokio::test]
    async fn epoch_is_a_distinct_cache_entry() {
        let source = Arc::new(CountingSource::default());
        let fetcher = GenerationDataFetcher::new(source.clone());

        fetcher
            .fetch(&GenerationDataReference::model_version(42))
            .await
            .unwrap();
        fetcher
            .fetch(&GenerationDataReference::model_version_epoch(42, 2))
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.len().await, 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = Arc::new(CountingSource {
            fail: true,
            ..Default::default()
        });
        let fetcher = GenerationDataFetcher::new(source.clone());
        let reference = GenerationDataReference::entity("image", 7);

        assert_matches!(
            fetcher.fetch(&reference).await,
            Err(FetchError::Status { status: 500, .. })
        );
        assert_matches!(fetcher.fetch(&reference).await, Err(_));

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(fetcher.is_empty().await);
        assert!(fetcher.cached(&reference).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_misses_each_hit_the_source() {
        let source = Arc::new(CountingSource::default());
        let fetcher = GenerationDataFetcher::new(source.clone());
        let reference = GenerationDataReference::model_versions(vec![1, 2]);

        let (a, b) = tokio::join!(fetcher.fetch(&reference), fetcher.fetch(&reference));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.len().await, 1);
    }
}
