use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::info;

use crate::errors::AppError;
use crate::matching::index::MatchIndex;

/// Process-wide handle to the currently loaded index.
///
/// Readers clone the inner `Arc` and drop the lock straight away, so a query
/// keeps using the index it started with even if a rebuild swaps in a new one.
#[derive(Clone, Default)]
pub struct SnapshotHandle {
    current: Arc<RwLock<Option<Arc<MatchIndex>>>>,
    rebuild: Arc<Mutex<()>>,
}

impl SnapshotHandle {
    pub fn new(initial: Option<Arc<MatchIndex>>) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial)),
            rebuild: Arc::new(Mutex::new(())),
        }
    }

    pub async fn get(&self) -> Option<Arc<MatchIndex>> {
        self.current.read().await.clone()
    }

    /// Like `get`, but a missing corpus is an error.
    pub async fn require(&self) -> Result<Arc<MatchIndex>, AppError> {
        self.get().await.ok_or(AppError::CorpusUnavailable)
    }

    pub async fn replace(&self, index: Arc<MatchIndex>) {
        let version = index.manifest().version;
        *self.current.write().await = Some(index);
        info!("Serving artifact set v{version}");
    }

    /// Serializes rebuilds; hold the guard for the whole build-commit-swap.
    pub async fn lock_rebuild(&self) -> MutexGuard<'_, ()> {
        self.rebuild.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::index::tests::sample_set;

    #[tokio::test]
    async fn test_empty_handle_requires_corpus() {
        let handle = SnapshotHandle::default();
        assert!(handle.get().await.is_none());
        assert!(matches!(
            handle.require().await,
            Err(AppError::CorpusUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_reader_keeps_old_index_across_replace() {
        let first = Arc::new(MatchIndex::from_artifacts(sample_set(2)).unwrap());
        let handle = SnapshotHandle::new(Some(first.clone()));

        let held = handle.require().await.unwrap();

        let mut next_set = sample_set(2);
        next_set.manifest.version = 2;
        handle
            .replace(Arc::new(MatchIndex::from_artifacts(next_set).unwrap()))
            .await;

        assert_eq!(held.manifest().version, 1);
        assert_eq!(handle.require().await.unwrap().manifest().version, 2);
    }
}
