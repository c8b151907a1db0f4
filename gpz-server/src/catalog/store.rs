//! Shared, reloadable facility catalog.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::Facility;

use super::error::CatalogError;
use super::source::CatalogSource;

/// Immutable view of the catalog at one point in time.
pub type CatalogSnapshot = Arc<[Facility]>;

/// Thread-safe facility catalog.
///
/// Readers take a [`CatalogSnapshot`] and never hold the lock while they
/// work. Reloads build a complete new collection first and then swap the
/// reference, so a reader sees either the old catalog or the new one.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<RwLock<CatalogSnapshot>>,
    source: Arc<dyn CatalogSource>,
}

impl Catalog {
    /// Create a catalog by loading from `source`.
    pub async fn load(source: Arc<dyn CatalogSource>) -> Result<Self, CatalogError> {
        let facilities = blocking(&source, |source| source.load()).await?;
        if facilities.is_empty() {
            warn!("catalog source returned no facilities");
        }

        Ok(Self {
            inner: Arc::new(RwLock::new(facilities.into())),
            source,
        })
    }

    /// The current catalog contents.
    pub async fn snapshot(&self) -> CatalogSnapshot {
        let guard = self.inner.read().await;
        Arc::clone(&*guard)
    }

    /// Number of facilities in the current snapshot.
    pub async fn len(&self) -> usize {
        self.snapshot().await.len()
    }

    /// Check if the current snapshot is empty.
    pub async fn is_empty(&self) -> bool {
        self.snapshot().await.is_empty()
    }

    /// Reload from the source.
    ///
    /// On success, replaces the current snapshot. On failure, the existing
    /// snapshot is preserved and the error is returned.
    pub async fn reload(&self) -> Result<usize, CatalogError> {
        let facilities: CatalogSnapshot = blocking(&self.source, |source| source.load())
            .await?
            .into();
        let count = facilities.len();

        let mut guard = self.inner.write().await;
        *guard = facilities;

        info!(facilities = count, "catalog reloaded");
        Ok(count)
    }

    /// Persist a new facility and publish a catalog that includes it.
    ///
    /// Fails if the reloaded catalog did not grow, i.e. the saved record
    /// could not be read back.
    pub async fn add(&self, facility: &Facility) -> Result<usize, CatalogError> {
        let before = self.len().await;

        let record = facility.clone();
        blocking(&self.source, move |source| source.append(&record)).await?;

        let count = self.reload().await?;
        if count <= before {
            return Err(CatalogError::DataFormat {
                message: format!(
                    "facility '{}' was saved but not found on reload",
                    facility.name
                ),
            });
        }
        Ok(count)
    }
}

/// Run a source operation on the blocking thread pool.
async fn blocking<T, F>(source: &Arc<dyn CatalogSource>, op: F) -> Result<T, CatalogError>
where
    T: Send + 'static,
    F: FnOnce(&dyn CatalogSource) -> Result<T, CatalogError> + Send + 'static,
{
    let source = Arc::clone(source);
    tokio::task::spawn_blocking(move || op(source.as_ref())).await?
}
