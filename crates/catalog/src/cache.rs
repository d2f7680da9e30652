use std::sync::{Arc, PoisonError, RwLock};

use model::carpark::CatalogEntity;

use crate::{source::CatalogSource, CatalogResult};

#[derive(Default)]
struct Retained {
    generation: u64,
    entities: Option<Arc<[CatalogEntity]>>,
}

/// Lazily loaded, shared view of the carpark catalog.
///
/// The first read loads from the source and keeps the result until
/// [`LocationCatalog::invalidate`]. Loads run outside the lock, so two
/// readers missing at the same time may both load; the later one wins. A
/// load that started before an invalidation is handed to its caller but not
/// kept.
pub struct LocationCatalog {
    source: Arc<dyn CatalogSource>,
    retained: RwLock<Retained>,
}

impl LocationCatalog {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            retained: RwLock::new(Retained::default()),
        }
    }

    /// The catalog, or an empty slice if it cannot be loaded. Nothing is
    /// retained on failure, so the next call tries again.
    pub fn get(&self) -> Arc<[CatalogEntity]> {
        match self.try_get() {
            Ok(entities) => entities,
            Err(why) => {
                log::error!("Could not load carpark catalog: {}", why);
                Arc::from(Vec::new())
            }
        }
    }

    pub fn try_get(&self) -> CatalogResult<Arc<[CatalogEntity]>> {
        let generation = {
            let retained = self.retained.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entities) = &retained.entities {
                return Ok(entities.clone());
            }
            retained.generation
        };

        let entities: Arc<[CatalogEntity]> = self.source.load()?.into();

        let mut retained = self.retained.write().unwrap_or_else(PoisonError::into_inner);
        if retained.generation == generation {
            retained.entities = Some(entities.clone());
        } else {
            log::debug!("Catalog was invalidated while loading, not keeping the result.");
        }
        Ok(entities)
    }

    /// Drops the retained catalog; the next read reloads it.
    pub fn invalidate(&self) {
        let mut retained = self.retained.write().unwrap_or_else(PoisonError::into_inner);
        retained.generation += 1;
        retained.entities = None;
        log::info!("Carpark catalog invalidated.");
    }

    pub fn is_loaded(&self) -> bool {
        self.retained
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entities
            .is_some()
    }
}
