use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{
    CategoryRepository, PersistenceGateway, Reservation, SlugRecord, SlugStore, SnapshotRepository,
    StoreError,
};
use crate::error::ImportError;
use crate::types::{
    AttributeMapping, Category, EntityId, EntitySnapshot, EntityType, NaturalKey, ScopePath,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SlugEntry {
    slug: String,
    scope: Option<ScopePath>,
    owner: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreState {
    #[serde(default)]
    next_id: EntityId,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    entities: BTreeMap<String, Vec<EntitySnapshot>>,
    #[serde(default)]
    slugs: Vec<SlugEntry>,
}

impl StoreState {
    fn normalize_next_id(&mut self) {
        let max_id = self
            .entities
            .values()
            .flatten()
            .map(|entity| entity.id)
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
    }
}

/// Thread-safe in-memory catalog implementing every store contract.
#[derive(Debug)]
pub struct MemoryCatalogStore {
    state: Mutex<StoreState>,
    writes: AtomicUsize,
}

impl Default for MemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::from_state(StoreState::default())
    }

    fn from_state(mut state: StoreState) -> Self {
        state.normalize_next_id();
        Self {
            state: Mutex::new(state),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn with_categories(categories: Vec<Category>) -> Self {
        Self::from_state(StoreState {
            categories,
            ..StoreState::default()
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        let state: StoreState = serde_json::from_str(json)?;
        Ok(Self::from_state(state))
    }

    /// Load a store file; a missing file yields an empty store
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(
                "Store file {} does not exist, starting with an empty store",
                path.display()
            );
            return Ok(Self::new());
        }
        tracing::info!("Loading store from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn to_json(&self) -> Result<String, ImportError> {
        let state = self.state()?;
        Ok(serde_json::to_string_pretty(&*state)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ImportError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        tracing::info!("Saved store to {}", path.display());
        Ok(())
    }

    /// Number of upserts performed since the store was created
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn entities(&self, entity_type: EntityType) -> Vec<EntitySnapshot> {
        self.state
            .lock()
            .map(|state| {
                state
                    .entities
                    .get(entity_type.as_str())
                    .cloned()
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    pub fn add_category(&self, category: Category) -> Result<(), ImportError> {
        self.state()?.categories.push(category);
        Ok(())
    }

    /// Register a slug as already persisted for `owner`
    pub fn seed_slug(
        &self,
        slug: &str,
        scope: Option<&ScopePath>,
        owner: &str,
    ) -> Result<(), ImportError> {
        self.state()?.slugs.push(SlugEntry {
            slug: slug.to_string(),
            scope: scope.cloned(),
            owner: owner.to_string(),
        });
        Ok(())
    }

    /// Slugs held by `owner` with the scope they are held under
    pub fn slugs_of(&self, owner: &str) -> Vec<(String, Option<ScopePath>)> {
        self.state
            .lock()
            .map(|state| {
                state
                    .slugs
                    .iter()
                    .filter(|entry| entry.owner == owner)
                    .map(|entry| (entry.slug.clone(), entry.scope.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

impl SnapshotRepository for MemoryCatalogStore {
    fn find_by_natural_key(
        &self,
        entity_type: EntityType,
        key: &NaturalKey,
    ) -> Result<Option<EntitySnapshot>, StoreError> {
        let state = self.state()?;
        Ok(state
            .entities
            .get(entity_type.as_str())
            .and_then(|entities| {
                entities
                    .iter()
                    .find(|entity| key.matches(&entity.attributes))
            })
            .cloned())
    }
}

impl CategoryRepository for MemoryCatalogStore {
    fn find_by_path(&self, path: &str) -> Result<Option<Category>, StoreError> {
        let state = self.state()?;
        Ok(state.categories.iter().find(|c| c.path == path).cloned())
    }
}

impl SlugStore for MemoryCatalogStore {
    fn query_existing(&self, scope: Option<&ScopePath>) -> Result<Vec<SlugRecord>, StoreError> {
        let state = self.state()?;
        Ok(state
            .slugs
            .iter()
            .filter(|entry| entry.scope.as_ref() == scope)
            .map(|entry| SlugRecord {
                slug: entry.slug.clone(),
                owner: entry.owner.clone(),
            })
            .collect())
    }

    fn reserve(
        &self,
        slug: &str,
        scope: Option<&ScopePath>,
        owner: &str,
    ) -> Result<Reservation, StoreError> {
        let mut state = self.state()?;
        let holder = state
            .slugs
            .iter()
            .find(|entry| entry.slug == slug && entry.scope.as_ref() == scope)
            .map(|entry| entry.owner.clone());

        match holder {
            Some(holder) if holder == owner => Ok(Reservation::AlreadyOwned),
            Some(holder) => Ok(Reservation::Conflict { owner: holder }),
            None => {
                state.slugs.push(SlugEntry {
                    slug: slug.to_string(),
                    scope: scope.cloned(),
                    owner: owner.to_string(),
                });
                Ok(Reservation::Reserved)
            }
        }
    }

    fn release(
        &self,
        slug: &str,
        scope: Option<&ScopePath>,
        owner: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.slugs.retain(|entry| {
            !(entry.slug == slug && entry.scope.as_ref() == scope && entry.owner == owner)
        });
        Ok(())
    }
}

impl PersistenceGateway for MemoryCatalogStore {
    fn upsert(
        &self,
        entity_type: EntityType,
        attributes: &AttributeMapping,
    ) -> Result<EntityId, StoreError> {
        let key = entity_type
            .natural_key(attributes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut state = self.state()?;
        let next_id = state.next_id;
        let entities = state
            .entities
            .entry(entity_type.as_str().to_string())
            .or_default();

        let position = entities
            .iter()
            .position(|entity| key.matches(&entity.attributes));
        let id = match position {
            Some(index) => {
                entities[index].attributes.apply(attributes);
                entities[index].id
            }
            None => {
                let mut created = AttributeMapping::new();
                created.apply(attributes);
                entities.push(EntitySnapshot {
                    id: next_id,
                    attributes: created,
                });
                next_id
            }
        };
        if position.is_none() {
            state.next_id = next_id + 1;
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Persisted {} {} with id {}", entity_type, key, id);
        Ok(id)
    }
}
