//! Contracts for the collaborators the import pipeline talks to.
//!
//! The pipeline only ever sees these traits; `MemoryCatalogStore` is the
//! bundled implementation used by the CLI and the tests.

mod memory;

pub use memory::MemoryCatalogStore;

use std::sync::Arc;
use thiserror::Error;

use crate::error::ImportError;
use crate::types::{
    AttributeMapping, Category, EntityId, EntitySnapshot, EntityType, NaturalKey, ScopePath,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The collaborator cannot be used at all
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A single operation was rejected
    #[error("store rejected operation: {0}")]
    Backend(String),
}

impl From<StoreError> for ImportError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(msg) => ImportError::StoreUnavailable(msg),
            StoreError::Backend(msg) => ImportError::Persistence(msg),
        }
    }
}

/// A persisted slug and the natural key of the entity holding it
#[derive(Debug, Clone, PartialEq)]
pub struct SlugRecord {
    pub slug: String,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    /// The slug was free and now belongs to the caller
    Reserved,
    /// The caller already held the slug
    AlreadyOwned,
    /// Somebody else holds the slug
    Conflict { owner: String },
}

pub trait SnapshotRepository: Send + Sync {
    fn find_by_natural_key(
        &self,
        entity_type: EntityType,
        key: &NaturalKey,
    ) -> Result<Option<EntitySnapshot>, StoreError>;
}

pub trait CategoryRepository: Send + Sync {
    fn find_by_path(&self, path: &str) -> Result<Option<Category>, StoreError>;
}

pub trait SlugStore: Send + Sync {
    fn query_existing(&self, scope: Option<&ScopePath>) -> Result<Vec<SlugRecord>, StoreError>;

    /// Atomic check-and-reserve
    fn reserve(
        &self,
        slug: &str,
        scope: Option<&ScopePath>,
        owner: &str,
    ) -> Result<Reservation, StoreError>;

    fn release(&self, slug: &str, scope: Option<&ScopePath>, owner: &str)
        -> Result<(), StoreError>;
}

pub trait PersistenceGateway: Send + Sync {
    fn upsert(
        &self,
        entity_type: EntityType,
        attributes: &AttributeMapping,
    ) -> Result<EntityId, StoreError>;
}

/// The set of collaborators an import runs against
#[derive(Clone)]
pub struct Collaborators {
    pub snapshots: Arc<dyn SnapshotRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub slugs: Arc<dyn SlugStore>,
    pub gateway: Arc<dyn PersistenceGateway>,
}

impl Collaborators {
    /// Use one store for every collaborator role
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: SnapshotRepository + CategoryRepository + SlugStore + PersistenceGateway + 'static,
    {
        Self {
            snapshots: store.clone(),
            categories: store.clone(),
            slugs: store.clone(),
            gateway: store,
        }
    }
}
