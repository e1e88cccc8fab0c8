mod inventory;
mod media;
mod product;
mod url_key;
mod visibility;

pub use inventory::InventoryStep;
pub use media::MediaStep;
pub use product::ProductStep;
pub use url_key::UrlKeyStep;
pub use visibility::VisibilityStep;

use std::collections::BTreeSet;
use std::sync::Arc;

use super::ProcessingChain;
use crate::change::ChangeDetector;
use crate::context::RowContext;
use crate::error::ImportError;
use crate::registry::ImportRegistry;
use crate::store::{Collaborators, PersistenceGateway, SnapshotRepository};
use crate::types::{AttributeMapping, EntityId, EntityType};

/// Steps of the product import in execution order
pub fn product_chain(registry: Arc<ImportRegistry>, collaborators: &Collaborators) -> ProcessingChain {
    ProcessingChain::new()
        .with_step(VisibilityStep::new(Arc::clone(&registry)))
        .with_step(UrlKeyStep::new(Arc::clone(&registry), collaborators))
        .with_step(ProductStep::new(Arc::clone(&registry), collaborators))
        .with_step(InventoryStep::new(Arc::clone(&registry), collaborators))
        .with_step(MediaStep::new(registry, collaborators))
}

/// Write `candidate` unless the persisted entity with the same natural key
/// already holds the same significant values.
fn persist_if_changed(
    ctx: &mut RowContext<'_>,
    snapshots: &dyn SnapshotRepository,
    gateway: &dyn PersistenceGateway,
    entity_type: EntityType,
    candidate: &AttributeMapping,
    significant: &BTreeSet<String>,
) -> Result<EntityId, ImportError> {
    let key = entity_type.natural_key(candidate)?;
    let previous = snapshots.find_by_natural_key(entity_type, &key)?;
    let state = ChangeDetector::classify(candidate, previous.as_ref(), significant);

    match previous {
        Some(previous) if !state.requires_persistence() => {
            tracing::debug!("{} {} is unchanged", entity_type, key);
            ctx.record_unchanged();
            Ok(previous.id)
        }
        _ => {
            let id = gateway.upsert(entity_type, candidate)?;
            tracing::debug!("{} {} is {}, persisted as {}", entity_type, key, state, id);
            ctx.record_write();
            Ok(id)
        }
    }
}
