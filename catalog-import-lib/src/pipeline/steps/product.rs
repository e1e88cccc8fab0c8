use std::sync::Arc;

use super::persist_if_changed;
use crate::change::ChangeDetector;
use crate::config::columns;
use crate::context::RowContext;
use crate::error::ImportError;
use crate::pipeline::{ProcessingStep, StepOutcome};
use crate::projector::AttributeProjector;
use crate::registry::ImportRegistry;
use crate::store::{Collaborators, PersistenceGateway, SnapshotRepository};
use crate::types::{AttributeValue, ColumnTypeTable, EntityId, EntityType};

/// Creates or updates the product entity and its store view attributes.
pub struct ProductStep {
    registry: Arc<ImportRegistry>,
    snapshots: Arc<dyn SnapshotRepository>,
    gateway: Arc<dyn PersistenceGateway>,
}

impl ProductStep {
    pub fn new(registry: Arc<ImportRegistry>, collaborators: &Collaborators) -> Self {
        Self {
            registry,
            snapshots: Arc::clone(&collaborators.snapshots),
            gateway: Arc::clone(&collaborators.gateway),
        }
    }

    fn persist(
        &self,
        ctx: &mut RowContext<'_>,
        entity_type: EntityType,
        table: &ColumnTypeTable,
        keys: &[(&str, AttributeValue)],
    ) -> Result<Option<EntityId>, ImportError> {
        let clean_up = self.registry.clean_up_columns();
        let mut candidate = AttributeProjector::project_with_clean_up(&*ctx, table, clean_up)?;
        if candidate.is_empty() {
            return Ok(None);
        }
        let significant = ChangeDetector::significant_columns_with_clean_up(&*ctx, table, clean_up);
        for (field, value) in keys {
            candidate.insert(*field, value.clone());
        }
        persist_if_changed(
            ctx,
            self.snapshots.as_ref(),
            self.gateway.as_ref(),
            entity_type,
            &candidate,
            &significant,
        )
        .map(Some)
    }

    /// Store-scoped values go to the product itself on the default scope and
    /// to a per store view entity otherwise.
    fn persist_scoped(
        &self,
        ctx: &mut RowContext<'_>,
        sku: &str,
        entity_id: EntityId,
    ) -> Result<Option<EntityId>, ImportError> {
        let table = self.registry.store_scoped_columns();
        match ctx.store_view_code() {
            Some(store_view) => self.persist(
                ctx,
                EntityType::ProductStoreAttribute,
                table,
                &[
                    ("entity_id", entity_id.into()),
                    (columns::STORE_VIEW_CODE, store_view.into()),
                ],
            ),
            None => self.persist(ctx, EntityType::Product, table, &[(columns::SKU, sku.into())]),
        }
    }
}

impl ProcessingStep for ProductStep {
    fn name(&self) -> &'static str {
        "product"
    }

    fn execute(&self, ctx: &mut RowContext<'_>) -> Result<StepOutcome, ImportError> {
        let sku = ctx.sku()?;

        // a later row of a SKU created in this batch only adds store view data
        if let Some(entity_id) = ctx.batch().entity_id(&sku) {
            ctx.mark_addendum();
            ctx.set_last_entity_id(entity_id);
            tracing::debug!(
                "Row {} is an addendum to sku {} (entity {})",
                ctx.line(),
                sku,
                entity_id
            );
            if self.persist_scoped(ctx, &sku, entity_id)?.is_some()
                || self.registry.has_media(&*ctx)
            {
                return Ok(StepOutcome::Continue);
            }
            tracing::debug!("Row {} carries nothing for sku {}", ctx.line(), sku);
            return Ok(StepOutcome::SkipRemaining);
        }

        let store_view = ctx.store_view_code();
        let table = match store_view {
            Some(_) => self.registry.global_columns(),
            None => self.registry.product_columns(),
        };
        // the trimmed SKU is the key the batch and the URL keys use
        let entity_id = self
            .persist(ctx, EntityType::Product, table, &[(columns::SKU, sku.as_str().into())])?
            .ok_or_else(|| ImportError::MissingRequiredValue(format!("sku on line {}", ctx.line())))?;

        ctx.batch_mut().mark_processed(&sku, entity_id);
        ctx.set_last_entity_id(entity_id);

        if store_view.is_some() {
            self.persist_scoped(ctx, &sku, entity_id)?;
        }

        Ok(StepOutcome::Continue)
    }
}
