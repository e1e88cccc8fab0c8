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
use crate::types::{AttributeMapping, AttributeValue, EntityType, ScalarType, ValueSource};

const DEFAULT_STOCK_ID: i64 = 1;

/// Writes the stock item of the product created by the product step.
pub struct InventoryStep {
    registry: Arc<ImportRegistry>,
    snapshots: Arc<dyn SnapshotRepository>,
    gateway: Arc<dyn PersistenceGateway>,
}

impl InventoryStep {
    pub fn new(registry: Arc<ImportRegistry>, collaborators: &Collaborators) -> Self {
        Self {
            registry,
            snapshots: Arc::clone(&collaborators.snapshots),
            gateway: Arc::clone(&collaborators.gateway),
        }
    }

    fn website_id(ctx: &RowContext<'_>) -> Result<AttributeValue, ImportError> {
        match ctx.value(columns::WEBSITE_ID) {
            Some(raw) if !raw.trim().is_empty() => {
                AttributeProjector::cast(columns::WEBSITE_ID, raw, ScalarType::Int)
            }
            _ => Ok(AttributeValue::Int(0)),
        }
    }
}

impl ProcessingStep for InventoryStep {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn execute(&self, ctx: &mut RowContext<'_>) -> Result<StepOutcome, ImportError> {
        // stock is written once per SKU, by the first of its rows that gets here
        let sku = ctx.sku()?;
        if ctx.is_addendum() && ctx.batch().has_completed(&sku, self.name()) {
            tracing::debug!("Stock of sku {} already written in this batch", sku);
            return Ok(StepOutcome::Continue);
        }

        let product_id = ctx.last_entity_id().ok_or_else(|| {
            ImportError::MissingRequiredValue(format!(
                "product id for the stock item on line {}",
                ctx.line()
            ))
        })?;

        let table = self.registry.stock_columns();
        let clean_up = self.registry.clean_up_columns();
        let mut candidate = AttributeMapping::new()
            .with("product_id", product_id)
            .with(columns::WEBSITE_ID, Self::website_id(ctx)?)
            .with("stock_id", DEFAULT_STOCK_ID);
        candidate.merge(AttributeProjector::project_with_clean_up(&*ctx, table, clean_up)?);
        let significant = ChangeDetector::significant_columns_with_clean_up(&*ctx, table, clean_up);

        persist_if_changed(
            ctx,
            self.snapshots.as_ref(),
            self.gateway.as_ref(),
            EntityType::StockItem,
            &candidate,
            &significant,
        )?;
        Ok(StepOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BatchState;
    use crate::pipeline::steps::fixtures;
    use crate::types::Row;

    fn run(step: &InventoryStep, row: &Row, product_id: Option<i64>) -> Result<(), ImportError> {
        let mut batch = BatchState::new();
        let mut ctx = RowContext::new(row, &mut batch);
        if let Some(id) = product_id {
            ctx.set_last_entity_id(id);
        }
        step.execute(&mut ctx).map(|_| ())
    }

    #[test]
    fn test_stock_item_is_keyed_and_mapped() {
        let store = fixtures::store();
        let step = InventoryStep::new(fixtures::registry(), &fixtures::collaborators(&store));
        let row = Row::from_pairs(
            2,
            [("sku", "a"), ("qty", "12.5"), ("allow_backorders", "1"), ("is_in_stock", "1")],
        );
        run(&step, &row, Some(7)).unwrap();

        let items = store.entities(EntityType::StockItem);
        assert_eq!(items.len(), 1);
        let attributes = &items[0].attributes;
        assert_eq!(attributes.get("product_id"), Some(&AttributeValue::Int(7)));
        assert_eq!(attributes.get("website_id"), Some(&AttributeValue::Int(0)));
        assert_eq!(attributes.get("stock_id"), Some(&AttributeValue::Int(1)));
        assert_eq!(attributes.get("qty"), Some(&AttributeValue::Float(12.5)));
        assert_eq!(attributes.get("backorders"), Some(&AttributeValue::Int(1)));
        assert!(!attributes.contains_key("allow_backorders"));
    }

    #[test]
    fn test_unchanged_stock_is_not_written() {
        let store = fixtures::store();
        let step = InventoryStep::new(fixtures::registry(), &fixtures::collaborators(&store));
        let first = Row::from_pairs(2, [("sku", "a"), ("qty", "5"), ("is_in_stock", "1")]);
        run(&step, &first, Some(7)).unwrap();
        assert_eq!(store.write_count(), 1);

        // only qty is supplied, so is_in_stock does not count
        let second = Row::from_pairs(2, [("sku", "a"), ("qty", "5.0")]);
        run(&step, &second, Some(7)).unwrap();
        assert_eq!(store.write_count(), 1);

        let third = Row::from_pairs(2, [("sku", "a"), ("qty", "7")]);
        run(&step, &third, Some(7)).unwrap();
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.entities(EntityType::StockItem).len(), 1);
    }

    #[test]
    fn test_website_is_part_of_the_key() {
        let store = fixtures::store();
        let step = InventoryStep::new(fixtures::registry(), &fixtures::collaborators(&store));
        run(&step, &Row::from_pairs(2, [("sku", "a"), ("qty", "5")]), Some(7)).unwrap();
        run(
            &step,
            &Row::from_pairs(3, [("sku", "a"), ("qty", "5"), ("website_id", "2")]),
            Some(7),
        )
        .unwrap();
        assert_eq!(store.entities(EntityType::StockItem).len(), 2);
    }

    #[test]
    fn test_stock_is_written_once_per_sku_and_batch() {
        let store = fixtures::store();
        let step = InventoryStep::new(fixtures::registry(), &fixtures::collaborators(&store));
        let mut batch = BatchState::new();
        batch.mark_processed("a", 7);

        let first = Row::from_pairs(2, [("sku", "a"), ("qty", "5")]);
        {
            let mut ctx = RowContext::new(&first, &mut batch);
            ctx.set_last_entity_id(7);
            step.execute(&mut ctx).unwrap();
            ctx.complete_step(step.name());
            ctx.finish();
        }
        assert!(batch.has_completed("a", "inventory"));

        let addendum = Row::from_pairs(3, [("sku", "a"), ("store_view_code", "de"), ("qty", "9")]);
        let mut ctx = RowContext::new(&addendum, &mut batch);
        ctx.set_last_entity_id(7);
        ctx.mark_addendum();
        step.execute(&mut ctx).unwrap();
        assert_eq!(ctx.counters().writes, 0);
        assert_eq!(store.write_count(), 1);
        assert_eq!(
            store.entities(EntityType::StockItem)[0].attributes.get("qty"),
            Some(&AttributeValue::Float(5.0))
        );
    }

    #[test]
    fn test_addendum_writes_stock_the_first_row_did_not() {
        let store = fixtures::store();
        let step = InventoryStep::new(fixtures::registry(), &fixtures::collaborators(&store));
        let mut batch = BatchState::new();
        // the first row of the SKU was rejected after the product step
        batch.mark_processed("a", 7);

        let addendum = Row::from_pairs(3, [("sku", "a"), ("qty", "9")]);
        let mut ctx = RowContext::new(&addendum, &mut batch);
        ctx.set_last_entity_id(7);
        ctx.mark_addendum();
        step.execute(&mut ctx).unwrap();
        assert_eq!(store.entities(EntityType::StockItem).len(), 1);
    }

    #[test]
    fn test_clean_up_column_clears_stock_value() {
        let store = fixtures::store();
        let config = crate::config::ImportConfig {
            clean_up_empty_columns: vec!["out_of_stock_qty".to_string()],
            ..crate::config::ImportConfig::default()
        };
        let registry = Arc::new(ImportRegistry::new(config).unwrap());
        let step = InventoryStep::new(registry, &fixtures::collaborators(&store));

        run(&step, &Row::from_pairs(2, [("sku", "a"), ("out_of_stock_qty", "2")]), Some(7)).unwrap();
        run(&step, &Row::from_pairs(2, [("sku", "a"), ("out_of_stock_qty", "")]), Some(7)).unwrap();
        assert_eq!(store.write_count(), 2);
        assert!(!store.entities(EntityType::StockItem)[0]
            .attributes
            .contains_key("min_qty"));
    }

    #[test]
    fn test_missing_product_id() {
        let store = fixtures::store();
        let step = InventoryStep::new(fixtures::registry(), &fixtures::collaborators(&store));
        let row = Row::from_pairs(2, [("sku", "a"), ("qty", "5")]);
        assert!(matches!(
            run(&step, &row, None),
            Err(ImportError::MissingRequiredValue(_))
        ));
    }
}
