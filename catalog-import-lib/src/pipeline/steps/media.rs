use std::collections::BTreeSet;
use std::sync::Arc;

use super::persist_if_changed;
use crate::config::columns;
use crate::context::RowContext;
use crate::error::ImportError;
use crate::pipeline::{ProcessingStep, StepOutcome};
use crate::projector::AttributeProjector;
use crate::registry::ImportRegistry;
use crate::store::{Collaborators, PersistenceGateway, SnapshotRepository};
use crate::types::{AttributeMapping, EntityType, ScalarType, ValueSource};

/// Writes one media gallery entry per image role the row fills in.
pub struct MediaStep {
    registry: Arc<ImportRegistry>,
    snapshots: Arc<dyn SnapshotRepository>,
    gateway: Arc<dyn PersistenceGateway>,
}

impl MediaStep {
    pub fn new(registry: Arc<ImportRegistry>, collaborators: &Collaborators) -> Self {
        Self {
            registry,
            snapshots: Arc::clone(&collaborators.snapshots),
            gateway: Arc::clone(&collaborators.gateway),
        }
    }
}

fn non_empty<'v>(ctx: &'v RowContext<'_>, column: &str) -> Option<&'v str> {
    ctx.value(column).map(str::trim).filter(|v| !v.is_empty())
}

impl ProcessingStep for MediaStep {
    fn name(&self) -> &'static str {
        "media"
    }

    fn execute(&self, ctx: &mut RowContext<'_>) -> Result<StepOutcome, ImportError> {
        let store_view = ctx
            .store_view_code()
            .unwrap_or_else(|| columns::ADMIN_STORE_VIEW.to_string());

        for (role, media_role) in self.registry.media_roles() {
            let path = match non_empty(ctx, &media_role.path_column) {
                Some(path) => path.to_string(),
                None => continue,
            };
            let product_id = ctx.last_entity_id().ok_or_else(|| {
                ImportError::MissingRequiredValue(format!(
                    "product id for the {} image on line {}",
                    role,
                    ctx.line()
                ))
            })?;

            let mut candidate = AttributeMapping::new()
                .with("product_id", product_id)
                .with("role", role.as_str())
                .with(columns::STORE_VIEW_CODE, store_view.as_str())
                .with("path", path);
            if let Some(label) = non_empty(ctx, &media_role.label_column) {
                candidate.insert("label", label);
            }
            if let Some(position) = non_empty(ctx, &media_role.position_column) {
                candidate.insert(
                    "position",
                    AttributeProjector::cast(&media_role.position_column, position, ScalarType::Int)?,
                );
            }

            let significant: BTreeSet<String> = candidate.keys().cloned().collect();
            persist_if_changed(
                ctx,
                self.snapshots.as_ref(),
                self.gateway.as_ref(),
                EntityType::MediaGallery,
                &candidate,
                &significant,
            )?;
        }

        Ok(StepOutcome::Continue)
    }
}
