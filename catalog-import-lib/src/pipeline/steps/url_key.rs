use std::sync::Arc;

use crate::config::columns;
use crate::context::RowContext;
use crate::error::ImportError;
use crate::pipeline::{ProcessingStep, StepOutcome};
use crate::registry::ImportRegistry;
use crate::slug::{to_url_key, UniqueSlugResolver};
use crate::source::explode;
use crate::store::{CategoryRepository, Collaborators, SnapshotRepository};
use crate::types::{AttributeMapping, EntityType, ScopePath, ValueSource};

/// Derives the URL key of a product and makes it unique under every
/// category the product is assigned to.
pub struct UrlKeyStep {
    registry: Arc<ImportRegistry>,
    snapshots: Arc<dyn SnapshotRepository>,
    categories: Arc<dyn CategoryRepository>,
    resolver: UniqueSlugResolver,
}

impl UrlKeyStep {
    pub fn new(registry: Arc<ImportRegistry>, collaborators: &Collaborators) -> Self {
        let resolver = UniqueSlugResolver::from_config(
            Arc::clone(&collaborators.slugs),
            &registry.config().slug,
        );
        Self {
            registry,
            snapshots: Arc::clone(&collaborators.snapshots),
            categories: Arc::clone(&collaborators.categories),
            resolver,
        }
    }

    /// URL key of the already persisted product, if there is one
    fn persisted_url_key(&self, sku: &str) -> Result<Option<String>, ImportError> {
        let key = EntityType::Product.natural_key(&AttributeMapping::new().with(columns::SKU, sku))?;
        Ok(self
            .snapshots
            .find_by_natural_key(EntityType::Product, &key)?
            .and_then(|snapshot| snapshot.attributes.get_str(columns::URL_KEY).map(String::from)))
    }

    fn candidate(&self, ctx: &RowContext<'_>, sku: &str) -> Result<Option<String>, ImportError> {
        // an explicit url_key always wins
        if let Some(url_key) = ctx.value(columns::URL_KEY).filter(|v| !v.trim().is_empty()) {
            return Ok(Some(to_url_key(url_key)));
        }

        if !self.registry.config().update_url_key_from_name {
            if let Some(persisted) = self.persisted_url_key(sku)? {
                return Ok(Some(persisted));
            }
        }

        Ok(ctx
            .value(columns::NAME)
            .map(to_url_key)
            .filter(|slug| !slug.is_empty()))
    }

    fn scope_paths(&self, ctx: &mut RowContext<'_>) -> Result<Vec<ScopePath>, ImportError> {
        let value = match ctx.value(columns::CATEGORIES) {
            Some(value) if !value.trim().is_empty() => value.to_string(),
            _ => return Ok(Vec::new()),
        };

        let mut scopes: Vec<ScopePath> = Vec::new();
        let mut skipped = 0;
        for path in explode(&value, self.registry.config().category_delimiter)? {
            let path = path.trim();
            if path.is_empty() {
                skipped += 1;
                continue;
            }
            let scope = ctx
                .category_by_path(path, self.categories.as_ref())?
                .scope_path();
            if !scopes.contains(&scope) {
                scopes.push(scope);
            }
        }
        if skipped > 0 {
            ctx.warn(format!("{} empty category paths in {:?} ignored", skipped, value));
        }
        Ok(scopes)
    }
}

impl ProcessingStep for UrlKeyStep {
    fn name(&self) -> &'static str {
        "url_key"
    }

    fn execute(&self, ctx: &mut RowContext<'_>) -> Result<StepOutcome, ImportError> {
        let sku = ctx.sku()?;

        let candidate = match self.candidate(ctx, &sku)? {
            Some(candidate) => candidate,
            None if ctx.is_default_scope() => {
                return Err(ImportError::MissingRequiredValue(format!(
                    "url_key or name for sku {}",
                    sku
                )));
            }
            None => {
                ctx.warn(format!(
                    "no url_key or name for sku {}, the default store view URL key applies",
                    sku
                ));
                return Ok(StepOutcome::Continue);
            }
        };

        let scopes = self.scope_paths(ctx)?;
        let url_key = self.resolver.resolve(&candidate, &scopes, &sku)?;
        if url_key != candidate {
            tracing::info!(
                "URL key '{}' of sku {} is taken, using '{}'",
                candidate,
                sku,
                url_key
            );
        }

        ctx.set_value(columns::URL_KEY, url_key);
        Ok(StepOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportConfig;
    use crate::context::BatchState;
    use crate::pipeline::steps::fixtures;
    use crate::store::PersistenceGateway;
    use crate::types::Row;

    fn url_key_of(step: &UrlKeyStep, row: &Row) -> Result<Option<String>, ImportError> {
        let mut batch = BatchState::new();
        let mut ctx = RowContext::new(row, &mut batch);
        step.execute(&mut ctx)?;
        Ok(ctx.value("url_key").map(String::from))
    }

    #[test]
    fn test_url_key_from_name() {
        let store = fixtures::store();
        let step = UrlKeyStep::new(fixtures::registry(), &fixtures::collaborators(&store));
        let row = Row::from_pairs(2, [("sku", "a"), ("name", "Red Shirt")]);
        assert_eq!(url_key_of(&step, &row).unwrap().as_deref(), Some("red-shirt"));
    }

    #[test]
    fn test_explicit_url_key_is_made_unique_per_category() {
        let store = fixtures::store();
        let shirts = ScopePath::from_url_path("men/shirts");
        store.seed_slug("red-shirt", Some(&shirts), "other").unwrap();
        let step = UrlKeyStep::new(fixtures::registry(), &fixtures::collaborators(&store));

        let row = Row::from_pairs(
            2,
            [
                ("sku", "a"),
                ("url_key", "red-shirt"),
                ("categories", "Default Category/Men,Default Category/Men/Shirts"),
            ],
        );
        assert_eq!(
            url_key_of(&step, &row).unwrap().as_deref(),
            Some("red-shirt-1")
        );

        let mut held: Vec<String> = store
            .slugs_of("a")
            .into_iter()
            .map(|(slug, scope)| format!("{}@{}", slug, scope.map(|s| s.to_string()).unwrap_or_default()))
            .collect();
        held.sort();
        assert_eq!(held, vec!["red-shirt-1@men", "red-shirt-1@men/shirts"]);
    }

    #[test]
    fn test_quoted_category_paths() {
        let store = fixtures::store();
        store
            .add_category(crate::types::Category {
                id: 9,
                path: "Default Category/Sale, Outlet".to_string(),
                url_path: "sale-outlet".to_string(),
            })
            .unwrap();
        let step = UrlKeyStep::new(fixtures::registry(), &fixtures::collaborators(&store));
        let row = Row::from_pairs(
            2,
            [
                ("sku", "a"),
                ("name", "Red Shirt"),
                ("categories", "\"Default Category/Sale, Outlet\",Default Category/Men"),
            ],
        );
        assert_eq!(url_key_of(&step, &row).unwrap().as_deref(), Some("red-shirt"));
        assert_eq!(store.slugs_of("a").len(), 2);
    }

    #[test]
    fn test_unknown_category_rejects_row() {
        let store = fixtures::store();
        let step = UrlKeyStep::new(fixtures::registry(), &fixtures::collaborators(&store));
        let row = Row::from_pairs(
            2,
            [("sku", "a"), ("name", "Red Shirt"), ("categories", "Default Category/Kids")],
        );
        assert!(matches!(
            url_key_of(&step, &row),
            Err(ImportError::UnknownCategory(path)) if path == "Default Category/Kids"
        ));
    }

    #[test]
    fn test_missing_candidate() {
        let store = fixtures::store();
        let step = UrlKeyStep::new(fixtures::registry(), &fixtures::collaborators(&store));

        let row = Row::from_pairs(2, [("sku", "a"), ("name", "")]);
        assert!(matches!(
            url_key_of(&step, &row),
            Err(ImportError::MissingRequiredValue(_))
        ));

        let row = Row::from_pairs(3, [("sku", "a"), ("name", ""), ("store_view_code", "de")]);
        let mut batch = BatchState::new();
        let mut ctx = RowContext::new(&row, &mut batch);
        assert_eq!(step.execute(&mut ctx).unwrap(), StepOutcome::Continue);
        assert_eq!(ctx.value("url_key"), None);
        assert_eq!(ctx.warnings().len(), 1);
    }

    #[test]
    fn test_empty_category_paths_are_reported() {
        let store = fixtures::store();
        let step = UrlKeyStep::new(fixtures::registry(), &fixtures::collaborators(&store));
        let row = Row::from_pairs(
            2,
            [("sku", "a"), ("name", "Red Shirt"), ("categories", "Default Category/Men,,")],
        );
        let mut batch = BatchState::new();
        let mut ctx = RowContext::new(&row, &mut batch);
        step.execute(&mut ctx).unwrap();

        assert_eq!(ctx.value("url_key"), Some("red-shirt"));
        assert_eq!(ctx.warnings().len(), 1);
        assert!(ctx.warnings()[0].starts_with("2 empty category paths"));
    }

    #[test]
    fn test_keeps_persisted_url_key_when_configured() {
        let store = fixtures::store();
        store
            .upsert(
                EntityType::Product,
                &AttributeMapping::new()
                    .with("sku", "a")
                    .with("url_key", "classic-red-shirt"),
            )
            .unwrap();
        let config = ImportConfig {
            update_url_key_from_name: false,
            ..ImportConfig::default()
        };
        let registry = Arc::new(ImportRegistry::new(config).unwrap());
        let step = UrlKeyStep::new(registry, &fixtures::collaborators(&store));

        let row = Row::from_pairs(2, [("sku", "a"), ("name", "Red Shirt")]);
        assert_eq!(
            url_key_of(&step, &row).unwrap().as_deref(),
            Some("classic-red-shirt")
        );

        // new products still fall back to the name
        let row = Row::from_pairs(3, [("sku", "b"), ("name", "Blue Shirt")]);
        assert_eq!(url_key_of(&step, &row).unwrap().as_deref(), Some("blue-shirt"));
    }
}
