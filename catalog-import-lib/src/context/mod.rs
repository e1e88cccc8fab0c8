use std::collections::HashMap;

use crate::config::columns;
use crate::error::ImportError;
use crate::store::CategoryRepository;
use crate::types::{Category, EntityId, Row, ValueSource};

/// An entity created earlier in the running batch
#[derive(Debug, Clone, PartialEq)]
struct ProcessedEntity {
    entity_id: EntityId,
    steps: Vec<&'static str>,
}

/// Primary keys processed by one chain execution, with the steps that
/// completed for each of them.
#[derive(Debug, Default)]
pub struct BatchState {
    processed: HashMap<String, ProcessedEntity>,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_id(&self, sku: &str) -> Option<EntityId> {
        self.processed.get(sku).map(|entity| entity.entity_id)
    }

    /// Whether `step` already completed for an earlier row of `sku`
    pub fn has_completed(&self, sku: &str, step: &str) -> bool {
        self.processed
            .get(sku)
            .is_some_and(|entity| entity.steps.contains(&step))
    }

    pub fn mark_processed(&mut self, sku: &str, entity_id: EntityId) {
        self.processed
            .entry(sku.to_string())
            .or_insert_with(|| ProcessedEntity {
                entity_id,
                steps: Vec::new(),
            });
    }

    fn record_steps(&mut self, sku: &str, steps: &[&'static str]) {
        if let Some(entity) = self.processed.get_mut(sku) {
            for step in steps {
                if !entity.steps.contains(step) {
                    entity.steps.push(*step);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

/// Counters of one finished row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounters {
    pub writes: usize,
    pub unchanged: usize,
}

/// Shared state of one row while it runs through a chain.
///
/// Steps read values through [`ValueSource`], which prefers the working
/// overlay over the raw row, so a value rewritten by an earlier step (the
/// mapped visibility code, the resolved URL key) is what later steps see.
pub struct RowContext<'a> {
    row: &'a Row,
    overlay: HashMap<String, String>,
    last_entity_id: Option<EntityId>,
    categories: HashMap<String, Category>,
    completed_steps: Vec<&'static str>,
    addendum: bool,
    counters: RowCounters,
    warnings: Vec<String>,
    batch: &'a mut BatchState,
}

impl<'a> RowContext<'a> {
    pub fn new(row: &'a Row, batch: &'a mut BatchState) -> Self {
        Self {
            row,
            overlay: HashMap::new(),
            last_entity_id: None,
            categories: HashMap::new(),
            completed_steps: Vec::new(),
            addendum: false,
            counters: RowCounters::default(),
            warnings: Vec::new(),
            batch,
        }
    }

    pub fn row(&self) -> &Row {
        self.row
    }

    pub fn line(&self) -> usize {
        self.row.line()
    }

    /// SKU of the row, required for every entity the product chain writes
    pub fn sku(&self) -> Result<String, ImportError> {
        self.value(columns::SKU)
            .map(str::trim)
            .filter(|sku| !sku.is_empty())
            .map(String::from)
            .ok_or_else(|| {
                ImportError::MissingRequiredValue(format!("sku on line {}", self.line()))
            })
    }

    /// Store view the row addresses, `None` for the default scope
    pub fn store_view_code(&self) -> Option<String> {
        self.value(columns::STORE_VIEW_CODE)
            .map(str::trim)
            .filter(|code| !code.is_empty() && *code != columns::ADMIN_STORE_VIEW)
            .map(String::from)
    }

    pub fn is_default_scope(&self) -> bool {
        self.store_view_code().is_none()
    }

    /// Overwrite a working value for the following steps
    pub fn set_value(&mut self, column: &str, value: impl Into<String>) {
        self.overlay.insert(column.to_string(), value.into());
    }

    pub fn last_entity_id(&self) -> Option<EntityId> {
        self.last_entity_id
    }

    pub fn set_last_entity_id(&mut self, entity_id: EntityId) {
        self.last_entity_id = Some(entity_id);
    }

    pub fn is_addendum(&self) -> bool {
        self.addendum
    }

    pub fn mark_addendum(&mut self) {
        self.addendum = true;
    }

    /// Look up a category by its breadcrumb path, once per row
    pub fn category_by_path(
        &mut self,
        path: &str,
        repository: &dyn CategoryRepository,
    ) -> Result<Category, ImportError> {
        if let Some(category) = self.categories.get(path) {
            return Ok(category.clone());
        }
        let category = repository
            .find_by_path(path)?
            .ok_or_else(|| ImportError::UnknownCategory(path.to_string()))?;
        self.categories.insert(path.to_string(), category.clone());
        Ok(category)
    }

    pub fn batch(&self) -> &BatchState {
        &*self.batch
    }

    pub fn batch_mut(&mut self) -> &mut BatchState {
        &mut *self.batch
    }

    pub fn complete_step(&mut self, step: &'static str) {
        self.completed_steps.push(step);
    }

    pub fn record_write(&mut self) {
        self.counters.writes += 1;
    }

    pub fn record_unchanged(&mut self) {
        self.counters.unchanged += 1;
    }

    pub fn counters(&self) -> RowCounters {
        self.counters
    }

    /// Note something worth reporting that does not reject the row
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Row {}: {}", self.line(), message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Hand the completed steps over to the batch and return the counters
    /// and warnings of the row
    pub fn finish(mut self) -> (RowCounters, Vec<String>) {
        if let Ok(sku) = self.sku() {
            self.batch.record_steps(&sku, &self.completed_steps);
        }
        (self.counters, self.warnings)
    }
}

impl ValueSource for RowContext<'_> {
    fn value(&self, column: &str) -> Option<&str> {
        self.overlay
            .get(column)
            .map(String::as_str)
            .or_else(|| self.row.value(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Category repository counting its lookups
    struct CountingCategories {
        lookups: AtomicUsize,
    }

    impl CategoryRepository for CountingCategories {
        fn find_by_path(&self, path: &str) -> Result<Option<Category>, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok((path == "Default Category/Men").then(|| Category {
                id: 4,
                path: path.to_string(),
                url_path: "men".to_string(),
            }))
        }
    }

    #[test]
    fn test_overlay_wins_over_row() {
        let row = Row::from_pairs(2, [("sku", "a"), ("visibility", "Catalog")]);
        let mut batch = BatchState::new();
        let mut ctx = RowContext::new(&row, &mut batch);

        assert_eq!(ctx.value("visibility"), Some("Catalog"));
        ctx.set_value("visibility", "2");
        assert_eq!(ctx.value("visibility"), Some("2"));
        assert_eq!(row.value("visibility"), Some("Catalog"));
    }

    #[test]
    fn test_scope_detection() {
        let mut batch = BatchState::new();
        for (code, default) in [("", true), ("admin", true), ("de", false)] {
            let row = Row::from_pairs(2, [("sku", "a"), ("store_view_code", code)]);
            let ctx = RowContext::new(&row, &mut batch);
            assert_eq!(ctx.is_default_scope(), default);
        }
    }

    #[test]
    fn test_missing_sku() {
        let row = Row::from_pairs(7, [("sku", " "), ("name", "A")]);
        let mut batch = BatchState::new();
        let ctx = RowContext::new(&row, &mut batch);
        assert!(matches!(
            ctx.sku(),
            Err(ImportError::MissingRequiredValue(_))
        ));
    }

    #[test]
    fn test_category_lookup_is_cached() {
        let categories = CountingCategories {
            lookups: AtomicUsize::new(0),
        };
        let row = Row::from_pairs(2, [("sku", "a")]);
        let mut batch = BatchState::new();
        let mut ctx = RowContext::new(&row, &mut batch);

        let first = ctx.category_by_path("Default Category/Men", &categories).unwrap();
        let second = ctx.category_by_path("Default Category/Men", &categories).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.id, 4);
        assert_eq!(categories.lookups.load(Ordering::SeqCst), 1);

        assert!(matches!(
            ctx.category_by_path("Default Category/Women", &categories),
            Err(ImportError::UnknownCategory(_))
        ));
        assert_eq!(categories.lookups.load(Ordering::SeqCst), 2);

        // the cache lives as long as the row
        let mut next = RowContext::new(&row, &mut batch);
        next.category_by_path("Default Category/Men", &categories).unwrap();
        assert_eq!(categories.lookups.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_finish_records_steps_for_processed_sku() {
        let row = Row::from_pairs(2, [("sku", " a ")]);
        let mut batch = BatchState::new();
        {
            let mut ctx = RowContext::new(&row, &mut batch);
            ctx.complete_step("visibility");
            ctx.batch_mut().mark_processed("a", 11);
            ctx.complete_step("product");
            ctx.record_write();
            ctx.warn("no URL key");
            let (counters, warnings) = ctx.finish();
            assert_eq!(counters.writes, 1);
            assert_eq!(warnings, vec!["no URL key".to_string()]);
        }
        assert_eq!(batch.entity_id("a"), Some(11));
        assert!(batch.has_completed("a", "product"));
        assert!(batch.has_completed("a", "visibility"));
        assert!(!batch.has_completed("a", "inventory"));
        assert!(!batch.has_completed("b", "product"));
    }

    #[test]
    fn test_steps_of_unprocessed_sku_are_not_recorded() {
        let row = Row::from_pairs(2, [("sku", "a")]);
        let mut batch = BatchState::new();
        let mut ctx = RowContext::new(&row, &mut batch);
        ctx.complete_step("visibility");
        ctx.finish();
        assert!(batch.is_empty());
    }
}
