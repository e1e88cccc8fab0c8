use std::collections::BTreeSet;

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::media::{MediaRoleResolver, MediaRoles};
use crate::types::{ColumnTypeTable, ValueSource};

/// Read-only lookup tables shared by every step of an import, built once
/// from a validated configuration.
#[derive(Debug, Clone)]
pub struct ImportRegistry {
    config: ImportConfig,
    media_roles: MediaRoles,
    store_scoped_columns: ColumnTypeTable,
    global_columns: ColumnTypeTable,
    clean_up_columns: BTreeSet<String>,
}

impl ImportRegistry {
    pub fn new(config: ImportConfig) -> Result<Self, ImportError> {
        config.validate()?;

        let scoped: BTreeSet<&str> = config
            .store_scoped_columns
            .iter()
            .map(String::as_str)
            .collect();
        let store_scoped_columns = config
            .product_columns
            .filtered(|column| scoped.contains(column));
        let global_columns = config
            .product_columns
            .filtered(|column| !scoped.contains(column));
        let media_roles = MediaRoleResolver::derive_roles(&config.image_types);
        let clean_up_columns = config.clean_up_empty_columns.iter().cloned().collect();

        tracing::debug!(
            "Registry built with {} product columns ({} store-scoped), {} stock columns and {} media roles",
            config.product_columns.len(),
            store_scoped_columns.len(),
            config.stock_columns.len(),
            media_roles.len()
        );

        Ok(Self {
            config,
            media_roles,
            store_scoped_columns,
            global_columns,
            clean_up_columns,
        })
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn media_roles(&self) -> &MediaRoles {
        &self.media_roles
    }

    pub fn product_columns(&self) -> &ColumnTypeTable {
        &self.config.product_columns
    }

    /// Product columns that may vary per store view
    pub fn store_scoped_columns(&self) -> &ColumnTypeTable {
        &self.store_scoped_columns
    }

    /// Product columns that hold one value for all store views
    pub fn global_columns(&self) -> &ColumnTypeTable {
        &self.global_columns
    }

    pub fn stock_columns(&self) -> &ColumnTypeTable {
        &self.config.stock_columns
    }

    /// Source columns whose empty cells clear the persisted value
    pub fn clean_up_columns(&self) -> &BTreeSet<String> {
        &self.clean_up_columns
    }

    /// Whether the record fills the path column of any media role
    pub fn has_media<S: ValueSource + ?Sized>(&self, values: &S) -> bool {
        self.media_roles
            .values()
            .any(|role| values.value(&role.path_column).is_some_and(|path| !path.trim().is_empty()))
    }

    /// Map a visibility label, or one of the configured numeric codes, to
    /// its code.
    pub fn visibility_code(&self, value: &str) -> Option<i64> {
        let value = value.trim();
        if let Some(code) = self.config.visibilities.get(value) {
            return Some(*code);
        }
        value
            .parse::<i64>()
            .ok()
            .filter(|code| self.config.visibilities.values().any(|known| known == code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;

    #[test]
    fn test_column_split() {
        let registry = ImportRegistry::new(ImportConfig::default()).unwrap();
        assert!(registry.store_scoped_columns().contains_source("name"));
        assert!(!registry.store_scoped_columns().contains_source("price"));
        assert!(registry.global_columns().contains_source("sku"));
        assert!(!registry.global_columns().contains_source("url_key"));
        assert_eq!(
            registry.store_scoped_columns().len() + registry.global_columns().len(),
            registry.product_columns().len()
        );
        assert_eq!(registry.media_roles().len(), 4);
    }

    #[test]
    fn test_visibility_codes() {
        let registry = ImportRegistry::new(ImportConfig::default()).unwrap();
        assert_eq!(registry.visibility_code("Catalog, Search"), Some(4));
        assert_eq!(registry.visibility_code(" Search "), Some(3));
        assert_eq!(registry.visibility_code("2"), Some(2));
        assert_eq!(registry.visibility_code("7"), None);
        assert_eq!(registry.visibility_code("Hidden"), None);
    }

    #[test]
    fn test_media_detection() {
        let registry = ImportRegistry::new(ImportConfig::default()).unwrap();
        let row = Row::from_pairs(2, [("sku", "a"), ("base_image", " "), ("name", "A")]);
        assert!(!registry.has_media(&row));
        let row = Row::from_pairs(2, [("sku", "a"), ("swatch_image", "/s/w/red.png")]);
        assert!(registry.has_media(&row));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ImportConfig {
            workers: 0,
            ..ImportConfig::default()
        };
        assert!(matches!(
            ImportRegistry::new(config),
            Err(ImportError::InvalidConfig(_))
        ));
    }
}
