mod template;

pub use template::DEFAULT_CONFIG;

use json_comments::StripComments;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::error::ImportError;
use crate::types::{ColumnTypeTable, ScalarType};

/// Column names the pipeline reads directly
pub mod columns {
    pub const SKU: &str = "sku";
    pub const NAME: &str = "name";
    pub const URL_KEY: &str = "url_key";
    pub const VISIBILITY: &str = "visibility";
    pub const CATEGORIES: &str = "categories";
    pub const STORE_VIEW_CODE: &str = "store_view_code";
    pub const WEBSITE_ID: &str = "website_id";

    /// Store view code that addresses the default scope
    pub const ADMIN_STORE_VIEW: &str = "admin";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SlugConfig {
    /// Upper bound of uniqueness proposals per resolved slug
    pub max_iterations: usize,
    /// Retries of a reservation lost to a concurrent writer
    pub max_reservation_retries: usize,
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            max_reservation_retries: 5,
        }
    }
}

/// A (path column, label column) pair describing one image type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageType {
    pub path: String,
    pub label: String,
}

impl ImageType {
    pub fn new(path: &str, label: &str) -> Self {
        Self {
            path: path.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Derive the URL key of existing products from their name when the row
    /// does not carry one
    pub update_url_key_from_name: bool,
    pub category_delimiter: char,
    pub workers: usize,
    pub slug: SlugConfig,
    pub product_columns: ColumnTypeTable,
    pub stock_columns: ColumnTypeTable,
    pub store_scoped_columns: Vec<String>,
    /// Columns whose empty cells clear the persisted value instead of
    /// leaving it untouched
    pub clean_up_empty_columns: Vec<String>,
    pub image_types: Vec<ImageType>,
    pub visibilities: BTreeMap<String, i64>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            update_url_key_from_name: true,
            category_delimiter: ',',
            workers: 1,
            slug: SlugConfig::default(),
            product_columns: default_product_columns(),
            stock_columns: default_stock_columns(),
            store_scoped_columns: [
                "name",
                "url_key",
                "visibility",
                "status",
                "description",
                "short_description",
                "meta_title",
                "meta_description",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            clean_up_empty_columns: Vec::new(),
            image_types: ["base", "small", "thumbnail", "swatch"]
                .iter()
                .map(|role| {
                    ImageType::new(&format!("{}_image", role), &format!("{}_image_label", role))
                })
                .collect(),
            visibilities: [
                ("Not Visible Individually", 1),
                ("Catalog", 2),
                ("Search", 3),
                ("Catalog, Search", 4),
            ]
            .iter()
            .map(|(label, code)| (label.to_string(), *code))
            .collect(),
        }
    }
}

fn default_product_columns() -> ColumnTypeTable {
    use ScalarType::{Float, Int, String as Text};
    [
        ("sku", Text),
        ("name", Text),
        ("url_key", Text),
        ("visibility", Int),
        ("status", Int),
        ("price", Float),
        ("special_price", Float),
        ("weight", Float),
        ("tax_class_id", Int),
        ("description", Text),
        ("short_description", Text),
        ("meta_title", Text),
        ("meta_description", Text),
        ("attribute_set_code", Text),
        ("product_type", Text),
    ]
    .iter()
    .fold(ColumnTypeTable::new(), |table, (column, scalar_type)| {
        table.with(column, column, *scalar_type)
    })
}

fn default_stock_columns() -> ColumnTypeTable {
    use ScalarType::{Float, Int};
    [
        ("qty", "qty", Float),
        ("out_of_stock_qty", "min_qty", Float),
        ("use_config_min_qty", "use_config_min_qty", Int),
        ("is_qty_decimal", "is_qty_decimal", Int),
        ("allow_backorders", "backorders", Int),
        ("use_config_backorders", "use_config_backorders", Int),
        ("min_cart_qty", "min_sale_qty", Float),
        ("use_config_min_sale_qty", "use_config_min_sale_qty", Int),
        ("max_cart_qty", "max_sale_qty", Float),
        ("use_config_max_sale_qty", "use_config_max_sale_qty", Int),
        ("is_in_stock", "is_in_stock", Int),
        ("notify_on_stock_below", "notify_stock_qty", Float),
        ("use_config_notify_stock_qty", "use_config_notify_stock_qty", Int),
        ("manage_stock", "manage_stock", Int),
        ("use_config_manage_stock", "use_config_manage_stock", Int),
        ("use_config_qty_increments", "use_config_qty_increments", Int),
        ("qty_increments", "qty_increments", Float),
        ("use_config_enable_qty_inc", "use_config_enable_qty_inc", Int),
        ("enable_qty_increments", "enable_qty_increments", Int),
        ("is_decimal_divided", "is_decimal_divided", Int),
    ]
    .iter()
    .fold(ColumnTypeTable::new(), |table, (source, target, scalar_type)| {
        table.with(source, target, *scalar_type)
    })
}

impl ImportConfig {
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Result<Self, ImportError> {
        let path = path.into();
        tracing::info!("Loading configuration from {:?}", path);
        let file = std::fs::File::open(&path)?;
        let config = serde_json::from_reader(StripComments::new(file)).map_err(|e| {
            ImportError::InvalidConfig(format!(
                "Failed to parse configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::info!("Successfully loaded configuration: {}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ImportError> {
        serde_json::from_reader(StripComments::new(contents.as_bytes())).map_err(|e| {
            ImportError::InvalidConfig(format!("Failed to parse configuration: {}", e))
        })
    }

    pub fn validate(&self) -> Result<(), ImportError> {
        tracing::info!("Validating configuration...");

        if self.workers == 0 {
            return Err(invalid("workers must be at least 1"));
        }
        if self.slug.max_iterations == 0 {
            return Err(invalid("slug.maxIterations must be at least 1"));
        }
        if self.slug.max_reservation_retries == 0 {
            return Err(invalid("slug.maxReservationRetries must be at least 1"));
        }

        if !self.category_delimiter.is_ascii() {
            return Err(invalid("categoryDelimiter must be an ASCII character"));
        }

        match self.product_columns.get(columns::SKU) {
            None => {
                tracing::error!("Product columns lack '{}'", columns::SKU);
                return Err(invalid("productColumns must contain 'sku'"));
            }
            Some(column) if column.target != columns::SKU => {
                tracing::error!("Product column 'sku' maps to '{}'", column.target);
                return Err(invalid(&format!(
                    "productColumns 'sku' must target 'sku', not '{}'",
                    column.target
                )));
            }
            Some(_) => {}
        }

        for column in &self.store_scoped_columns {
            if !self.product_columns.contains_source(column) {
                tracing::error!("Store-scoped column '{}' is not a product column", column);
                return Err(invalid(&format!(
                    "storeScopedColumns entry '{}' is missing from productColumns",
                    column
                )));
            }
        }

        for column in &self.clean_up_empty_columns {
            if column == columns::SKU {
                return Err(invalid("cleanUpEmptyColumns must not contain 'sku'"));
            }
            if !self.product_columns.contains_source(column)
                && !self.stock_columns.contains_source(column)
            {
                tracing::error!("Clean-up column '{}' is not an attribute column", column);
                return Err(invalid(&format!(
                    "cleanUpEmptyColumns entry '{}' is neither a product nor a stock column",
                    column
                )));
            }
        }

        let mut targets = BTreeSet::new();
        for (source, column) in self.stock_columns.iter() {
            if !targets.insert(column.target.as_str()) {
                tracing::error!("Stock column '{}' maps to a duplicate target", source);
                return Err(invalid(&format!(
                    "stockColumns target '{}' is used more than once",
                    column.target
                )));
            }
        }

        for image_type in &self.image_types {
            if !image_type.path.ends_with("_image") {
                tracing::error!("Invalid image path column: {}", image_type.path);
                return Err(invalid(&format!(
                    "imageTypes path '{}' must end with '_image'",
                    image_type.path
                )));
            }
        }

        tracing::info!("Configuration validation successful");
        Ok(())
    }
}

fn invalid(message: &str) -> ImportError {
    ImportError::InvalidConfig(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ImportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.product_columns.len(), 15);
        assert_eq!(config.stock_columns.len(), 20);
        assert_eq!(
            config.stock_columns.get("allow_backorders").unwrap().target,
            "backorders"
        );
    }

    #[test]
    fn test_template_matches_defaults() {
        let config = ImportConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, ImportConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = ImportConfig::parse(
            r#"{
                // keep the persisted URL key of existing products
                "updateUrlKeyFromName": false,
                "slug": { "maxIterations": 8 }
            }"#,
        )
        .unwrap();
        assert!(!config.update_url_key_from_name);
        assert_eq!(config.slug.max_iterations, 8);
        assert_eq!(config.slug.max_reservation_retries, 5);
        assert_eq!(config.category_delimiter, ',');
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = ImportConfig::parse(r#"{ "wokers": 2 }"#).unwrap_err();
        assert!(matches!(err, ImportError::InvalidConfig(_)));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = ImportConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = ImportConfig::default();
        config.store_scoped_columns.push("color".to_string());
        assert!(config.validate().is_err());

        let mut config = ImportConfig::default();
        config
            .stock_columns
            .insert("backorders", "backorders", ScalarType::Int);
        assert!(config.validate().is_err());

        let mut config = ImportConfig::default();
        config.image_types.push(ImageType::new("gallery", "gallery_label"));
        assert!(config.validate().is_err());

        let config = ImportConfig {
            product_columns: ColumnTypeTable::new().with("name", "name", ScalarType::String),
            store_scoped_columns: Vec::new(),
            ..ImportConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sku_must_keep_its_target() {
        let mut config = ImportConfig::default();
        config
            .product_columns
            .insert("sku", "product_sku", ScalarType::String);
        assert!(matches!(
            config.validate(),
            Err(ImportError::InvalidConfig(message)) if message.contains("product_sku")
        ));
    }

    #[test]
    fn test_clean_up_columns_must_be_attribute_columns() {
        let config = ImportConfig::parse(
            r#"{ "cleanUpEmptyColumns": ["special_price", "qty"] }"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());

        let mut config = ImportConfig::default();
        config.clean_up_empty_columns.push("color".to_string());
        assert!(config.validate().is_err());

        let mut config = ImportConfig::default();
        config.clean_up_empty_columns.push("sku".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let config = ImportConfig::from_file("../test-data/config.jsonc").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.workers, 2);
    }
}
