use serde::{Deserialize, Serialize};
use std::fmt;

use super::attribute::{AttributeMapping, AttributeValue};
use crate::error::ImportError;

pub type EntityId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Product,
    ProductStoreAttribute,
    StockItem,
    MediaGallery,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Product => "product",
            EntityType::ProductStoreAttribute => "product_store_attribute",
            EntityType::StockItem => "stock_item",
            EntityType::MediaGallery => "media_gallery",
        }
    }

    /// Attributes that identify an entity of this type
    pub fn key_fields(&self) -> &'static [&'static str] {
        match self {
            EntityType::Product => &["sku"],
            EntityType::ProductStoreAttribute => &["entity_id", "store_view_code"],
            EntityType::StockItem => &["product_id", "website_id", "stock_id"],
            EntityType::MediaGallery => &["product_id", "role", "store_view_code"],
        }
    }

    pub fn natural_key(&self, mapping: &AttributeMapping) -> Result<NaturalKey, ImportError> {
        self.key_fields()
            .iter()
            .map(|field| {
                mapping
                    .present(field)
                    .map(|value| (field.to_string(), value.clone()))
                    .ok_or_else(|| {
                        ImportError::Processing(format!(
                            "Key field '{}' missing from {} attributes",
                            field,
                            self.as_str()
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(NaturalKey)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered key field values of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaturalKey(pub Vec<(String, AttributeValue)>);

impl NaturalKey {
    pub fn matches(&self, mapping: &AttributeMapping) -> bool {
        self.0.iter().all(|(field, value)| {
            mapping
                .get(field)
                .is_some_and(|stored| stored.same_as(value))
        })
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Previously persisted state of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub attributes: AttributeMapping,
}

/// Hierarchical placement under which a slug must be unique
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopePath(Vec<String>);

impl ScopePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Split a URL path like `men/shirts` into its segments
    pub fn from_url_path(url_path: &str) -> Self {
        Self(
            url_path
                .split('/')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: EntityId,
    /// Breadcrumb as used in the `categories` column
    pub path: String,
    pub url_path: String,
}

impl Category {
    pub fn scope_path(&self) -> ScopePath {
        ScopePath::from_url_path(&self.url_path)
    }
}
