use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ImportError;

/// Scalar type a raw column value is cast to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScalarType {
    Int,
    Float,
    String,
    Bool,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::String => "string",
            ScalarType::Bool => "bool",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarType {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "int" | "integer" => Ok(ScalarType::Int),
            "float" | "decimal" => Ok(ScalarType::Float),
            "string" | "varchar" | "text" => Ok(ScalarType::String),
            "bool" | "boolean" => Ok(ScalarType::Bool),
            _ => Err(ImportError::InvalidConfig(format!(
                "Invalid column type: {} [Expected: int, float, string, bool]",
                s
            ))),
        }
    }
}

impl TryFrom<String> for ScalarType {
    type Error = ImportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScalarType> for String {
    fn from(value: ScalarType) -> Self {
        value.as_str().to_string()
    }
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Explicitly cleared; removes the persisted value on upsert
    Null,
}

impl AttributeValue {
    /// Value equality used for change detection: ints and floats holding the
    /// same number compare equal.
    pub fn same_as(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (AttributeValue::Int(a), AttributeValue::Float(b))
            | (AttributeValue::Float(b), AttributeValue::Int(a)) => (*a as f64) == *b,
            _ => self == other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            AttributeValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Target attribute name -> typed value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMapping(BTreeMap<String, AttributeValue>);

impl AttributeMapping {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(AttributeValue::as_str)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Merge the passed mapping into this one, the passed values win
    pub fn merge(&mut self, other: AttributeMapping) {
        self.0.extend(other.0);
    }

    /// Apply the passed values as an update: cleared values remove the key,
    /// every other value replaces the current one
    pub fn apply(&mut self, update: &AttributeMapping) {
        for (name, value) in update.iter() {
            if value.is_null() {
                self.0.remove(name);
            } else {
                self.0.insert(name.clone(), value.clone());
            }
        }
    }

    /// Value of `name`, treating a cleared value like an absent one
    pub fn present(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name).filter(|value| !value.is_null())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeMapping {
    fn from_iter<T: IntoIterator<Item = (String, AttributeValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnType {
    pub target: String,
    #[serde(rename = "type")]
    pub scalar_type: ScalarType,
}

/// Declarative source column -> (target attribute, scalar type) table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnTypeTable(BTreeMap<String, ColumnType>);

impl ColumnTypeTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, source: &str, target: &str, scalar_type: ScalarType) -> Self {
        self.insert(source, target, scalar_type);
        self
    }

    pub fn insert(&mut self, source: &str, target: &str, scalar_type: ScalarType) {
        self.0.insert(
            source.to_string(),
            ColumnType {
                target: target.to_string(),
                scalar_type,
            },
        );
    }

    pub fn get(&self, source: &str) -> Option<&ColumnType> {
        self.0.get(source)
    }

    pub fn contains_source(&self, source: &str) -> bool {
        self.0.contains_key(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnType)> {
        self.0.iter()
    }

    pub fn targets(&self) -> BTreeSet<String> {
        self.0.values().map(|c| c.target.clone()).collect()
    }

    /// Sub-table with the entries whose source column is kept by `keep`
    pub fn filtered<F>(&self, keep: F) -> ColumnTypeTable
    where
        F: Fn(&str) -> bool,
    {
        Self(
            self.0
                .iter()
                .filter(|(source, _)| keep(source))
                .map(|(source, column)| (source.clone(), column.clone()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_aliases() {
        assert_eq!("integer".parse::<ScalarType>().unwrap(), ScalarType::Int);
        assert_eq!("Decimal".parse::<ScalarType>().unwrap(), ScalarType::Float);
        assert_eq!("varchar".parse::<ScalarType>().unwrap(), ScalarType::String);
        assert_eq!("boolean".parse::<ScalarType>().unwrap(), ScalarType::Bool);
        assert!("date".parse::<ScalarType>().is_err());
    }

    #[test]
    fn test_numeric_values_compare_across_types() {
        assert!(AttributeValue::Int(5).same_as(&AttributeValue::Float(5.0)));
        assert!(AttributeValue::Float(5.0).same_as(&AttributeValue::Int(5)));
        assert!(!AttributeValue::Int(5).same_as(&AttributeValue::Float(5.5)));
        assert!(!AttributeValue::Int(1).same_as(&AttributeValue::Bool(true)));
    }

    #[test]
    fn test_attribute_mapping_json_shape() {
        let mapping = AttributeMapping::new()
            .with("qty", 12.5)
            .with("is_in_stock", 1_i64)
            .with("sku", "red-shirt");
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"is_in_stock":1,"qty":12.5,"sku":"red-shirt"}"#);

        let parsed: AttributeMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.get("is_in_stock"), Some(&AttributeValue::Int(1)));
        assert_eq!(parsed.get_str("sku"), Some("red-shirt"));
    }

    #[test]
    fn test_apply_removes_cleared_values() {
        let mut persisted = AttributeMapping::new()
            .with("sku", "a")
            .with("special_price", 9.5)
            .with("name", "A");
        let update = AttributeMapping::new()
            .with("special_price", AttributeValue::Null)
            .with("name", "B");
        persisted.apply(&update);

        assert!(!persisted.contains_key("special_price"));
        assert_eq!(persisted.get_str("name"), Some("B"));
        assert_eq!(update.present("special_price"), None);
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"name":"B","special_price":null}"#
        );
    }

    #[test]
    fn test_column_table_deserializes_type_names() {
        let table: ColumnTypeTable = serde_json::from_str(
            r#"{"out_of_stock_qty": {"target": "min_qty", "type": "decimal"}}"#,
        )
        .unwrap();
        let column = table.get("out_of_stock_qty").unwrap();
        assert_eq!(column.target, "min_qty");
        assert_eq!(column.scalar_type, ScalarType::Float);
    }
}
