use std::collections::BTreeSet;

use crate::error::ImportError;
use crate::types::{AttributeMapping, AttributeValue, ColumnTypeTable, ScalarType, ValueSource};

/// Casts raw column values into typed attributes.
pub struct AttributeProjector;

impl AttributeProjector {
    /// Project every table column with a non-empty value into the mapping.
    /// Absent and empty values are skipped, never defaulted.
    pub fn project<S>(values: &S, table: &ColumnTypeTable) -> Result<AttributeMapping, ImportError>
    where
        S: ValueSource + ?Sized,
    {
        Self::project_with_clean_up(values, table, &BTreeSet::new())
    }

    /// Like [`AttributeProjector::project`], except that an empty cell of a
    /// `clean_up` column the record carries projects to an explicit clear.
    pub fn project_with_clean_up<S>(
        values: &S,
        table: &ColumnTypeTable,
        clean_up: &BTreeSet<String>,
    ) -> Result<AttributeMapping, ImportError>
    where
        S: ValueSource + ?Sized,
    {
        let mut mapping = AttributeMapping::new();

        for (source, column) in table.iter() {
            let raw = match values.value(source) {
                Some(raw) if !raw.is_empty() => raw,
                Some(_) if clean_up.contains(source) => {
                    mapping.insert(column.target.clone(), AttributeValue::Null);
                    continue;
                }
                _ => continue,
            };
            let value = Self::cast(source, raw, column.scalar_type)?;
            mapping.insert(column.target.clone(), value);
        }

        Ok(mapping)
    }

    pub fn cast(
        column: &str,
        raw: &str,
        scalar_type: ScalarType,
    ) -> Result<AttributeValue, ImportError> {
        let malformed = || ImportError::MalformedAttribute {
            column: column.to_string(),
            value: raw.to_string(),
            expected: scalar_type,
        };

        match scalar_type {
            ScalarType::String => Ok(AttributeValue::String(raw.to_string())),
            ScalarType::Int => raw
                .trim()
                .parse::<i64>()
                .map(AttributeValue::Int)
                .map_err(|_| malformed()),
            ScalarType::Float => match raw.trim().parse::<f64>() {
                Ok(num) if num.is_finite() => Ok(AttributeValue::Float(num)),
                _ => Err(malformed()),
            },
            ScalarType::Bool => match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(AttributeValue::Bool(true)),
                "false" | "0" | "no" => Ok(AttributeValue::Bool(false)),
                _ => Err(malformed()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;

    fn qty_table() -> ColumnTypeTable {
        ColumnTypeTable::new().with("qty", "qty", ScalarType::Float)
    }

    #[test]
    fn test_projects_float_column() {
        let row = Row::from_pairs(2, [("qty", "12.5")]);
        let mapping = AttributeProjector::project(&row, &qty_table()).unwrap();
        assert_eq!(mapping.get("qty"), Some(&AttributeValue::Float(12.5)));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_empty_value_is_omitted() {
        let row = Row::from_pairs(2, [("qty", "")]);
        let mapping = AttributeProjector::project(&row, &qty_table()).unwrap();
        assert!(!mapping.contains_key("qty"));
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_absent_column_is_omitted() {
        let row = Row::from_pairs(2, [("sku", "red-shirt")]);
        let mapping = AttributeProjector::project(&row, &qty_table()).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_clean_up_column_projects_a_clear() {
        let table = qty_table().with("out_of_stock_qty", "min_qty", ScalarType::Float);
        let clean_up: BTreeSet<String> = ["qty".to_string()].into();

        let row = Row::from_pairs(2, [("qty", ""), ("out_of_stock_qty", "")]);
        let mapping = AttributeProjector::project_with_clean_up(&row, &table, &clean_up).unwrap();
        assert_eq!(mapping.get("qty"), Some(&AttributeValue::Null));
        assert!(!mapping.contains_key("min_qty"));

        // a column missing from the file clears nothing
        let row = Row::from_pairs(2, [("sku", "a")]);
        let mapping = AttributeProjector::project_with_clean_up(&row, &table, &clean_up).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_malformed_value_reports_column_and_type() {
        let row = Row::from_pairs(2, [("qty", "abc")]);
        let err = AttributeProjector::project(&row, &qty_table()).unwrap_err();
        match err {
            ImportError::MalformedAttribute {
                column,
                value,
                expected,
            } => {
                assert_eq!(column, "qty");
                assert_eq!(value, "abc");
                assert_eq!(expected, ScalarType::Float);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_source_column_maps_to_target_name() {
        let table = ColumnTypeTable::new()
            .with("allow_backorders", "backorders", ScalarType::Int)
            .with("manage_stock", "manage_stock", ScalarType::Bool)
            .with("name", "name", ScalarType::String);
        let row = Row::from_pairs(
            2,
            [
                ("allow_backorders", " 2 "),
                ("manage_stock", "Yes"),
                ("name", "Red Shirt"),
            ],
        );
        let mapping = AttributeProjector::project(&row, &table).unwrap();
        assert_eq!(mapping.get("backorders"), Some(&AttributeValue::Int(2)));
        assert_eq!(mapping.get("manage_stock"), Some(&AttributeValue::Bool(true)));
        assert_eq!(mapping.get_str("name"), Some("Red Shirt"));
        assert!(!mapping.contains_key("allow_backorders"));
    }

    #[test]
    fn test_int_rejects_fractions() {
        assert!(AttributeProjector::cast("is_in_stock", "1.5", ScalarType::Int).is_err());
        assert!(AttributeProjector::cast("qty", "NaN", ScalarType::Float).is_err());
    }
}
