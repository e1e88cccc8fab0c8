mod attribute;
mod entity;
mod row;

pub use attribute::{AttributeMapping, AttributeValue, ColumnType, ColumnTypeTable, ScalarType};
pub use entity::{Category, EntityId, EntitySnapshot, EntityType, NaturalKey, ScopePath};
pub use row::{Row, ValueSource};
