use std::collections::BTreeSet;
use std::fmt;

use crate::types::{AttributeMapping, ColumnTypeTable, EntitySnapshot, ValueSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState {
    New,
    Changed,
    Unchanged,
}

impl ChangeState {
    pub fn requires_persistence(&self) -> bool {
        !matches!(self, ChangeState::Unchanged)
    }
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeState::New => f.write_str("new"),
            ChangeState::Changed => f.write_str("changed"),
            ChangeState::Unchanged => f.write_str("unchanged"),
        }
    }
}

/// Decides whether a prepared entity has to be written.
pub struct ChangeDetector;

impl ChangeDetector {
    /// Compare the candidate with the persisted snapshot, looking only at the
    /// significant columns.
    pub fn classify(
        candidate: &AttributeMapping,
        previous: Option<&EntitySnapshot>,
        significant_columns: &BTreeSet<String>,
    ) -> ChangeState {
        let previous = match previous {
            Some(previous) => &previous.attributes,
            None => return ChangeState::New,
        };

        for column in significant_columns {
            let unchanged = match (candidate.present(column), previous.present(column)) {
                (Some(new), Some(old)) => new.same_as(old),
                (None, None) => true,
                _ => false,
            };
            if !unchanged {
                tracing::debug!("Column '{}' differs from the persisted value", column);
                return ChangeState::Changed;
            }
        }

        ChangeState::Unchanged
    }

    /// Target names of the table columns the record actually supplies
    pub fn significant_columns<S>(values: &S, table: &ColumnTypeTable) -> BTreeSet<String>
    where
        S: ValueSource + ?Sized,
    {
        Self::significant_columns_with_clean_up(values, table, &BTreeSet::new())
    }

    /// Supplied columns plus the `clean_up` columns the record carries empty
    pub fn significant_columns_with_clean_up<S>(
        values: &S,
        table: &ColumnTypeTable,
        clean_up: &BTreeSet<String>,
    ) -> BTreeSet<String>
    where
        S: ValueSource + ?Sized,
    {
        table
            .iter()
            .filter(|(source, _)| {
                values.has_value(source)
                    || (clean_up.contains(source.as_str()) && values.value(source).is_some())
            })
            .map(|(_, column)| column.target.clone())
            .collect()
    }
}
