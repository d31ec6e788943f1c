//! Primary key, foreign key and drop-safety checks.
//!
//! Every check here is read-only. Executors run them all before mutating
//! anything, so a rejected statement leaves the catalog untouched.

use std::collections::HashSet;
use std::fmt;

use allocative::Allocative;

use crate::database::Database;
use crate::error::{Error, Result};
use crate::table::Table;
use crate::value::Value;

/// `referencing_table(referencing_columns) references referenced_table(referenced_columns)`.
#[derive(Debug, Clone, PartialEq, Eq, Allocative)]
pub struct ForeignKey {
    pub referencing_table: String,
    pub referencing_columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// Returns true if `table` is either side of this key.
    pub fn mentions_table(&self, table: &str) -> bool {
        self.referencing_table == table || self.referenced_table == table
    }

    /// Returns true if `table.column` takes part in this key on either side.
    pub fn uses_column(&self, table: &str, column: &str) -> bool {
        (self.referencing_table == table && self.referencing_columns.iter().any(|c| c == column))
            || (self.referenced_table == table
                && self.referenced_columns.iter().any(|c| c == column))
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) references {}({})",
            self.referencing_table,
            self.referencing_columns.join(", "),
            self.referenced_table,
            self.referenced_columns.join(", ")
        )
    }
}

/// Stringified tuple, the form foreign keys compare values in.
pub(crate) fn key_text(values: &[Value]) -> Vec<String> {
    values.iter().map(Value::to_string).collect()
}

impl Database {
    /// Rejects `key` if some row of `table` already has the same composite
    /// primary key, compared as text. Tables without a primary key accept
    /// anything.
    pub(crate) fn check_primary_key_free(&self, table: &Table, key: &[Value]) -> Result<()> {
        if table.primary_key.is_empty() {
            return Ok(());
        }
        let key = key_text(key);
        for row in 0..table.row_count {
            if key_text(&table.tuple(&table.primary_key, row)?) == key {
                return Err(Error::constraint(format!(
                    "duplicate primary key ({}) in table {:?}",
                    key.join(", "),
                    table.name
                )));
            }
        }
        Ok(())
    }

    /// Rejects a set of composite keys, one per row, containing a duplicate.
    pub(crate) fn check_primary_keys_distinct(
        &self,
        table: &Table,
        keys: impl IntoIterator<Item = Vec<Value>>,
    ) -> Result<()> {
        let mut seen = HashSet::new();
        for key in keys {
            let text = key_text(&key);
            if !seen.insert(text.clone()) {
                return Err(Error::constraint(format!(
                    "duplicate primary key ({}) in table {:?}",
                    text.join(", "),
                    table.name
                )));
            }
        }
        Ok(())
    }

    /// Returns true if a row of the referenced table matches `tuple`
    /// on the referenced columns.
    pub(crate) fn is_referenced(&self, fk: &ForeignKey, tuple: &[String]) -> Result<bool> {
        let referenced = self.table(&fk.referenced_table)?;
        for row in 0..referenced.row_count {
            let candidate = key_text(&referenced.tuple(&fk.referenced_columns, row)?);
            if candidate == tuple {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns true if any row of the referencing table points at `tuple`.
    pub(crate) fn has_dependents(&self, fk: &ForeignKey, tuple: &[String]) -> Result<bool> {
        let referencing = self.table(&fk.referencing_table)?;
        for row in 0..referencing.row_count {
            let candidate = key_text(&referencing.tuple(&fk.referencing_columns, row)?);
            if candidate == tuple {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Checks that a row of `table`, given as a column lookup, satisfies
    /// every foreign key whose referencing side is `table`.
    pub(crate) fn check_outgoing_references<'v>(
        &self,
        table: &str,
        value_of: impl Fn(&str) -> Option<&'v Value>,
    ) -> Result<()> {
        for fk in self.foreign_keys_from(table) {
            let tuple = fk
                .referencing_columns
                .iter()
                .map(|column| {
                    value_of(column).map(Value::to_string).ok_or_else(|| {
                        Error::schema(format!("column {column:?} does not exist in {table:?}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            if !self.is_referenced(fk, &tuple)? {
                return Err(Error::constraint(format!(
                    "foreign key {fk} violated: no row ({}) in table {:?}",
                    tuple.join(", "),
                    fk.referenced_table
                )));
            }
        }
        Ok(())
    }

    /// Validates a new foreign key before it is registered.
    ///
    /// Type agreement is checked first, on every position whose columns both
    /// exist. Then: duplicate key, referenced table, referenced and
    /// referencing columns, primary key set, arity.
    pub(crate) fn validate_foreign_key(&self, fk: &ForeignKey) -> Result<()> {
        let column_type = |table: &str, column: &str| {
            self.get_table(table)
                .and_then(|t| t.get_col(column))
                .map(|c| c.data_type)
        };
        for (from, to) in fk.referencing_columns.iter().zip(&fk.referenced_columns) {
            if let (Some(from_type), Some(to_type)) = (
                column_type(&fk.referencing_table, from),
                column_type(&fk.referenced_table, to),
            ) && from_type != to_type
            {
                return Err(Error::schema(format!(
                    "type mismatch in foreign key: {}.{from} is {from_type} but {}.{to} is {to_type}",
                    fk.referencing_table, fk.referenced_table
                )));
            }
        }

        if self.foreign_keys.contains(fk) {
            return Err(Error::constraint(format!(
                "foreign key {fk} already exists"
            )));
        }

        let referencing = self.table(&fk.referencing_table)?;
        let referenced = self.get_table(&fk.referenced_table).ok_or_else(|| {
            Error::schema(format!(
                "referenced table {:?} does not exist",
                fk.referenced_table
            ))
        })?;

        for column in &fk.referenced_columns {
            referenced.column(column)?;
        }
        for column in &fk.referencing_columns {
            referencing.column(column)?;
        }

        let mut wanted: Vec<&String> = fk.referenced_columns.iter().collect();
        let mut primary: Vec<&String> = referenced.primary_key.iter().collect();
        wanted.sort();
        wanted.dedup();
        primary.sort();
        if primary.is_empty() || wanted != primary {
            return Err(Error::constraint(format!(
                "referenced columns ({}) do not match the primary key of {:?}",
                fk.referenced_columns.join(", "),
                fk.referenced_table
            )));
        }

        if fk.referencing_columns.len() != fk.referenced_columns.len() {
            return Err(Error::constraint(format!(
                "foreign key {fk} has {} referencing and {} referenced columns",
                fk.referencing_columns.len(),
                fk.referenced_columns.len()
            )));
        }

        Ok(())
    }

    /// Rejects dropping a column that is missing, part of the primary key,
    /// or used by a foreign key on either side.
    pub(crate) fn check_column_droppable(&self, table: &Table, column: &str) -> Result<()> {
        table.column(column)?;
        if table.is_primary_key(column) {
            return Err(Error::constraint(format!(
                "column {column:?} is part of the primary key of {:?}",
                table.name
            )));
        }
        if let Some(fk) = self
            .foreign_keys
            .iter()
            .find(|fk| fk.uses_column(&table.name, column))
        {
            return Err(Error::constraint(format!(
                "column {column:?} is used by foreign key {fk}"
            )));
        }
        Ok(())
    }

    pub(crate) fn foreign_keys_from<'s>(
        &'s self,
        table: &'s str,
    ) -> impl Iterator<Item = &'s ForeignKey> + 's {
        self.foreign_keys
            .iter()
            .filter(move |fk| fk.referencing_table == table)
    }

    pub(crate) fn foreign_keys_to<'s>(
        &'s self,
        table: &'s str,
    ) -> impl Iterator<Item = &'s ForeignKey> + 's {
        self.foreign_keys
            .iter()
            .filter(move |fk| fk.referenced_table == table)
    }
}
