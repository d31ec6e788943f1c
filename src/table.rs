use allocative::Allocative;

use crate::column::Column;
use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::value::Value;

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

/// A table: ordered typed columns of equal length plus its primary key.
#[derive(Debug, Clone, Allocative)]
pub struct Table {
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Primary-key column names, in declaration order.
    pub primary_key: Vec<String>,
    pub row_count: usize,
}

impl Table {
    pub fn new(name: String, columns: Vec<ColumnDef>, primary_key: Vec<String>) -> Self {
        let columns = columns
            .into_iter()
            .map(|def| Column::new(def.name, def.data_type))
            .collect();
        Self {
            name,
            columns,
            primary_key,
            row_count: 0,
        }
    }

    /// Appends one row. `values` must follow the column order and already
    /// carry each column's type; nothing is written unless every value fits.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::schema(format!(
                "row has {} values while table {:?} has {} columns",
                values.len(),
                self.name,
                self.columns.len()
            )));
        }
        if let Some((column, value)) = self
            .columns
            .iter()
            .zip(&values)
            .find(|(column, value)| value.data_type() != column.data_type)
        {
            return Err(Error::schema(format!(
                "type mismatch: value {value} is {} while column {:?} is {}",
                value.data_type(),
                column.name,
                column.data_type
            )));
        }
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    pub fn get_row(&self, row_idx: usize) -> Option<Vec<Value>> {
        if self.row_count <= row_idx {
            return None;
        }
        self.columns.iter().map(|col| col.get(row_idx)).collect()
    }

    pub fn get_col(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_col(name).is_some()
    }

    /// Looks up a column, failing with a schema error naming this table.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.get_col(name).ok_or_else(|| {
            Error::schema(format!(
                "column {name:?} does not exist in table {:?}",
                self.name
            ))
        })
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|col| col.name.clone()).collect()
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|pk| pk == column)
    }

    /// Appends a column back-filled with its type's default value.
    pub fn add_column(&mut self, name: String, data_type: DataType) -> Result<()> {
        if self.has_column(&name) {
            return Err(Error::schema(format!(
                "column {name:?} already exists in table {:?}",
                self.name
            )));
        }
        self.columns
            .push(Column::filled_with_default(name, data_type, self.row_count));
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Result<Column> {
        let idx = self
            .columns
            .iter()
            .position(|col| col.name == name)
            .ok_or_else(|| {
                Error::schema(format!(
                    "column {name:?} does not exist in table {:?}",
                    self.name
                ))
            })?;
        Ok(self.columns.remove(idx))
    }

    /// Values of `columns` for one row, in the order given.
    pub fn tuple(&self, columns: &[String], row_idx: usize) -> Result<Vec<Value>> {
        columns
            .iter()
            .map(|name| {
                self.column(name)?.get(row_idx).ok_or_else(|| {
                    Error::schema(format!("row {row_idx} is out of bounds in {:?}", self.name))
                })
            })
            .collect()
    }

    /// Checks the row-count invariant: every column holds exactly `row_count` values.
    pub fn is_aligned(&self) -> bool {
        self.columns.iter().all(|col| col.len() == self.row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        Table::new(
            "person".into(),
            vec![
                ColumnDef {
                    name: "id".into(),
                    data_type: DataType::Int,
                },
                ColumnDef {
                    name: "name".into(),
                    data_type: DataType::Text,
                },
            ],
            vec!["id".into()],
        )
    }

    #[test]
    fn test_table_creation() {
        let table = people();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.row_count, 0);
        assert!(table.is_primary_key("id"));
        assert!(!table.is_primary_key("name"));
    }

    #[test]
    fn test_table_insert_and_get() {
        let mut table = people();

        table
            .insert(vec![Value::Int(1), Value::Text("alice".into())])
            .unwrap();

        assert_eq!(table.row_count, 1);
        assert_eq!(
            table.get_row(0),
            Some(vec![Value::Int(1), Value::Text("alice".into())])
        );
        assert_eq!(table.get_row(1), None);
    }

    #[test]
    fn test_type_mismatch_leaves_columns_aligned() {
        let mut table = people();

        // first value fits, second does not: nothing may be written
        let result = table.insert(vec![Value::Int(1), Value::Int(2)]);
        assert!(result.is_err());
        assert_eq!(table.row_count, 0);
        assert!(table.is_aligned());
        assert!(table.get_col("id").unwrap().is_empty());
    }

    #[test]
    fn test_column_count_mismatch() {
        let mut table = people();
        assert!(table.insert(vec![Value::Int(1)]).is_err());
        assert!(table.insert(vec![]).is_err());
    }

    #[test]
    fn test_add_column_back_fills() {
        let mut table = people();
        table
            .insert(vec![Value::Int(1), Value::Text("alice".into())])
            .unwrap();
        table
            .insert(vec![Value::Int(2), Value::Text("bob".into())])
            .unwrap();

        table.add_column("age".into(), DataType::Int).unwrap();

        assert!(table.is_aligned());
        assert_eq!(table.get_col("age").unwrap().get(1), Some(Value::Int(0)));
        assert!(table.add_column("age".into(), DataType::Int).is_err());
    }

    #[test]
    fn test_remove_column() {
        let mut table = people();
        let removed = table.remove_column("name").unwrap();
        assert_eq!(removed.name, "name");
        assert!(!table.has_column("name"));
        assert!(table.remove_column("name").is_err());
    }

    #[test]
    fn test_tuple() {
        let mut table = people();
        table
            .insert(vec![Value::Int(7), Value::Text("carol".into())])
            .unwrap();

        let tuple = table.tuple(&["name".into(), "id".into()], 0).unwrap();
        assert_eq!(tuple, vec![Value::Text("carol".into()), Value::Int(7)]);
        assert!(table.tuple(&["age".into()], 0).is_err());
    }
}
