use allocative::Allocative;

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::value::Value;

/// Physical storage for column data.
/// Each variant wraps a collection of a specific type to ensure contiguous memory
/// allocation (columnar storage).
#[derive(Debug, Clone, Allocative)]
pub enum ColumnData {
    /// Vector of 64-bit integers.
    Int(Vec<i64>),
    /// Vector of 64-bit floats.
    Float(Vec<f64>),
    /// Vector of strings.
    Text(Vec<String>),
}

/// Represents a column within a table: a name, a fixed type and one value per row.
#[derive(Debug, Clone, Allocative)]
pub struct Column {
    /// The name of the column.
    pub name: String,
    /// The type every value of the column has.
    pub data_type: DataType,
    /// The actual values stored in the column.
    pub data: ColumnData,
}

impl Column {
    /// Creates a new, empty column with the specified name and data type.
    pub fn new(name: String, data_type: DataType) -> Self {
        let data = match data_type {
            DataType::Int => ColumnData::Int(vec![]),
            DataType::Float => ColumnData::Float(vec![]),
            DataType::Text => ColumnData::Text(vec![]),
        };
        Self {
            name,
            data_type,
            data,
        }
    }

    /// Creates a column holding `len` copies of the type's default value.
    ///
    /// Used when a column is added to a table that already has rows.
    pub fn filled_with_default(name: String, data_type: DataType, len: usize) -> Self {
        let data = match data_type {
            DataType::Int => ColumnData::Int(vec![0; len]),
            DataType::Float => ColumnData::Float(vec![0.0; len]),
            DataType::Text => ColumnData::Text(vec![String::new(); len]),
        };
        Self {
            name,
            data_type,
            data,
        }
    }

    /// Appends a new value to the end of the column.
    ///
    /// # Errors
    /// Returns an error if the value's type does not match the column's data type.
    ///
    /// # Example
    /// ```
    /// # use oxyrel::{Column, DataType, Value};
    /// let mut col = Column::new("age".into(), DataType::Int);
    /// col.push(Value::Int(30)).unwrap();
    ///
    /// assert_eq!(col.len(), 1);
    /// assert!(col.push(Value::Text("thirty".into())).is_err());
    /// ```
    pub fn push(&mut self, value: Value) -> Result<()> {
        match (&mut self.data, value) {
            (ColumnData::Int(col), Value::Int(v)) => col.push(v),
            (ColumnData::Float(col), Value::Float(v)) => col.push(v),
            (ColumnData::Text(col), Value::Text(v)) => col.push(v),
            (_, value) => return Err(self.mismatch(&value)),
        }
        Ok(())
    }

    /// Returns the number of rows currently stored in the column.
    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    /// Returns true if there is no row in the column, else false.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieves the value at the specified row index.
    ///
    /// Returns `None` if the index is out of bounds.
    pub fn get(&self, row_idx: usize) -> Option<Value> {
        match &self.data {
            ColumnData::Int(col) => col.get(row_idx).copied().map(Value::Int),
            ColumnData::Float(col) => col.get(row_idx).copied().map(Value::Float),
            ColumnData::Text(col) => col.get(row_idx).cloned().map(Value::Text),
        }
    }

    /// Returns the value at `row_idx` rendered as text, without cloning strings
    /// for integer and float columns.
    pub fn get_string(&self, row_idx: usize) -> Option<String> {
        match &self.data {
            ColumnData::Int(col) => col.get(row_idx).map(i64::to_string),
            ColumnData::Float(col) => col.get(row_idx).map(f64::to_string),
            ColumnData::Text(col) => col.get(row_idx).cloned(),
        }
    }

    /// Replace a value in the column by a new value.
    ///
    /// # Errors
    /// Returns an error if the row_idx is too high or if the value's type does not match the
    /// column's data type.
    pub fn set(&mut self, row_idx: usize, value: &Value) -> Result<()> {
        if self.len() <= row_idx {
            return Err(Error::schema(format!(
                "row {row_idx} is out of bounds for column {:?}",
                self.name
            )));
        }
        match (&mut self.data, value) {
            (ColumnData::Int(col), Value::Int(v)) => col[row_idx] = *v,
            (ColumnData::Float(col), Value::Float(v)) => col[row_idx] = *v,
            (ColumnData::Text(col), Value::Text(v)) => col[row_idx].clone_from(v),
            _ => return Err(self.mismatch(value)),
        }
        Ok(())
    }

    fn mismatch(&self, value: &Value) -> Error {
        Error::schema(format!(
            "type mismatch: value {value} is {} while column {:?} is {}",
            value.data_type(),
            self.name,
            self.data_type
        ))
    }
}
