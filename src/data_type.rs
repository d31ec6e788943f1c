use std::fmt;

use allocative::Allocative;

use crate::error::{Error, Result};
use crate::value::Value;

/// Represents the supported column types.
/// A column's type is fixed when the column is created and every value
/// stored in it afterwards is coerced to that type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Allocative)]
pub enum DataType {
    /// A 64-bit signed integer.
    Int,
    /// A 64-bit floating-point number.
    Float,
    /// A UTF-8 character string.
    Text,
}

impl DataType {
    /// Parses a type word from a column definition (`int`, `float`, `string`).
    ///
    /// `text` is accepted as an alias of `string`.
    pub fn from_word(word: &str) -> Result<Self> {
        match word {
            "int" | "integer" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "string" | "text" => Ok(Self::Text),
            _ => Err(Error::parse(format!("{word:?} is not a column type"))),
        }
    }

    /// The value a column of this type is back-filled with.
    pub fn default_value(self) -> Value {
        match self {
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Text => Value::Text(String::new()),
        }
    }

    /// Coerces a raw literal to a value of this type.
    ///
    /// # Errors
    /// Returns a schema error if the literal is not a valid number for a
    /// numeric type. Any literal is valid text.
    ///
    /// # Example
    /// ```
    /// # use oxyrel::{DataType, Value};
    /// assert_eq!(DataType::Int.coerce("42").unwrap(), Value::Int(42));
    /// assert_eq!(DataType::Float.coerce("2").unwrap(), Value::Float(2.0));
    /// assert!(DataType::Int.coerce("alice").is_err());
    /// ```
    pub fn coerce(self, literal: &str) -> Result<Value> {
        match self {
            Self::Int => literal
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| type_mismatch(literal, self)),
            Self::Float => literal
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| type_mismatch(literal, self)),
            Self::Text => Ok(Value::Text(literal.to_string())),
        }
    }
}

fn type_mismatch(literal: &str, data_type: DataType) -> Error {
    Error::schema(format!("type mismatch: {literal:?} is not a valid {data_type}"))
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "string",
        })
    }
}
