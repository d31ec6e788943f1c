//! A small in-memory relational store driven by a keyword command language.
//!
//! Tables hold typed columns, composite primary keys and foreign keys are
//! enforced on every write, and statements may be concatenated without
//! separators.

pub mod ast;
pub mod column;
pub mod constraints;
pub mod data_type;
pub mod database;
pub mod error;
pub mod parser;
pub mod predicate;
pub mod render;
pub mod segmenter;
pub mod session;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use column::Column;
pub use data_type::DataType;
pub use database::{Database, Outcome, QueryResult};
pub use error::{Error, Result};
pub use session::{Session, SessionConfig};
pub use table::{ColumnDef, Table};
pub use value::Value;
