use std::path::PathBuf;

use crate::ColumnDef;
use crate::constraints::ForeignKey;
use crate::predicate::WherePattern;

#[derive(Debug, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    InsertInto(InsertInto),
    Select(Select),
    Update(Update),
    AlterTable(AlterTable),
    DropTable(String),
    Load(PathBuf),
    Save(PathBuf),
    Exit,
}

#[derive(Debug, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    /// Columns named by `primary key` clauses, unvalidated.
    pub primary_key: Vec<String>,
}

/// Literals stay raw: they are coerced once the column types are known.
#[derive(Debug, PartialEq)]
pub struct InsertInto {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub enum ColumnsSelect {
    Star,
    ColumnsNames(Vec<String>),
}

#[derive(Debug, PartialEq)]
pub struct Select {
    pub columns: ColumnsSelect,
    pub table: String,
    pub where_clause: Option<WherePattern>,
}

#[derive(Debug, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, String)>,
    pub where_clause: Option<WherePattern>,
}

#[derive(Debug, PartialEq)]
pub struct AlterTable {
    pub table: String,
    pub actions: Vec<AlterAction>,
}

#[derive(Debug, PartialEq)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    DropColumn(String),
    AddForeignKey(ForeignKey),
}
