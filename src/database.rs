use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use allocative::Allocative;
use bitvec::prelude::*;
use tracing::{debug, info};

use crate::{
    Value,
    ast::{AlterAction, AlterTable, ColumnsSelect, CreateTable, InsertInto, Select, Statement, Update},
    constraints::{ForeignKey, key_text},
    error::{Error, Result},
    parser::parse_segment,
    predicate::{Fold, WherePattern},
    segmenter::{StatementKind, segment},
    table::Table,
    tokenizer::tokenize,
};

/// The main entry point for the in-memory store.
/// It owns every table and the foreign keys between them, and executes statements.
#[derive(Default, Debug, Allocative)]
pub struct Database {
    /// Tables by name, iterated in name order.
    pub(crate) tables: BTreeMap<String, Table>,
    /// Every registered foreign key, in registration order.
    pub(crate) foreign_keys: Vec<ForeignKey>,
}

/// Represents the result of a successful `SELECT` query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// The names of the columns included in the result set.
    pub columns: Vec<String>,
    /// The actual data, returned as a vector of rows, where each row is a vector of [Value].
    pub rows: Vec<Vec<Value>>,
}

/// What a successfully executed statement did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created(String),
    Inserted(String),
    Rows(QueryResult),
    Updated { table: String, rows: usize },
    Altered(String),
    Dropped(String),
    /// A `load` ran its file; failed statements were reported and skipped.
    Loaded {
        path: PathBuf,
        succeeded: usize,
        failed: usize,
    },
    Saved(PathBuf),
    Exit,
}

impl Database {
    /// Creates a new, empty database instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves a reference to a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns the names of all tables, in name order.
    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Returns all registered foreign keys.
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Heap bytes held by the catalog, tables and row data included.
    pub fn allocated_bytes(&self) -> usize {
        allocative::size_of_unique_allocated_data(self)
    }

    pub(crate) fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::schema(format!("table {name:?} does not exist")))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::schema(format!("table {name:?} does not exist")))
    }

    /// Executes every statement in `input`, in order.
    ///
    /// Statements that succeed before a failing one stay applied; execution
    /// stops at the first failure. `load`, `save` and `exit` need a
    /// [Session](crate::Session) and are rejected here.
    ///
    /// # Errors
    /// Returns the first tokenization, segmentation, parse or execution error.
    ///
    /// # Example
    /// ```
    /// use oxyrel::{Database, Value};
    /// let mut db = Database::new();
    /// db.execute("create person ( id int primary key ( id ) name string )").unwrap();
    /// db.execute("insert into person ( id name ) values ( 1 alice )").unwrap();
    ///
    /// let result = db.query("select * from person").unwrap();
    /// assert_eq!(result.rows[0], vec![Value::Int(1), Value::Text("alice".into())]);
    ///
    /// // same primary key again
    /// assert!(db.execute("insert into person ( id name ) values ( 1 bob )").is_err());
    /// ```
    pub fn execute(&mut self, input: &str) -> Result<Vec<Outcome>> {
        let tokens = tokenize(input)?;
        let mut outcomes = vec![];
        for segment in segment(&tokens) {
            let statement = parse_segment(&segment?)?;
            outcomes.push(self.execute_statement(statement)?);
        }
        Ok(outcomes)
    }

    /// Runs a single `SELECT` without mutating anything.
    ///
    /// # Errors
    /// Returns an error if `input` is not exactly one select statement, or if
    /// the table, a column or a condition is invalid.
    pub fn query(&self, input: &str) -> Result<QueryResult> {
        let tokens = tokenize(input)?;
        let mut segments = segment(&tokens);
        let first = segments
            .next()
            .ok_or_else(|| Error::parse("empty query"))??;
        if first.kind != StatementKind::Select || segments.next().is_some() {
            return Err(Error::parse("query expects exactly one select statement"));
        }
        match parse_segment(&first)? {
            Statement::Select(select) => self.select(&select),
            _ => Err(Error::parse("query expects exactly one select statement")),
        }
    }

    /// Dispatches one parsed statement to its executor.
    pub fn execute_statement(&mut self, statement: Statement) -> Result<Outcome> {
        let outcome = match statement {
            Statement::CreateTable(create) => {
                let name = create.name.clone();
                self.create_table(create)?;
                Outcome::Created(name)
            }
            Statement::InsertInto(insert) => {
                let name = insert.table.clone();
                self.insert(insert)?;
                Outcome::Inserted(name)
            }
            Statement::Select(select) => Outcome::Rows(self.select(&select)?),
            Statement::Update(update) => {
                let table = update.table.clone();
                let rows = self.update(update)?;
                Outcome::Updated { table, rows }
            }
            Statement::AlterTable(alter) => {
                let name = alter.table.clone();
                self.alter_table(alter)?;
                Outcome::Altered(name)
            }
            Statement::DropTable(name) => {
                self.drop_table(&name)?;
                Outcome::Dropped(name)
            }
            Statement::Load(_) | Statement::Save(_) | Statement::Exit => {
                return Err(Error::parse(
                    "load, save and exit are only available in a session",
                ));
            }
        };
        if !matches!(outcome, Outcome::Rows(_)) && tracing::enabled!(tracing::Level::DEBUG) {
            debug!(bytes = self.allocated_bytes(), "catalog footprint");
        }
        Ok(outcome)
    }

    /// Registers a new table.
    ///
    /// Nothing is registered unless the whole definition is valid: unique
    /// table and column names, and at least one primary key column, every
    /// one of which is a defined column.
    pub fn create_table(&mut self, create: CreateTable) -> Result<()> {
        if self.tables.contains_key(&create.name) {
            return Err(Error::schema(format!(
                "table {:?} already exists",
                create.name
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = create.columns.iter().find(|c| !seen.insert(c.name.as_str())) {
            return Err(Error::schema(format!(
                "column {:?} is defined twice in table {:?}",
                dup.name, create.name
            )));
        }

        if create.primary_key.is_empty() {
            return Err(Error::constraint(format!(
                "table {:?} declares no primary key",
                create.name
            )));
        }
        if let Some(missing) = create.primary_key.iter().find(|pk| !seen.contains(pk.as_str())) {
            return Err(Error::schema(format!(
                "primary key column {missing:?} does not exist in table {:?}",
                create.name
            )));
        }

        info!(table = %create.name, columns = create.columns.len(), primary_key = ?create.primary_key, "created table");
        let table = Table::new(create.name.clone(), create.columns, create.primary_key);
        self.tables.insert(create.name, table);
        Ok(())
    }

    /// Inserts one full row.
    ///
    /// Every column of the table must be named exactly once. Literals are
    /// coerced to their column's type, then the primary key and the foreign
    /// keys are checked; the row is appended only if everything passes.
    fn insert(&mut self, insert: InsertInto) -> Result<()> {
        let values = {
            let table = self.table(&insert.table)?;

            if insert.columns.len() != insert.values.len() {
                return Err(Error::schema(format!(
                    "{} columns but {} values in insert into {:?}",
                    insert.columns.len(),
                    insert.values.len(),
                    insert.table
                )));
            }

            let mut provided: BTreeMap<&str, &str> = BTreeMap::new();
            for (column, value) in insert.columns.iter().zip(&insert.values) {
                table.column(column)?;
                if provided.insert(column.as_str(), value.as_str()).is_some() {
                    return Err(Error::schema(format!(
                        "column {column:?} appears twice in insert into {:?}",
                        insert.table
                    )));
                }
            }

            // Build the row following the table's column order
            let values = table
                .columns
                .iter()
                .map(|col| {
                    let literal = provided.get(col.name.as_str()).ok_or_else(|| {
                        Error::schema(format!(
                            "column {:?} missing from insert into {:?}",
                            col.name, insert.table
                        ))
                    })?;
                    col.data_type.coerce(literal)
                })
                .collect::<Result<Vec<Value>>>()?;

            let value_of = |name: &str| {
                table
                    .columns
                    .iter()
                    .position(|c| c.name == name)
                    .map(|idx| &values[idx])
            };

            let key = table
                .primary_key
                .iter()
                .map(|pk| {
                    value_of(pk).cloned().ok_or_else(|| {
                        Error::schema(format!("primary key column {pk:?} does not exist"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            self.check_primary_key_free(table, &key)?;
            self.check_outgoing_references(&insert.table, value_of)?;
            values
        };

        let table = self.table_mut(&insert.table)?;
        table.insert(values)?;
        debug!(table = %insert.table, rows = table.row_count, "inserted row");
        Ok(())
    }

    /// Executes a `SELECT`.
    ///
    /// `*` expands to every column in declaration order. Rows are kept
    /// according to [Fold::OrFlag].
    pub fn select(&self, select: &Select) -> Result<QueryResult> {
        let table = self.table(&select.table)?;

        let columns = match &select.columns {
            ColumnsSelect::Star => table.columns.iter().collect::<Vec<_>>(),
            ColumnsSelect::ColumnsNames(names) => names
                .iter()
                .map(|name| table.column(name))
                .collect::<Result<Vec<_>>>()?,
        };

        let mask = selection(table, select.where_clause.as_ref(), Fold::OrFlag)?;

        let rows = mask
            .iter_ones()
            .map(|row| {
                columns
                    .iter()
                    .map(|col| {
                        col.get(row).ok_or_else(|| {
                            Error::schema(format!("row {row} is out of bounds in {:?}", table.name))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(table = %select.table, rows = rows.len(), "selected rows");
        Ok(QueryResult {
            columns: columns.iter().map(|col| col.name.clone()).collect(),
            rows,
        })
    }

    /// Executes an `UPDATE` and returns how many rows it changed.
    ///
    /// The update is performed in two phases:
    /// 1. **Validation**: SET columns and literals are resolved, the rows to
    ///    change are selected with [Fold::Running], and the resulting rows
    ///    are checked against the primary key and every foreign key touching
    ///    the changed columns.
    /// 2. **Modification**: the new values are written.
    fn update(&mut self, update: Update) -> Result<usize> {
        let (assignments, mask) = {
            let table = self.table(&update.table)?;

            let assignments = update
                .assignments
                .iter()
                .map(|(column, literal)| {
                    let idx = table
                        .columns
                        .iter()
                        .position(|c| &c.name == column)
                        .ok_or_else(|| {
                            Error::schema(format!(
                                "column {column:?} does not exist in table {:?}",
                                update.table
                            ))
                        })?;
                    Ok((idx, table.columns[idx].data_type.coerce(literal)?))
                })
                .collect::<Result<Vec<(usize, Value)>>>()?;

            let mask = selection(table, update.where_clause.as_ref(), Fold::Running)?;
            self.check_update(table, &assignments, &mask)?;
            (assignments, mask)
        };

        let table = self.table_mut(&update.table)?;
        for (idx, value) in &assignments {
            let column = &mut table.columns[*idx];
            for row in mask.iter_ones() {
                column.set(row, value)?;
            }
        }
        let rows = mask.count_ones();
        debug!(table = %update.table, rows, "updated rows");
        Ok(rows)
    }

    /// Checks the rows an update would produce, before anything is written.
    fn check_update(&self, table: &Table, assignments: &[(usize, Value)], mask: &BitVec) -> Result<()> {
        if mask.not_any() {
            return Ok(());
        }
        let changed: HashSet<&str> = assignments
            .iter()
            .map(|(idx, _)| table.columns[*idx].name.as_str())
            .collect();

        // The row as it will be after the update.
        let new_row = |row: usize| -> Result<Vec<Value>> {
            let mut values = table.get_row(row).ok_or_else(|| {
                Error::schema(format!("row {row} is out of bounds in {:?}", table.name))
            })?;
            if mask[row] {
                for (idx, value) in assignments {
                    values[*idx] = value.clone();
                }
            }
            Ok(values)
        };
        let position = |name: &str| table.columns.iter().position(|c| c.name == name);

        if table.primary_key.iter().any(|pk| changed.contains(pk.as_str())) {
            let pk_positions = table
                .primary_key
                .iter()
                .filter_map(|pk| position(pk))
                .collect::<Vec<_>>();
            let keys = (0..table.row_count)
                .map(|row| {
                    let values = new_row(row)?;
                    Ok(pk_positions.iter().map(|&idx| values[idx].clone()).collect())
                })
                .collect::<Result<Vec<Vec<Value>>>>()?;
            self.check_primary_keys_distinct(table, keys)?;
        }

        let outgoing_changed = self
            .foreign_keys_from(&table.name)
            .any(|fk| fk.referencing_columns.iter().any(|c| changed.contains(c.as_str())));
        if outgoing_changed {
            for row in mask.iter_ones() {
                let values = new_row(row)?;
                self.check_outgoing_references(&table.name, |name| {
                    position(name).map(|idx| &values[idx])
                })?;
            }
        }

        for fk in self.foreign_keys_to(&table.name) {
            if !fk.referenced_columns.iter().any(|c| changed.contains(c.as_str())) {
                continue;
            }
            for row in mask.iter_ones() {
                let old = key_text(&table.tuple(&fk.referenced_columns, row)?);
                let values = new_row(row)?;
                let new = fk
                    .referenced_columns
                    .iter()
                    .filter_map(|c| position(c).map(|idx| values[idx].to_string()))
                    .collect::<Vec<_>>();
                if old != new && self.has_dependents(fk, &old)? {
                    return Err(Error::constraint(format!(
                        "row ({}) of {:?} is still referenced by foreign key {fk}",
                        old.join(", "),
                        table.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Applies `alter table` clauses in order.
    ///
    /// The statement is all or nothing: if a clause fails, the table and the
    /// foreign key list are restored to their state before the statement.
    fn alter_table(&mut self, alter: AlterTable) -> Result<()> {
        let AlterTable { table, actions } = alter;
        let saved_table = self.table(&table)?.clone();
        let saved_keys = self.foreign_keys.clone();
        let clauses = actions.len();

        let applied = actions
            .into_iter()
            .try_for_each(|action| self.apply_alter_action(&table, action));

        match applied {
            Ok(()) => {
                info!(table = %table, clauses, "altered table");
                Ok(())
            }
            Err(err) => {
                self.tables.insert(table, saved_table);
                self.foreign_keys = saved_keys;
                Err(err)
            }
        }
    }

    fn apply_alter_action(&mut self, table: &str, action: AlterAction) -> Result<()> {
        match action {
            AlterAction::AddColumn(def) => {
                debug!(table = %table, column = %def.name, data_type = %def.data_type, "adding column");
                self.table_mut(table)?.add_column(def.name, def.data_type)
            }
            AlterAction::DropColumn(column) => {
                self.check_column_droppable(self.table(table)?, &column)?;
                debug!(table = %table, column = %column, "dropping column");
                self.table_mut(table)?.remove_column(&column).map(drop)
            }
            AlterAction::AddForeignKey(fk) => {
                self.validate_foreign_key(&fk)?;
                debug!(foreign_key = %fk, "adding foreign key");
                self.foreign_keys.push(fk);
                Ok(())
            }
        }
    }

    /// Removes a table from the database by its name, together with every
    /// foreign key that mentions it on either side.
    ///
    /// # Errors
    /// Returns an error if the table does not exist.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(Error::schema(format!("table {name:?} does not exist")));
        }
        let before = self.foreign_keys.len();
        self.foreign_keys.retain(|fk| !fk.mentions_table(name));
        info!(table = %name, purged_foreign_keys = before - self.foreign_keys.len(), "dropped table");
        Ok(())
    }
}

/// Rows of `table` passing `where_clause`, or every row without one.
fn selection(table: &Table, where_clause: Option<&WherePattern>, fold: Fold) -> Result<BitVec> {
    match where_clause {
        Some(pattern) => pattern.matching_rows(table, fold),
        None => Ok(bitvec![1; table.row_count]),
    }
}
