//! Fixed-width text rendering of tables, query results and the whole catalog.
//!
//! The same text is shown in the terminal and written by `save`.

use std::fmt::Write;

use crate::database::{Database, Outcome, QueryResult};
use crate::table::Table;

/// Field width used when none is configured.
pub const DEFAULT_WIDTH: usize = 15;

fn push_line<S: AsRef<str>>(out: &mut String, fields: impl IntoIterator<Item = S>, width: usize) {
    out.push('|');
    for field in fields {
        let _ = write!(out, " {:<width$} |", field.as_ref());
    }
    out.push('\n');
}

fn push_grid(out: &mut String, columns: &[String], rows: impl Iterator<Item = Vec<String>>, width: usize) {
    push_line(out, columns, width);
    out.push('|');
    for _ in columns {
        out.push_str(&"-".repeat(width + 2));
        out.push('|');
    }
    out.push('\n');
    for row in rows {
        push_line(out, row, width);
    }
}

/// Renders one table: a title line, the header, a dash separator, then one
/// line per row.
///
/// # Example
/// ```
/// use oxyrel::Database;
/// use oxyrel::render::render_table;
///
/// let mut db = Database::new();
/// db.execute("create person ( id int primary key ( id ) )").unwrap();
/// db.execute("insert into person ( id ) values ( 7 )").unwrap();
///
/// let text = render_table(db.get_table("person").unwrap(), 4);
/// assert_eq!(text, "table person\n| id   |\n|------|\n| 7    |\n");
/// ```
pub fn render_table(table: &Table, width: usize) -> String {
    let mut out = format!("table {}\n", table.name);
    let rows = (0..table.row_count).map(|row| {
        table
            .columns
            .iter()
            .map(|col| col.get_string(row).unwrap_or_default())
            .collect()
    });
    push_grid(&mut out, &table.column_names(), rows, width);
    out
}

/// Renders a query result as a header, a separator and its rows.
pub fn render_result(result: &QueryResult, width: usize) -> String {
    let mut out = String::new();
    let rows = result
        .rows
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect());
    push_grid(&mut out, &result.columns, rows, width);
    out
}

/// Renders every table in name order, followed by the primary keys and the
/// foreign keys of the catalog.
pub fn render_snapshot(db: &Database, width: usize) -> String {
    let mut out = String::new();
    for name in db.list_tables() {
        if let Some(table) = db.get_table(name) {
            out.push_str(&render_table(table, width));
            out.push('\n');
        }
    }
    for name in db.list_tables() {
        if let Some(table) = db.get_table(name) {
            let _ = writeln!(out, "primary key {}({})", name, table.primary_key.join(", "));
        }
    }
    for fk in db.foreign_keys() {
        let _ = writeln!(out, "foreign key {fk}");
    }
    out
}

/// One-line report of a statement, or a grid for query rows.
pub fn render_outcome(outcome: &Outcome, width: usize) -> String {
    match outcome {
        Outcome::Created(table) => format!("created table {table}\n"),
        Outcome::Inserted(table) => format!("inserted 1 row into {table}\n"),
        Outcome::Rows(result) => render_result(result, width),
        Outcome::Updated { table, rows } => format!("updated {rows} row(s) in {table}\n"),
        Outcome::Altered(table) => format!("altered table {table}\n"),
        Outcome::Dropped(table) => format!("dropped table {table}\n"),
        Outcome::Loaded {
            path,
            succeeded,
            failed,
        } => format!(
            "loaded {}: {succeeded} statement(s) succeeded, {failed} failed\n",
            path.display()
        ),
        Outcome::Saved(path) => format!("saved to {}\n", path.display()),
        Outcome::Exit => String::new(),
    }
}
