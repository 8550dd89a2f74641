use std::fmt::Write;

///
/// Order
/// One ORDER BY entry, rendered as `column ASC` / `column DESC`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    column: String,
    ascending: bool,
}

impl Order {
    fn render(&self) -> String {
        let direction = if self.ascending { "ASC" } else { "DESC" };
        format!("{} {}", self.column, direction)
    }
}

/// Ascending ORDER BY entry.
pub fn asc(column: impl Into<String>) -> Order {
    Order {
        column: column.into(),
        ascending: true,
    }
}

/// Descending ORDER BY entry.
pub fn desc(column: impl Into<String>) -> Order {
    Order {
        column: column.into(),
        ascending: false,
    }
}

/// `SELECT <cols> FROM <table> [WHERE <predicate>] [ORDER BY <ordering>]
/// [LIMIT <n>]`. A limit of zero or less means "no limit".
#[must_use]
pub fn select_sql(
    columns: &[String],
    table: &str,
    predicate: Option<&str>,
    order_by: &[Order],
    limit: i64,
) -> String {
    let mut sql = format!("SELECT {} FROM {table}", columns.join(","));

    if let Some(predicate) = predicate {
        let _ = write!(sql, " WHERE {predicate}");
    }
    if !order_by.is_empty() {
        let entries: Vec<String> = order_by.iter().map(Order::render).collect();
        let _ = write!(sql, " ORDER BY {}", entries.join(","));
    }
    if limit > 0 {
        let _ = write!(sql, " LIMIT {limit}");
    }

    sql
}

/// `INSERT INTO <table> (<cols>) VALUES (?1,...,?N)`.
#[must_use]
pub fn insert_sql(table: &str, columns: &[String]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|n| format!("?{n}")).collect();

    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(","),
        placeholders.join(",")
    )
}

/// Placeholder-parameterized UPDATE keyed by the identity column, which must
/// be `columns[0]` so that `?1` binds the identity. The trailing tuple
/// comparison guards against no-op writes.
#[must_use]
pub fn update_sql(table: &str, columns: &[String]) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(index, column)| format!("{column} = ?{}", index + 1))
        .collect();

    let identity = &columns[0];
    let mut sql = format!(
        "UPDATE {table} SET {} WHERE {identity} = ?1",
        assignments.join(", ")
    );

    if columns.len() > 1 {
        let rest = &columns[1..];
        let placeholders: Vec<String> = (2..=columns.len()).map(|n| format!("?{n}")).collect();
        let _ = write!(
            sql,
            " AND ({}) != ({})",
            rest.join(","),
            placeholders.join(",")
        );
    }

    sql
}

/// `DELETE FROM <table> [WHERE <predicate>]`.
#[must_use]
pub fn delete_sql(table: &str, predicate: Option<&str>) -> String {
    match predicate {
        Some(predicate) => format!("DELETE FROM {table} WHERE {predicate}"),
        None => format!("DELETE FROM {table}"),
    }
}
