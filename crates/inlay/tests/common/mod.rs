//! A tiny in-memory table store that executes the rigid statement shapes the
//! engine generates. Enough SQL to drive end-to-end round-trips; nothing
//! more.

use inlay::db::{Changes, Database, Row, RowStream};
use inlay::error::BoxError;
use inlay::value::SqlValue;
use std::{cell::RefCell, cmp::Ordering, collections::HashMap};

type StoredRow = HashMap<String, SqlValue>;

#[derive(Default)]
struct Table {
    rows: Vec<StoredRow>,
    next_id: i64,
}

#[derive(Default)]
pub struct MiniDb {
    tables: RefCell<HashMap<String, Table>>,
}

impl MiniDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .borrow()
            .get(table)
            .map_or(0, |table| table.rows.len())
    }
}

pub struct MiniRow {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row for MiniRow {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn value(&self, ordinal: usize) -> Option<&SqlValue> {
        self.values.get(ordinal)
    }

    fn value_named(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|index| self.values.get(index))
    }
}

fn parse_err(sql: &str) -> BoxError {
    format!("MiniDb cannot parse: {sql}").into()
}

/// Evaluate a `col op rhs` predicate against one row. `rhs` is either `?N`,
/// an integer literal, or a single-quoted text literal.
fn matches(row: &StoredRow, predicate: &str, params: &[SqlValue]) -> bool {
    let tokens: Vec<&str> = predicate.split_whitespace().collect();
    let [column, op, rhs] = tokens.as_slice() else {
        return false;
    };

    let rhs = if let Some(number) = rhs.strip_prefix('?') {
        let Ok(index) = number.parse::<usize>() else {
            return false;
        };
        params.get(index - 1).cloned().unwrap_or(SqlValue::Null)
    } else if let Ok(int) = rhs.parse::<i64>() {
        SqlValue::Integer(int)
    } else {
        SqlValue::Text(rhs.trim_matches('\'').to_string())
    };

    let lhs = row.get(*column).cloned().unwrap_or(SqlValue::Null);
    let ord = compare(&lhs, &rhs);

    match *op {
        "=" | "==" => ord == Some(Ordering::Equal),
        "!=" => ord.is_some() && ord != Some(Ordering::Equal),
        "<" => ord == Some(Ordering::Less),
        ">" => ord == Some(Ordering::Greater),
        "<=" => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        ">=" => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        _ => false,
    }
}

fn compare(a: &SqlValue, b: &SqlValue) -> Option<Ordering> {
    match (a, b) {
        (SqlValue::Integer(x), SqlValue::Integer(y)) => Some(x.cmp(y)),
        (SqlValue::Real(x), SqlValue::Real(y)) => x.partial_cmp(y),
        (SqlValue::Text(x), SqlValue::Text(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

struct SelectParts<'a> {
    columns: Vec<&'a str>,
    table: &'a str,
    predicate: Option<&'a str>,
    order_by: Vec<(&'a str, bool)>,
    limit: Option<usize>,
}

fn parse_select(sql: &str) -> Option<SelectParts<'_>> {
    let rest = sql.strip_prefix("SELECT ")?;
    let (columns, rest) = rest.split_once(" FROM ")?;

    let mut table = rest;
    let mut predicate = None;
    let mut order = "";
    let mut limit = None;

    let mut tail = rest;
    if let Some((head, lim)) = tail.split_once(" LIMIT ") {
        tail = head;
        limit = Some(lim.parse().ok()?);
        table = head;
    }
    if let Some((head, ord)) = tail.split_once(" ORDER BY ") {
        tail = head;
        order = ord;
        table = head;
    }
    if let Some((head, pred)) = tail.split_once(" WHERE ") {
        predicate = Some(pred);
        table = head;
    }

    let order_by = if order.is_empty() {
        Vec::new()
    } else {
        order
            .split(',')
            .map(|entry| {
                let entry = entry.trim();
                entry.strip_suffix(" DESC").map_or_else(
                    || (entry.strip_suffix(" ASC").unwrap_or(entry), true),
                    |column| (column, false),
                )
            })
            .collect()
    };

    Some(SelectParts {
        columns: columns.split(',').collect(),
        table,
        predicate,
        order_by,
        limit,
    })
}

impl Database for MiniDb {
    fn batch(&self, sql: &str) -> Result<(), BoxError> {
        // only CREATE TABLE statements matter; anything else is a no-op
        for statement in sql.split(';') {
            let statement = statement.trim();
            if let Some(rest) = statement.strip_prefix("CREATE TABLE ") {
                let name = rest.split(&[' ', '(']).next().unwrap_or_default();
                self.tables
                    .borrow_mut()
                    .entry(name.to_string())
                    .or_default();
            }
        }
        Ok(())
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Changes, BoxError> {
        if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            let (table_name, rest) = rest.split_once(" (").ok_or_else(|| parse_err(sql))?;
            let (columns, _) = rest.split_once(')').ok_or_else(|| parse_err(sql))?;

            let mut tables = self.tables.borrow_mut();
            let table = tables.entry(table_name.to_string()).or_default();

            let mut row = StoredRow::new();
            let mut generated = None;
            for (index, column) in columns.split(',').enumerate() {
                let mut value = params.get(index).cloned().unwrap_or(SqlValue::Null);
                if column == "id" && value.is_null() {
                    table.next_id += 1;
                    generated = Some(table.next_id);
                    value = SqlValue::Integer(table.next_id);
                } else if column == "id" {
                    if let SqlValue::Integer(id) = &value {
                        generated = Some(*id);
                        table.next_id = table.next_id.max(*id);
                    }
                }
                row.insert(column.to_string(), value);
            }
            table.rows.push(row);

            return Ok(Changes {
                rows_affected: 1,
                last_insert_id: generated,
            });
        }

        if let Some(rest) = sql.strip_prefix("UPDATE ") {
            let (table_name, rest) = rest.split_once(" SET ").ok_or_else(|| parse_err(sql))?;
            let (assignments, predicate) =
                rest.split_once(" WHERE ").ok_or_else(|| parse_err(sql))?;
            let key = predicate.split(" AND ").next().ok_or_else(|| parse_err(sql))?;

            let assignments: Vec<(&str, usize)> = assignments
                .split(", ")
                .map(|entry| {
                    let (column, placeholder) =
                        entry.split_once(" = ?").ok_or_else(|| parse_err(sql))?;
                    let index: usize =
                        placeholder.parse().map_err(|_| parse_err(sql))?;
                    Ok((column, index - 1))
                })
                .collect::<Result<_, BoxError>>()?;

            let mut tables = self.tables.borrow_mut();
            let table = tables.entry(table_name.to_string()).or_default();

            let mut affected = 0;
            for row in &mut table.rows {
                if !matches(row, key, params) {
                    continue;
                }
                // the generated statement guards against no-op writes
                let changed = assignments.iter().any(|(column, index)| {
                    row.get(*column) != params.get(*index)
                });
                if !changed {
                    continue;
                }
                for (column, index) in &assignments {
                    let value = params.get(*index).cloned().unwrap_or(SqlValue::Null);
                    row.insert((*column).to_string(), value);
                }
                affected += 1;
            }

            return Ok(Changes {
                rows_affected: affected,
                last_insert_id: None,
            });
        }

        if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            let (table_name, predicate) = match rest.split_once(" WHERE ") {
                Some((table_name, predicate)) => (table_name, Some(predicate)),
                None => (rest, None),
            };

            let mut tables = self.tables.borrow_mut();
            let table = tables.entry(table_name.to_string()).or_default();

            let before = table.rows.len();
            match predicate {
                Some(predicate) => table.rows.retain(|row| !matches(row, predicate, params)),
                None => table.rows.clear(),
            }

            return Ok(Changes {
                rows_affected: (before - table.rows.len()) as u64,
                last_insert_id: None,
            });
        }

        Err(parse_err(sql))
    }

    fn rows<'a>(&'a self, sql: &str, params: &[SqlValue]) -> Result<RowStream<'a>, BoxError> {
        let parts = parse_select(sql).ok_or_else(|| parse_err(sql))?;

        let tables = self.tables.borrow();
        let mut selected: Vec<StoredRow> = tables
            .get(parts.table)
            .map(|table| {
                table
                    .rows
                    .iter()
                    .filter(|row| {
                        parts
                            .predicate
                            .is_none_or(|predicate| matches(row, predicate, params))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        for (column, ascending) in parts.order_by.iter().rev() {
            selected.sort_by(|a, b| {
                let lhs = a.get(*column).cloned().unwrap_or(SqlValue::Null);
                let rhs = b.get(*column).cloned().unwrap_or(SqlValue::Null);
                let ord = compare(&lhs, &rhs).unwrap_or(Ordering::Equal);
                if *ascending { ord } else { ord.reverse() }
            });
        }

        if let Some(limit) = parts.limit {
            selected.truncate(limit);
        }

        let columns: Vec<String> = parts.columns.iter().map(ToString::to_string).collect();
        let rows: Vec<MiniRow> = selected
            .into_iter()
            .map(|row| MiniRow {
                values: columns
                    .iter()
                    .map(|column| row.get(column).cloned().unwrap_or(SqlValue::Null))
                    .collect(),
                columns: columns.clone(),
            })
            .collect();

        Ok(Box::new(
            rows.into_iter().map(|row| Ok(Box::new(row) as Box<dyn Row>)),
        ))
    }
}
