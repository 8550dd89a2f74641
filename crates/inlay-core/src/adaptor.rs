//! The public façade: composes schemas, statement text, and the row mapper
//! with the execution backend. One statement per call, rows decoded as the
//! backend yields them.

use crate::{
    codec::ColumnDecode,
    db::Database,
    error::{Error, SchemaError},
    map,
    schema::{self, Slot, TableSchema},
    sql::{
        predicate::Filter,
        statement::{self, Order},
    },
    traits::{Entity, Record},
    types::EntityId,
    value::SqlValue,
};
use std::{fs, path::Path};
use tracing::warn;

///
/// Adaptor
///
/// An explicit value owned by the caller; there is no process-wide default.
/// Read operations come in a throwing `try_*` form and a non-throwing form
/// that logs and returns an absent result. Write operations always throw.
///

pub struct Adaptor<D: Database> {
    db: D,
    log_errors: bool,
}

impl<D: Database> Adaptor<D> {
    pub const fn new(db: D) -> Self {
        Self {
            db,
            log_errors: true,
        }
    }

    /// Silence the non-throwing forms' logging.
    #[must_use]
    pub const fn with_log_errors(mut self, log_errors: bool) -> Self {
        self.log_errors = log_errors;
        self
    }

    #[must_use]
    pub const fn database(&self) -> &D {
        &self.db
    }

    fn log(&self, err: &Error) {
        if self.log_errors {
            warn!(error = %err, "operation failed");
        }
    }

    ///
    /// RAW EXECUTION
    ///

    /// Execute a parameter-free SQL batch (schema setup, seed data).
    pub fn batch(&self, sql: &str) -> Result<(), Error> {
        self.db.batch(sql).map_err(Error::execution)
    }

    /// Execute the contents of a SQL file as a batch.
    pub fn batch_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let sql = fs::read_to_string(path).map_err(Error::execution)?;
        self.batch(&sql)
    }

    ///
    /// READS
    ///

    /// Fetch and decode the first matching row, or `None` if nothing matched.
    pub fn try_first<T: Record>(
        &self,
        table: Option<&str>,
        filter: Option<&Filter>,
        order_by: &[Order],
    ) -> Result<Option<T>, Error> {
        let schema = schema::shared::<T>()?;
        self.try_first_with(&schema, table, filter, order_by)
    }

    /// Non-throwing form of [`try_first`](Self::try_first).
    pub fn first<T: Record>(
        &self,
        table: Option<&str>,
        filter: Option<&Filter>,
        order_by: &[Order],
    ) -> Option<T> {
        self.try_first(table, filter, order_by)
            .unwrap_or_else(|err| {
                self.log(&err);
                None
            })
    }

    /// Like [`try_first`](Self::try_first) but a missing row is an error.
    pub fn require_first<T: Record>(
        &self,
        table: Option<&str>,
        filter: Option<&Filter>,
        order_by: &[Order],
    ) -> Result<T, Error> {
        let schema = schema::shared::<T>()?;
        let table_name = table.unwrap_or_else(|| schema.table()).to_string();
        self.try_first_with(&schema, table, filter, order_by)?
            .ok_or(Error::NotFound { table: table_name })
    }

    /// [`try_first`](Self::try_first) against an explicitly configured schema.
    pub fn try_first_with<T: Record>(
        &self,
        schema: &TableSchema,
        table: Option<&str>,
        filter: Option<&Filter>,
        order_by: &[Order],
    ) -> Result<Option<T>, Error> {
        let mut records = self.run_select::<T>(schema, table, filter, order_by, 1)?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    /// Fetch and decode every matching row in row order. A limit of zero or
    /// less means unlimited.
    pub fn try_select<T: Record>(
        &self,
        table: Option<&str>,
        filter: Option<&Filter>,
        order_by: &[Order],
        limit: i64,
    ) -> Result<Vec<T>, Error> {
        let schema = schema::shared::<T>()?;
        self.run_select(&schema, table, filter, order_by, limit)
    }

    /// Non-throwing form of [`try_select`](Self::try_select).
    pub fn select<T: Record>(
        &self,
        table: Option<&str>,
        filter: Option<&Filter>,
        order_by: &[Order],
        limit: i64,
    ) -> Vec<T> {
        self.try_select(table, filter, order_by, limit)
            .unwrap_or_else(|err| {
                self.log(&err);
                Vec::new()
            })
    }

    /// [`try_select`](Self::try_select) against an explicitly configured
    /// schema.
    pub fn try_select_with<T: Record>(
        &self,
        schema: &TableSchema,
        table: Option<&str>,
        filter: Option<&Filter>,
        order_by: &[Order],
        limit: i64,
    ) -> Result<Vec<T>, Error> {
        self.run_select(schema, table, filter, order_by, limit)
    }

    fn run_select<T: Record>(
        &self,
        schema: &TableSchema,
        table: Option<&str>,
        filter: Option<&Filter>,
        order_by: &[Order],
        limit: i64,
    ) -> Result<Vec<T>, Error> {
        let table = table.unwrap_or_else(|| schema.table());
        let (predicate, params) = render_filter(filter);
        let sql = statement::select_sql(schema.columns(), table, predicate.as_deref(), order_by, limit);

        let rows = self.db.rows(&sql, &params).map_err(Error::execution)?;
        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(Error::execution)?;
            records.push(map::create::<T>(schema, row.as_ref())?);
        }
        Ok(records)
    }

    ///
    /// SINGLE-COLUMN READS
    ///

    /// Fetch one projected column and decode the first row's value.
    pub fn try_first_value<V: ColumnDecode>(
        &self,
        column: &str,
        table: &str,
        filter: Option<&Filter>,
        order_by: &[Order],
    ) -> Result<Option<V>, Error> {
        let mut values = self.run_select_values(column, table, filter, order_by, 1)?;
        Ok(if values.is_empty() {
            None
        } else {
            Some(values.swap_remove(0))
        })
    }

    /// Non-throwing form of [`try_first_value`](Self::try_first_value).
    pub fn first_value<V: ColumnDecode>(
        &self,
        column: &str,
        table: &str,
        filter: Option<&Filter>,
        order_by: &[Order],
    ) -> Option<V> {
        self.try_first_value(column, table, filter, order_by)
            .unwrap_or_else(|err| {
                self.log(&err);
                None
            })
    }

    /// Fetch one projected column and decode every row's value.
    pub fn try_select_values<V: ColumnDecode>(
        &self,
        column: &str,
        table: &str,
        filter: Option<&Filter>,
        order_by: &[Order],
        limit: i64,
    ) -> Result<Vec<V>, Error> {
        self.run_select_values(column, table, filter, order_by, limit)
    }

    /// Non-throwing form of [`try_select_values`](Self::try_select_values).
    pub fn select_values<V: ColumnDecode>(
        &self,
        column: &str,
        table: &str,
        filter: Option<&Filter>,
        order_by: &[Order],
        limit: i64,
    ) -> Vec<V> {
        self.try_select_values(column, table, filter, order_by, limit)
            .unwrap_or_else(|err| {
                self.log(&err);
                Vec::new()
            })
    }

    fn run_select_values<V: ColumnDecode>(
        &self,
        column: &str,
        table: &str,
        filter: Option<&Filter>,
        order_by: &[Order],
        limit: i64,
    ) -> Result<Vec<V>, Error> {
        let (predicate, params) = render_filter(filter);
        let columns = [column.to_string()];
        let sql = statement::select_sql(&columns, table, predicate.as_deref(), order_by, limit);

        let rows = self.db.rows(&sql, &params).map_err(Error::execution)?;
        let mut values = Vec::new();
        for row in rows {
            let row = row.map_err(Error::execution)?;
            let raw = row.value(0).ok_or_else(|| {
                Error::deserialize(table, column, crate::codec::DecodeError::MissingColumn)
            })?;
            values.push(V::decode(raw).map_err(|err| Error::deserialize(table, column, err))?);
        }
        Ok(values)
    }

    ///
    /// WRITES
    ///

    /// Insert the record's flat fields; returns the generated row identity,
    /// falling back to the record's own when the backend reports none.
    pub fn insert<T: Entity>(&self, record: &T) -> Result<EntityId, Error> {
        let schema = schema::shared::<T>()?;
        let (columns, mut values) = columns_and_values(&schema, record)?;
        if record.id().is_unsaved() {
            // let the backend assign a fresh row id
            values[0] = SqlValue::Null;
        }

        let sql = statement::insert_sql(schema.table(), &columns);
        let changes = self.db.execute(&sql, &values).map_err(Error::execution)?;
        Ok(changes.last_insert_id.map_or_else(|| record.id(), EntityId::new))
    }

    /// Update the record's row, keyed by identity; returns rows changed.
    pub fn update<T: Entity>(&self, record: &T) -> Result<u64, Error> {
        let schema = schema::shared::<T>()?;
        let (columns, values) = columns_and_values(&schema, record)?;

        let sql = statement::update_sql(schema.table(), &columns);
        let changes = self.db.execute(&sql, &values).map_err(Error::execution)?;
        Ok(changes.rows_affected)
    }

    /// Insert when the identity is the sentinel, writing the generated
    /// identity back into the record; update otherwise. The only operation
    /// that mutates its input.
    pub fn upsert<T: Entity>(&self, record: &mut T) -> Result<(), Error> {
        if record.id().is_unsaved() {
            let id = self.insert(&*record)?;
            record.set_id(id);
        } else {
            self.update(&*record)?;
        }
        Ok(())
    }

    /// Delete the record's row by identity; returns rows changed.
    pub fn delete<T: Entity>(&self, record: &T) -> Result<u64, Error> {
        let schema = schema::shared::<T>()?;
        let identity = identity_column(&schema)?;

        let predicate = format!("{identity} = ?1");
        let sql = statement::delete_sql(schema.table(), Some(&predicate));
        let changes = self
            .db
            .execute(&sql, &[record.id().into()])
            .map_err(Error::execution)?;
        Ok(changes.rows_affected)
    }

    /// Delete every row of the type's table. Requires explicit confirmation.
    pub fn delete_all<T: Entity>(&self, confirm: bool) -> Result<u64, Error> {
        let schema = schema::shared::<T>()?;
        if !confirm {
            return Err(Error::UnconfirmedDelete {
                table: schema.table().to_string(),
            });
        }

        let sql = statement::delete_sql(schema.table(), None);
        let changes = self.db.execute(&sql, &[]).map_err(Error::execution)?;
        Ok(changes.rows_affected)
    }

    /// Delete every row matching the filter; returns rows changed.
    pub fn delete_where<T: Entity>(&self, filter: &Filter) -> Result<u64, Error> {
        let schema = schema::shared::<T>()?;
        let (predicate, params) = filter.render(1);

        let sql = statement::delete_sql(schema.table(), Some(&predicate));
        let changes = self.db.execute(&sql, &params).map_err(Error::execution)?;
        Ok(changes.rows_affected)
    }
}

fn render_filter(filter: Option<&Filter>) -> (Option<String>, Vec<SqlValue>) {
    filter.map_or((None, Vec::new()), |f| {
        let (sql, params) = f.render(1);
        (Some(sql), params)
    })
}

fn identity_column(schema: &TableSchema) -> Result<String, Error> {
    schema
        .identity_slot()
        .and_then(|slot| slot.primary_column())
        .map(ToString::to_string)
        .ok_or_else(|| {
            SchemaError::UnknownField {
                type_path: schema.descriptor().path,
                field: "id".to_string(),
            }
            .into()
        })
}

/// Derive the write tuple from the record's flat slots: identity first (so
/// `?1` binds it), then every non-excluded single-column slot in order.
/// Inlaid composites and non-bindable fields do not participate in writes.
fn columns_and_values<T: Entity>(
    schema: &TableSchema,
    record: &T,
) -> Result<(Vec<String>, Vec<SqlValue>), Error> {
    let identity = identity_column(schema)?;
    let identity_name = schema.identity_slot().map(Slot::name);

    let mut columns = vec![identity];
    let mut values = vec![record.id().into()];

    for slot in schema.slots() {
        if Some(slot.name()) == identity_name || !slot.is_flat() {
            continue;
        }
        let bound = (slot.field().bind)(record).map_err(|err| {
            Error::deserialize(schema.table(), slot.primary_column().unwrap_or(""), err)
        })?;
        let Some(value) = bound else {
            continue;
        };
        columns.push(slot.columns()[0].clone());
        values.push(value);
    }

    Ok((columns, values))
}
