//! Row materialization: the type-directed decode cascade that rebuilds one
//! typed record from one result row, recursing through inlaid composites.

use crate::{
    codec::DecodeError,
    db::Row,
    error::{Error, SchemaError},
    model::{FieldKind, FieldWrite},
    schema::{self, TableSchema},
    traits::Record,
    value::SqlValue,
};
use serde::de::DeserializeOwned;
use std::{any::Any, ptr};

/// Materialize one `T` from a result row using the given schema.
pub fn create<T: Record>(schema: &TableSchema, row: &dyn Row) -> Result<T, Error> {
    if !ptr::eq(schema.descriptor(), T::descriptor()) {
        return Err(SchemaError::TypeMismatch {
            schema_type: schema.descriptor().path,
            requested: T::descriptor().path,
        }
        .into());
    }

    let instance = create_dyn(schema, row)?;
    instance.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        SchemaError::TypeMismatch {
            schema_type: schema.descriptor().path,
            requested: T::descriptor().path,
        }
        .into()
    })
}

/// Untyped materialization core, shared with inlaid-composite recursion.
///
/// Builds an empty instance, runs the pre-populate hook, walks the slots in
/// order applying the decode cascade, then runs the post-populate hook. Any
/// decode failure abandons the whole row; no partial record escapes.
pub(crate) fn create_dyn(schema: &TableSchema, row: &dyn Row) -> Result<Box<dyn Any>, Error> {
    let descriptor = schema.descriptor();

    let mut instance = (descriptor.construct)();
    if let Some(preload) = descriptor.preload {
        preload(instance.as_mut());
    }

    for slot in schema.slots() {
        let Some(column) = slot.primary_column() else {
            continue;
        };
        let field = slot.field();

        let raw = row
            .value_named(column)
            .ok_or_else(|| Error::deserialize(schema.table(), column, DecodeError::MissingColumn))?;

        let write = if raw.is_null() {
            FieldWrite::Absent
        } else {
            match field.kind {
                FieldKind::Embed(nested) => {
                    let nested_schema = schema::shared_for(nested())?;
                    FieldWrite::Nested(create_dyn(&nested_schema, row)?)
                }
                FieldKind::Json if !field.sealed => FieldWrite::Json(raw),
                _ => FieldWrite::Value(raw),
            }
        };

        (field.assign)(instance.as_mut(), write)
            .map_err(|err| Error::deserialize(schema.table(), column, err))?;
    }

    if let Some(postload) = descriptor.postload {
        postload(instance.as_mut());
    }

    Ok(instance)
}

/// Encode a field value as a JSON text column payload.
pub fn encode_json<T: serde::Serialize>(value: &T) -> Result<SqlValue, DecodeError> {
    serde_json::to_string(value)
        .map(SqlValue::Text)
        .map_err(|err| DecodeError::message(format!("cannot encode JSON field: {err}")))
}

/// Decode a JSON column payload into a field value. Text and blob values are
/// parsed as JSON documents; integer and real values pass through as JSON
/// numbers so numeric columns stay readable by JSON-typed fields.
pub fn decode_json<T: DeserializeOwned>(value: &SqlValue) -> Result<T, DecodeError> {
    let parsed = match value {
        SqlValue::Text(s) => serde_json::from_str(s),
        SqlValue::Blob(b) => serde_json::from_slice(b),
        SqlValue::Integer(v) => serde_json::from_value(serde_json::Value::from(*v)),
        SqlValue::Real(v) => serde_json::from_value(serde_json::Value::from(*v)),
        SqlValue::Null => return Err(DecodeError::unexpected("json payload", value)),
    };

    parsed.map_err(|err| DecodeError::message(format!("invalid JSON payload: {err}")))
}
