use crate::{
    model::{FieldKind, ScalarClass},
    schema::{Slot, TableSchema},
};
use std::fmt::Write;

/// SQLite storage class for a flat slot's column, when one is known.
/// Codec columns stay typeless (the codec owns the representation), as do
/// inlaid composite columns at the owner level.
#[must_use]
pub const fn storage_class(kind: FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::Text | FieldKind::Json => Some("TEXT"),
        FieldKind::Blob => Some("BLOB"),
        FieldKind::Scalar(ScalarClass::Integer | ScalarClass::Boolean) => Some("INTEGER"),
        FieldKind::Scalar(ScalarClass::Real) => Some("REAL"),
        FieldKind::Embed(_) | FieldKind::Codec => None,
    }
}

fn column_def(slot: &Slot, column: &str, identity: bool) -> String {
    if identity {
        return format!("{column} INTEGER PRIMARY KEY");
    }
    if slot.is_flat() {
        if let Some(class) = storage_class(slot.field().kind) {
            return format!("{column} {class}");
        }
    }
    column.to_string()
}

/// Render `CREATE TABLE` text for a schema: identity column first as
/// `INTEGER PRIMARY KEY`, flat columns with their storage class, inlaid
/// columns typeless.
#[must_use]
pub fn create_table_sql(schema: &TableSchema) -> String {
    let identity_column = schema
        .identity_slot()
        .and_then(Slot::primary_column)
        .map(ToString::to_string);

    let mut defs: Vec<String> = Vec::new();
    let mut emitted: Vec<&str> = Vec::new();

    for slot in schema.slots() {
        if slot.is_excluded() {
            continue;
        }
        for column in slot.columns() {
            if emitted.contains(&column.as_str()) {
                continue;
            }
            emitted.push(column.as_str());
            let identity = identity_column.as_deref() == Some(column.as_str());
            defs.push(column_def(slot, column, identity));
        }
    }

    format!("CREATE TABLE {} ({})", schema.table(), defs.join(", "))
}

/// Render `ALTER TABLE ... ADD` statements for every projected column missing
/// from `existing`.
#[must_use]
pub fn add_columns_sql(schema: &TableSchema, existing: &[&str]) -> String {
    let mut sql = String::new();
    let mut emitted: Vec<&str> = Vec::new();

    for slot in schema.slots() {
        if slot.is_excluded() {
            continue;
        }
        for column in slot.columns() {
            if existing.contains(&column.as_str()) || emitted.contains(&column.as_str()) {
                continue;
            }
            emitted.push(column.as_str());
            let def = column_def(slot, column, false);
            let _ = writeln!(sql, "ALTER TABLE {} ADD {def};", schema.table());
        }
    }

    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::person_descriptor;

    fn person_schema() -> TableSchema {
        TableSchema::assemble(
            person_descriptor(),
            "person".to_string(),
            &mut Vec::new(),
        )
        .expect("person schema should build")
    }

    #[test]
    fn create_table_marks_the_identity_and_classes() {
        let sql = create_table_sql(&person_schema());
        assert_eq!(
            sql,
            "CREATE TABLE person (id INTEGER PRIMARY KEY, given TEXT, age INTEGER, \
             city, zip, nickname TEXT, tags TEXT)"
        );
    }

    #[test]
    fn add_columns_emits_only_missing_columns() {
        let sql = add_columns_sql(&person_schema(), &["id", "given", "age", "city", "zip"]);
        assert_eq!(
            sql,
            "ALTER TABLE person ADD nickname TEXT;\nALTER TABLE person ADD tags TEXT;\n"
        );
    }
}
