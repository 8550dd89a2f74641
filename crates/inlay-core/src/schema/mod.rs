//! Table schemas: the ordered slot list and deduplicated column projection
//! derived from a record type's static descriptor.

mod cache;

pub use cache::{install, shared};
pub(crate) use cache::shared_for;

use crate::{
    error::SchemaError,
    model::{FieldDescriptor, FieldKind, RecordDescriptor},
    traits::Record,
};

///
/// Slot
///
/// The mapping unit between one record field and its database columns.
/// An empty column list means the field is excluded from both paths; more
/// than one column means the field is an inlaid composite.
///

#[derive(Clone, Debug)]
pub struct Slot {
    name: &'static str,
    columns: Vec<String>,
    ordinal: Option<usize>,
    duplicate: bool,
    field: &'static FieldDescriptor,
}

impl Slot {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Excluded fields are skipped on both read and write paths.
    #[must_use]
    pub const fn is_excluded(&self) -> bool {
        self.columns.is_empty()
    }

    /// Single-column slots are the only ones that participate in writes.
    #[must_use]
    pub const fn is_flat(&self) -> bool {
        self.columns.len() == 1
    }

    /// The column the mapper reads this field from.
    #[must_use]
    pub fn primary_column(&self) -> Option<&str> {
        self.columns.first().map(String::as_str)
    }

    /// Projection index of the primary column (diagnostics only; reads go by
    /// name because embedded projections dedupe against the owner).
    #[must_use]
    pub const fn ordinal(&self) -> Option<usize> {
        self.ordinal
    }

    /// True when an earlier slot already projected this slot's primary column.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        self.duplicate
    }

    #[must_use]
    pub const fn field(&self) -> &'static FieldDescriptor {
        self.field
    }
}

///
/// TableSchema
///
/// Ordered slots for exactly one record type and one table, plus the cached
/// duplicate-free column projection. Immutable once a query has used it; the
/// `exclude`/`derive` mutators belong to the pre-query configuration phase.
///

#[derive(Clone, Debug)]
pub struct TableSchema {
    table: String,
    descriptor: &'static RecordDescriptor,
    slots: Vec<Slot>,
    columns: Vec<String>,
}

impl TableSchema {
    /// Build the default schema for `T` against its default table name.
    pub fn build<T: Record>() -> Result<Self, SchemaError> {
        let descriptor = T::descriptor();
        Self::assemble(descriptor, descriptor.table.to_string(), &mut Vec::new())
    }

    /// Build the default schema for `T` against an explicit table name.
    pub fn named<T: Record>(table: impl Into<String>) -> Result<Self, SchemaError> {
        Self::assemble(T::descriptor(), table.into(), &mut Vec::new())
    }

    pub(crate) fn assemble(
        descriptor: &'static RecordDescriptor,
        table: String,
        stack: &mut Vec<&'static str>,
    ) -> Result<Self, SchemaError> {
        if stack.contains(&descriptor.path) {
            let mut path = stack.join(" -> ");
            path.push_str(" -> ");
            path.push_str(descriptor.path);
            return Err(SchemaError::CyclicEmbedding { path });
        }
        stack.push(descriptor.path);

        let mut slots = Vec::with_capacity(descriptor.fields.len());
        for field in descriptor.fields {
            let columns = if field.skip {
                Vec::new()
            } else if let FieldKind::Embed(nested) = field.kind {
                cache::flattened_columns(nested(), stack)?
            } else {
                vec![field.column.to_string()]
            };

            slots.push(Slot {
                name: field.name,
                columns,
                ordinal: None,
                duplicate: false,
                field,
            });
        }
        stack.pop();

        let mut schema = Self {
            table,
            descriptor,
            slots,
            columns: Vec::new(),
        };
        schema.update_columns();
        Ok(schema)
    }

    /// Recompute the projection and every slot's ordinal/duplicate marks.
    fn update_columns(&mut self) {
        let mut columns: Vec<String> = Vec::new();

        for slot in &mut self.slots {
            slot.ordinal = None;
            slot.duplicate = false;

            for (index, column) in slot.columns.iter().enumerate() {
                let existing = columns.iter().position(|c| c == column);
                if index == 0 {
                    if let Some(ordinal) = existing {
                        slot.ordinal = Some(ordinal);
                        slot.duplicate = true;
                    } else {
                        slot.ordinal = Some(columns.len());
                        columns.push(column.clone());
                    }
                } else if existing.is_none() {
                    columns.push(column.clone());
                }
            }
        }

        self.columns = columns;
    }

    /// The duplicate-free projection, in first-occurrence order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn descriptor(&self) -> &'static RecordDescriptor {
        self.descriptor
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Look up a slot by field name.
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    /// The identity field's slot, when the type has one.
    #[must_use]
    pub fn identity_slot(&self) -> Option<&Slot> {
        self.descriptor.identity.map(|index| &self.slots[index])
    }

    /// Clear the named fields' column lists so they are never fetched or
    /// written. Idempotent.
    pub fn exclude(mut self, fields: &[&str]) -> Result<Self, SchemaError> {
        for name in fields {
            let slot = self.slot_mut(name)?;
            slot.columns.clear();
        }
        self.update_columns();
        Ok(self)
    }

    /// Override a field's column list explicitly (renamed or computed
    /// mappings, including two fields sharing one source column).
    pub fn derive(mut self, field: &str, columns: &[&str]) -> Result<Self, SchemaError> {
        let slot = self.slot_mut(field)?;
        slot.columns = columns.iter().map(ToString::to_string).collect();
        self.update_columns();
        Ok(self)
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut Slot, SchemaError> {
        let type_path = self.descriptor.path;
        self.slots
            .iter_mut()
            .find(|slot| slot.name == name)
            .ok_or_else(|| SchemaError::UnknownField {
                type_path,
                field: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{address_descriptor, person_descriptor};
    use crate::{
        codec::DecodeError,
        model::{FieldWrite, ScalarClass},
        value::SqlValue,
    };
    use std::any::Any;

    fn person_schema() -> TableSchema {
        TableSchema::assemble(
            person_descriptor(),
            person_descriptor().table.to_string(),
            &mut Vec::new(),
        )
        .expect("person schema should build")
    }

    #[test]
    fn projection_flattens_embedded_columns_in_slot_order() {
        let schema = person_schema();
        assert_eq!(
            schema.columns(),
            ["id", "given", "age", "city", "zip", "nickname", "tags"]
        );
    }

    #[test]
    fn projection_contains_each_column_exactly_once() {
        let schema = person_schema()
            .derive("nickname", &["given"])
            .expect("derive should accept a known field");

        assert_eq!(schema.columns(), ["id", "given", "age", "city", "zip", "tags"]);

        let nickname = schema.slot("nickname").unwrap();
        assert!(nickname.is_duplicate());
        assert_eq!(nickname.ordinal(), Some(1));
        assert_eq!(schema.slot("given").unwrap().ordinal(), Some(1));
    }

    #[test]
    fn exclusion_empties_the_slot_and_the_projection() {
        let schema = person_schema()
            .exclude(&["age", "tags"])
            .expect("exclude should accept known fields");

        assert!(schema.slot("age").unwrap().is_excluded());
        assert_eq!(schema.columns(), ["id", "given", "city", "zip", "nickname"]);

        // idempotent
        let schema = schema.exclude(&["age"]).unwrap();
        assert_eq!(schema.columns(), ["id", "given", "city", "zip", "nickname"]);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = person_schema().exclude(&["nope"]).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownField { field, .. } if field == "nope"));
    }

    #[test]
    fn embedded_slot_is_multi_column_and_write_excluded() {
        let schema = person_schema();
        let address = schema.slot("address").unwrap();
        assert_eq!(address.columns(), ["city", "zip"]);
        assert!(!address.is_flat());
        assert_eq!(address.primary_column(), Some("city"));
    }

    #[test]
    fn identity_slot_resolves_through_the_descriptor() {
        let schema = person_schema();
        assert_eq!(schema.identity_slot().unwrap().name(), "id");
        let address = TableSchema::assemble(
            address_descriptor(),
            "address".to_string(),
            &mut Vec::new(),
        )
        .unwrap();
        assert!(address.identity_slot().is_none());
    }

    // Two hand-built descriptors that embed each other; schema construction
    // must fail instead of recursing forever.
    mod cyclic {
        use super::*;
        use crate::model::{FieldDescriptor, FieldKind, RecordDescriptor};

        fn construct() -> Box<dyn Any> {
            Box::new(())
        }

        fn bind(_: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
            Ok(None)
        }

        fn assign(_: &mut dyn Any, _: FieldWrite) -> Result<(), DecodeError> {
            Ok(())
        }

        fn node_descriptor() -> &'static RecordDescriptor {
            static FIELDS: [FieldDescriptor; 2] = [
                FieldDescriptor {
                    name: "label",
                    column: "label",
                    optional: false,
                    sealed: false,
                    skip: false,
                    kind: FieldKind::Text,
                    bind,
                    assign,
                },
                FieldDescriptor {
                    name: "next",
                    column: "next",
                    optional: false,
                    sealed: false,
                    skip: false,
                    kind: FieldKind::Embed(hop_descriptor),
                    bind,
                    assign,
                },
            ];
            static DESCRIPTOR: RecordDescriptor = RecordDescriptor {
                path: "cyclic::Node",
                table: "Node",
                identity: None,
                fields: &FIELDS,
                construct,
                preload: None,
                postload: None,
            };
            &DESCRIPTOR
        }

        fn hop_descriptor() -> &'static RecordDescriptor {
            static FIELDS: [FieldDescriptor; 1] = [FieldDescriptor {
                name: "back",
                column: "back",
                optional: false,
                sealed: false,
                skip: false,
                kind: FieldKind::Embed(node_descriptor),
                bind,
                assign,
            }];
            static DESCRIPTOR: RecordDescriptor = RecordDescriptor {
                path: "cyclic::Hop",
                table: "Hop",
                identity: None,
                fields: &FIELDS,
                construct,
                preload: None,
                postload: None,
            };
            &DESCRIPTOR
        }

        #[test]
        fn transitive_self_embedding_fails_at_construction() {
            let err = TableSchema::assemble(
                node_descriptor(),
                "Node".to_string(),
                &mut Vec::new(),
            )
            .unwrap_err();

            let SchemaError::CyclicEmbedding { path } = err else {
                panic!("expected CyclicEmbedding, got {err:?}");
            };
            assert_eq!(path, "cyclic::Node -> cyclic::Hop -> cyclic::Node");
        }
    }

    // Arbitrary column-name overlap, flat and nested, must never produce a
    // duplicate in the projection.
    mod properties {
        use super::*;
        use crate::model::{FieldDescriptor, FieldKind, RecordDescriptor};
        use proptest::prelude::*;
        use std::collections::HashSet;

        fn noop_construct() -> Box<dyn Any> {
            Box::new(())
        }

        fn noop_bind(_: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
            Ok(None)
        }

        fn noop_assign(_: &mut dyn Any, _: FieldWrite) -> Result<(), DecodeError> {
            Ok(())
        }

        fn leaked_fields(columns: &[String], prefix: &str) -> Vec<FieldDescriptor> {
            columns
                .iter()
                .enumerate()
                .map(|(index, column)| FieldDescriptor {
                    name: Box::leak(format!("{prefix}{index}").into_boxed_str()),
                    column: Box::leak(column.clone().into_boxed_str()),
                    optional: false,
                    sealed: false,
                    skip: false,
                    kind: FieldKind::Text,
                    bind: noop_bind,
                    assign: noop_assign,
                })
                .collect()
        }

        fn leaked_descriptor(
            path: String,
            fields: Vec<FieldDescriptor>,
        ) -> &'static RecordDescriptor {
            Box::leak(Box::new(RecordDescriptor {
                path: Box::leak(path.into_boxed_str()),
                table: "prop",
                identity: None,
                fields: Box::leak(fields.into_boxed_slice()),
                construct: noop_construct,
                preload: None,
                postload: None,
            }))
        }

        fn stable_dedup(names: impl IntoIterator<Item = String>) -> Vec<String> {
            let mut out: Vec<String> = Vec::new();
            for name in names {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
            out
        }

        fn column_names() -> impl Strategy<Value = Vec<String>> {
            proptest::collection::vec("[a-d]", 1..8)
        }

        proptest! {
            #[test]
            fn projection_is_duplicate_free_in_first_occurrence_order(
                outer_head in column_names(),
                inner in column_names(),
                outer_tail in column_names(),
            ) {
                let leaf = leaked_descriptor(
                    format!("prop::Leaf_{inner:?}_{outer_head:?}"),
                    leaked_fields(&inner, "leaf"),
                );

                let mut fields = leaked_fields(&outer_head, "head");
                fields.push(FieldDescriptor {
                    name: "nested",
                    column: "nested",
                    optional: false,
                    sealed: false,
                    skip: false,
                    kind: FieldKind::Text,
                    bind: noop_bind,
                    assign: noop_assign,
                });
                let embed_index = fields.len() - 1;
                fields.extend(leaked_fields(&outer_tail, "tail"));

                // Splice the leaf's flattened projection into the owner the
                // same way `assemble` resolves an embedded field.
                let mut schema = TableSchema::assemble(
                    leaked_descriptor(
                        format!("prop::Owner_{outer_head:?}_{inner:?}_{outer_tail:?}"),
                        fields,
                    ),
                    "prop".to_string(),
                    &mut Vec::new(),
                )
                .unwrap();
                let leaf_schema =
                    TableSchema::assemble(leaf, "leaf".to_string(), &mut Vec::new()).unwrap();
                let leaf_columns: Vec<&str> =
                    leaf_schema.columns().iter().map(String::as_str).collect();
                let nested_name = schema.slots()[embed_index].name();
                schema = schema.derive(nested_name, &leaf_columns).unwrap();

                let columns = schema.columns();

                let mut seen = HashSet::new();
                for column in columns {
                    prop_assert!(seen.insert(column.clone()), "duplicate column {column}");
                }

                let expected = stable_dedup(
                    outer_head
                        .iter()
                        .chain(inner.iter())
                        .chain(outer_tail.iter())
                        .cloned(),
                );
                prop_assert_eq!(columns.to_vec(), expected);
            }
        }
    }

    #[test]
    fn scalar_class_refines_integer_slots() {
        let schema = person_schema();
        let age = schema.slot("age").unwrap().field();
        assert!(matches!(
            age.kind,
            crate::model::FieldKind::Scalar(ScalarClass::Integer)
        ));
    }
}
