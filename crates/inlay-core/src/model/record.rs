use crate::model::field::FieldDescriptor;
use std::any::Any;

///
/// RecordDescriptor
/// Macro-generated runtime model for one record type.
///

#[derive(Debug)]
pub struct RecordDescriptor {
    /// Fully-qualified Rust type path (for dispatch and diagnostics).
    pub path: &'static str,
    /// Default table name; overridable per call.
    pub table: &'static str,
    /// Index of the identity field in `fields`, when the type has one.
    pub identity: Option<usize>,
    /// Ordered field list (authoritative for slot order).
    pub fields: &'static [FieldDescriptor],
    /// Construct an empty instance for the mapper to populate.
    pub construct: fn() -> Box<dyn Any>,
    /// Optional hook run on the empty instance before population.
    pub preload: Option<fn(&mut dyn Any)>,
    /// Optional hook run on the fully populated instance.
    pub postload: Option<fn(&mut dyn Any)>,
}

impl RecordDescriptor {
    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The identity field's descriptor, when the type has one.
    #[must_use]
    pub fn identity_field(&self) -> Option<&'static FieldDescriptor> {
        self.identity.map(|index| &self.fields[index])
    }
}
