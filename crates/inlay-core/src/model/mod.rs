//! Static runtime models produced by the `Record` derive. One descriptor per
//! record type, built at compile time; no runtime reflection.

mod field;
mod record;

pub use field::{FieldDescriptor, FieldKind, FieldWrite, ScalarClass};
pub use record::RecordDescriptor;
