//! Inlay: schema-mapped records over a SQL execution backend.
//!
//! Per-type field metadata (generated by `#[derive(Record)]`) drives a
//! deterministic, duplicate-free column projection, parameterized statement
//! text, and a type-directed decode cascade that rebuilds typed records from
//! result rows. Nested composite fields are inlaid — flattened into the
//! owning table's column list — instead of joined.
//!
//! ```no_run
//! use inlay::prelude::*;
//!
//! #[derive(Debug, Default, Record)]
//! #[record(table = "person")]
//! struct Person {
//!     id: EntityId,
//!     given: String,
//!     family: String,
//!     age: i64,
//! }
//!
//! fn demo(adaptor: &Adaptor<impl inlay::db::Database>) {
//!     let adults: Vec<Person> =
//!         adaptor.select(None, Some(&Filter::new("age >= ?", [18])), &[asc("age")], 0);
//!     let _ = adults;
//! }
//! ```

// The derive emits `::inlay::...` paths; keep these module names aligned with
// `inlay-core`.
pub use inlay_core::{adaptor, codec, db, error, map, model, schema, sql, traits, types, value};

pub use inlay_derive::Record;

pub mod prelude {
    pub use crate::Record;
    pub use inlay_core::prelude::*;
}
