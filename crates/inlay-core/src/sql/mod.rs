//! SQL text assembly: statement builders, predicate rendering, and DDL.
//! Text only — statement preparation and execution live behind
//! [`Database`](crate::db::Database).

pub mod ddl;
pub mod predicate;
pub mod statement;

pub use predicate::Filter;
pub use statement::{Order, asc, desc};
