use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

///
/// EntityId
///
/// Opaque 64-bit row identity. `0` is the sentinel for "not yet persisted"
/// and drives the upsert insert-vs-update branch.
///

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct EntityId(i64);

impl EntityId {
    /// Sentinel identity of a record that has never been written.
    pub const UNSAVED: Self = Self(0);

    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns true while the record still carries the sentinel identity.
    #[must_use]
    pub const fn is_unsaved(self) -> bool {
        self.0 == 0
    }
}
