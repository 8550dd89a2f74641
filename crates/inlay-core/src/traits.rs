use crate::{model::RecordDescriptor, types::EntityId};

///
/// Record
///
/// A mappable composite type: anything with a static descriptor can be
/// materialized from a result row, including types embedded inside others.
/// Implemented by `#[derive(Record)]`; the derive requires `Default` for the
/// empty-instance constructor.
///

pub trait Record: Sized + 'static {
    /// The statically registered descriptor for this type.
    fn descriptor() -> &'static RecordDescriptor;
}

///
/// Entity
///
/// A record with a row identity, eligible for the write operations. The
/// derive emits this impl when the struct carries an `id: EntityId` field.
///

pub trait Entity: Record {
    fn id(&self) -> EntityId;

    fn set_id(&mut self, id: EntityId);
}
