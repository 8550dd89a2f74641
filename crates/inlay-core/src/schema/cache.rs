use crate::{
    error::SchemaError,
    model::RecordDescriptor,
    schema::TableSchema,
    traits::Record,
};
use std::{
    collections::HashMap,
    ptr,
    sync::{Arc, LazyLock, RwLock},
};

// Keyed by descriptor address: descriptors are statics, one per type.
static CACHE: LazyLock<RwLock<HashMap<usize, Arc<TableSchema>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn key(descriptor: &'static RecordDescriptor) -> usize {
    ptr::from_ref(descriptor) as usize
}

fn read_cache() -> std::sync::RwLockReadGuard<'static, HashMap<usize, Arc<TableSchema>>> {
    CACHE.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn write_cache() -> std::sync::RwLockWriteGuard<'static, HashMap<usize, Arc<TableSchema>>> {
    CACHE.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// The shared schema for `T`, building and caching the default one on first
/// use. Construction is pure, so a racing rebuild is discarded and the first
/// inserted schema wins.
pub fn shared<T: Record>() -> Result<Arc<TableSchema>, SchemaError> {
    shared_for(T::descriptor())
}

pub(crate) fn shared_for(
    descriptor: &'static RecordDescriptor,
) -> Result<Arc<TableSchema>, SchemaError> {
    if let Some(schema) = read_cache().get(&key(descriptor)) {
        return Ok(schema.clone());
    }

    let schema = TableSchema::assemble(descriptor, descriptor.table.to_string(), &mut Vec::new())?;

    let mut cache = write_cache();
    Ok(cache
        .entry(key(descriptor))
        .or_insert_with(|| Arc::new(schema))
        .clone())
}

/// Seed the cache with a configured schema during the opt-in configuration
/// phase. Fails once the type's schema exists, because a schema already in
/// use must stay immutable.
pub fn install<T: Record>(schema: TableSchema) -> Result<(), SchemaError> {
    let descriptor = T::descriptor();
    if !ptr::eq(schema.descriptor(), descriptor) {
        return Err(SchemaError::TypeMismatch {
            schema_type: schema.descriptor().path,
            requested: descriptor.path,
        });
    }

    let mut cache = write_cache();
    if cache.contains_key(&key(descriptor)) {
        return Err(SchemaError::AlreadyBuilt {
            type_path: descriptor.path,
        });
    }
    cache.insert(key(descriptor), Arc::new(schema));
    Ok(())
}

/// Flattened column list of an embedded type: the installed schema when one
/// exists, otherwise a fresh default build. Intermediate builds are not
/// cached so embedding never forecloses a later `install`.
pub(crate) fn flattened_columns(
    descriptor: &'static RecordDescriptor,
    stack: &mut Vec<&'static str>,
) -> Result<Vec<String>, SchemaError> {
    if let Some(schema) = read_cache().get(&key(descriptor)) {
        return Ok(schema.columns().to_vec());
    }

    let schema = TableSchema::assemble(descriptor, descriptor.table.to_string(), stack)?;
    Ok(schema.columns)
}
