//! Hand-built fixtures mirroring the shape of derive-generated code, plus a
//! scripted database fake for adaptor tests.

use crate::{
    codec::{ColumnDecode, ColumnEncode, DecodeError},
    db::{Changes, Database, Row, RowStream},
    error::BoxError,
    map,
    model::{FieldDescriptor, FieldKind, FieldWrite, RecordDescriptor, ScalarClass},
    traits::{Entity, Record},
    types::EntityId,
    value::SqlValue,
};
use std::{any::Any, cell::RefCell, collections::VecDeque};

///
/// TestAddress
/// Embedded composite: two flat columns inlaid into the owner's table.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TestAddress {
    pub city: String,
    pub zip: i64,
}

fn address_mut(any: &mut dyn Any) -> Result<&mut TestAddress, DecodeError> {
    any.downcast_mut()
        .ok_or_else(|| DecodeError::message("instance is not a TestAddress"))
}

fn address_ref(any: &dyn Any) -> Result<&TestAddress, DecodeError> {
    any.downcast_ref()
        .ok_or_else(|| DecodeError::message("instance is not a TestAddress"))
}

fn address_construct() -> Box<dyn Any> {
    Box::new(TestAddress::default())
}

fn address_bind_city(any: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
    Ok(Some(address_ref(any)?.city.encode()))
}

fn address_assign_city(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let rec = address_mut(any)?;
    match write {
        FieldWrite::Absent => {}
        FieldWrite::Value(v) => rec.city = String::decode(v)?,
        _ => return Err(DecodeError::message("unsupported write for text field")),
    }
    Ok(())
}

fn address_bind_zip(any: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
    Ok(Some(address_ref(any)?.zip.encode()))
}

fn address_assign_zip(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let rec = address_mut(any)?;
    match write {
        FieldWrite::Absent => {}
        FieldWrite::Value(v) => rec.zip = i64::decode(v)?,
        _ => return Err(DecodeError::message("unsupported write for scalar field")),
    }
    Ok(())
}

pub(crate) fn address_descriptor() -> &'static RecordDescriptor {
    static FIELDS: [FieldDescriptor; 2] = [
        FieldDescriptor {
            name: "city",
            column: "city",
            optional: false,
            sealed: false,
            skip: false,
            kind: FieldKind::Text,
            bind: address_bind_city,
            assign: address_assign_city,
        },
        FieldDescriptor {
            name: "zip",
            column: "zip",
            optional: false,
            sealed: false,
            skip: false,
            kind: FieldKind::Scalar(ScalarClass::Integer),
            bind: address_bind_zip,
            assign: address_assign_zip,
        },
    ];
    static DESCRIPTOR: RecordDescriptor = RecordDescriptor {
        path: "test_support::TestAddress",
        table: "TestAddress",
        identity: None,
        fields: &FIELDS,
        construct: address_construct,
        preload: None,
        postload: None,
    };
    &DESCRIPTOR
}

impl Record for TestAddress {
    fn descriptor() -> &'static RecordDescriptor {
        address_descriptor()
    }
}

///
/// TestPerson
/// Flat fields, an inlaid composite, an optional field, and a JSON field.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TestPerson {
    pub id: EntityId,
    pub given: String,
    pub age: i64,
    pub address: TestAddress,
    pub nickname: Option<String>,
    pub tags: Vec<String>,
}

fn person_mut(any: &mut dyn Any) -> Result<&mut TestPerson, DecodeError> {
    any.downcast_mut()
        .ok_or_else(|| DecodeError::message("instance is not a TestPerson"))
}

fn person_ref(any: &dyn Any) -> Result<&TestPerson, DecodeError> {
    any.downcast_ref()
        .ok_or_else(|| DecodeError::message("instance is not a TestPerson"))
}

fn person_construct() -> Box<dyn Any> {
    Box::new(TestPerson::default())
}

fn person_bind_id(any: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
    Ok(Some(person_ref(any)?.id.encode()))
}

fn person_assign_id(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let rec = person_mut(any)?;
    match write {
        FieldWrite::Absent => {}
        FieldWrite::Value(v) => rec.id = EntityId::decode(v)?,
        _ => return Err(DecodeError::message("unsupported write for scalar field")),
    }
    Ok(())
}

fn person_bind_given(any: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
    Ok(Some(person_ref(any)?.given.encode()))
}

fn person_assign_given(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let rec = person_mut(any)?;
    match write {
        FieldWrite::Absent => {}
        FieldWrite::Value(v) => rec.given = String::decode(v)?,
        _ => return Err(DecodeError::message("unsupported write for text field")),
    }
    Ok(())
}

fn person_bind_age(any: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
    Ok(Some(person_ref(any)?.age.encode()))
}

fn person_assign_age(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let rec = person_mut(any)?;
    match write {
        FieldWrite::Absent => {}
        FieldWrite::Value(v) => rec.age = i64::decode(v)?,
        _ => return Err(DecodeError::message("unsupported write for scalar field")),
    }
    Ok(())
}

fn person_bind_address(_: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
    Ok(None)
}

fn person_assign_address(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let rec = person_mut(any)?;
    match write {
        FieldWrite::Absent => {}
        FieldWrite::Nested(boxed) => {
            let value = boxed
                .downcast::<TestAddress>()
                .map_err(|_| DecodeError::message("embedded value is not a TestAddress"))?;
            rec.address = *value;
        }
        _ => return Err(DecodeError::message("unsupported write for embedded field")),
    }
    Ok(())
}

fn person_bind_nickname(any: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
    Ok(Some(person_ref(any)?.nickname.encode()))
}

fn person_assign_nickname(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let rec = person_mut(any)?;
    match write {
        FieldWrite::Absent => rec.nickname = None,
        FieldWrite::Value(v) => rec.nickname = Some(String::decode(v)?),
        _ => return Err(DecodeError::message("unsupported write for text field")),
    }
    Ok(())
}

fn person_bind_tags(any: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
    let rec = person_ref(any)?;
    serde_json::to_string(&rec.tags)
        .map(|json| Some(SqlValue::Text(json)))
        .map_err(|err| DecodeError::message(format!("cannot encode JSON field: {err}")))
}

fn person_assign_tags(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let rec = person_mut(any)?;
    match write {
        FieldWrite::Absent => {}
        FieldWrite::Json(v) => rec.tags = map::decode_json(v)?,
        _ => return Err(DecodeError::message("unsupported write for JSON field")),
    }
    Ok(())
}

pub(crate) fn person_descriptor() -> &'static RecordDescriptor {
    static FIELDS: [FieldDescriptor; 6] = [
        FieldDescriptor {
            name: "id",
            column: "id",
            optional: false,
            sealed: false,
            skip: false,
            kind: FieldKind::Scalar(ScalarClass::Integer),
            bind: person_bind_id,
            assign: person_assign_id,
        },
        FieldDescriptor {
            name: "given",
            column: "given",
            optional: false,
            sealed: false,
            skip: false,
            kind: FieldKind::Text,
            bind: person_bind_given,
            assign: person_assign_given,
        },
        FieldDescriptor {
            name: "age",
            column: "age",
            optional: false,
            sealed: false,
            skip: false,
            kind: FieldKind::Scalar(ScalarClass::Integer),
            bind: person_bind_age,
            assign: person_assign_age,
        },
        FieldDescriptor {
            name: "address",
            column: "address",
            optional: false,
            sealed: false,
            skip: false,
            kind: FieldKind::Embed(address_descriptor),
            bind: person_bind_address,
            assign: person_assign_address,
        },
        FieldDescriptor {
            name: "nickname",
            column: "nickname",
            optional: true,
            sealed: false,
            skip: false,
            kind: FieldKind::Text,
            bind: person_bind_nickname,
            assign: person_assign_nickname,
        },
        FieldDescriptor {
            name: "tags",
            column: "tags",
            optional: false,
            sealed: false,
            skip: false,
            kind: FieldKind::Json,
            bind: person_bind_tags,
            assign: person_assign_tags,
        },
    ];
    static DESCRIPTOR: RecordDescriptor = RecordDescriptor {
        path: "test_support::TestPerson",
        table: "person",
        identity: Some(0),
        fields: &FIELDS,
        construct: person_construct,
        preload: None,
        postload: None,
    };
    &DESCRIPTOR
}

impl Record for TestPerson {
    fn descriptor() -> &'static RecordDescriptor {
        person_descriptor()
    }
}

impl Entity for TestPerson {
    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

///
/// TestStamp
/// Exercises the lifecycle hooks and a sealed field.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Memo(pub String);

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct TestStamp {
    pub note: String,
    pub seen: bool,
    pub memo: Memo,
}

fn stamp_mut(any: &mut dyn Any) -> Result<&mut TestStamp, DecodeError> {
    any.downcast_mut()
        .ok_or_else(|| DecodeError::message("instance is not a TestStamp"))
}

fn stamp_construct() -> Box<dyn Any> {
    Box::new(TestStamp::default())
}

fn stamp_preload(any: &mut dyn Any) {
    if let Some(rec) = any.downcast_mut::<TestStamp>() {
        rec.note = "preloaded".to_string();
    }
}

fn stamp_postload(any: &mut dyn Any) {
    if let Some(rec) = any.downcast_mut::<TestStamp>() {
        rec.seen = true;
    }
}

fn stamp_bind_none(_: &dyn Any) -> Result<Option<SqlValue>, DecodeError> {
    Ok(None)
}

fn stamp_assign_note(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let rec = stamp_mut(any)?;
    match write {
        FieldWrite::Absent => {}
        FieldWrite::Value(v) => rec.note = String::decode(v)?,
        _ => return Err(DecodeError::message("unsupported write for text field")),
    }
    Ok(())
}

fn stamp_assign_seen(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let rec = stamp_mut(any)?;
    match write {
        FieldWrite::Absent => {}
        FieldWrite::Value(v) => rec.seen = bool::decode(v)?,
        _ => return Err(DecodeError::message("unsupported write for scalar field")),
    }
    Ok(())
}

fn stamp_assign_memo(any: &mut dyn Any, write: FieldWrite) -> Result<(), DecodeError> {
    let _ = stamp_mut(any)?;
    match write {
        FieldWrite::Absent => Ok(()),
        _ => Err(DecodeError::message(
            "sealed field cannot decode a raw column value",
        )),
    }
}

pub(crate) fn stamp_descriptor() -> &'static RecordDescriptor {
    static FIELDS: [FieldDescriptor; 3] = [
        FieldDescriptor {
            name: "note",
            column: "note",
            optional: false,
            sealed: false,
            skip: false,
            kind: FieldKind::Text,
            bind: stamp_bind_none,
            assign: stamp_assign_note,
        },
        FieldDescriptor {
            name: "seen",
            column: "seen",
            optional: false,
            sealed: false,
            skip: false,
            kind: FieldKind::Scalar(ScalarClass::Boolean),
            bind: stamp_bind_none,
            assign: stamp_assign_seen,
        },
        FieldDescriptor {
            name: "memo",
            column: "memo",
            optional: false,
            sealed: true,
            skip: false,
            kind: FieldKind::Json,
            bind: stamp_bind_none,
            assign: stamp_assign_memo,
        },
    ];
    static DESCRIPTOR: RecordDescriptor = RecordDescriptor {
        path: "test_support::TestStamp",
        table: "stamp",
        identity: None,
        fields: &FIELDS,
        construct: stamp_construct,
        preload: Some(stamp_preload),
        postload: Some(stamp_postload),
    };
    &DESCRIPTOR
}

impl Record for TestStamp {
    fn descriptor() -> &'static RecordDescriptor {
        stamp_descriptor()
    }
}

///
/// TestRow
/// Named-column row literal for mapper tests.
///

#[derive(Clone, Debug)]
pub(crate) struct TestRow {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl TestRow {
    pub fn new(pairs: &[(&str, SqlValue)]) -> Self {
        Self {
            columns: pairs.iter().map(|(name, _)| (*name).to_string()).collect(),
            values: pairs.iter().map(|(_, value)| value.clone()).collect(),
        }
    }

    pub fn set(&mut self, column: &str, value: SqlValue) {
        if let Some(index) = self.columns.iter().position(|c| c == column) {
            self.values[index] = value;
        } else {
            self.columns.push(column.to_string());
            self.values.push(value);
        }
    }
}

impl Row for TestRow {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn value(&self, ordinal: usize) -> Option<&SqlValue> {
        self.values.get(ordinal)
    }

    fn value_named(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|index| self.values.get(index))
    }
}

///
/// RecordingDb
///
/// Scripted database fake: captures every statement and its parameters, and
/// replays a queued response per call.
///

pub(crate) enum Script {
    Rows(Vec<TestRow>),
    Changes(Changes),
    Fail(&'static str),
}

#[derive(Default)]
pub(crate) struct RecordingDb {
    pub calls: RefCell<Vec<(String, Vec<SqlValue>)>>,
    scripts: RefCell<VecDeque<Script>>,
}

impl RecordingDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, script: Script) {
        self.scripts.borrow_mut().push_back(script);
    }

    pub fn last_call(&self) -> (String, Vec<SqlValue>) {
        self.calls.borrow().last().cloned().expect("no call recorded")
    }

    fn next_script(&self) -> Option<Script> {
        self.scripts.borrow_mut().pop_front()
    }
}

impl Database for RecordingDb {
    fn batch(&self, sql: &str) -> Result<(), BoxError> {
        self.calls.borrow_mut().push((sql.to_string(), Vec::new()));
        match self.next_script() {
            Some(Script::Fail(message)) => Err(message.into()),
            _ => Ok(()),
        }
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<Changes, BoxError> {
        self.calls
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));
        match self.next_script() {
            Some(Script::Changes(changes)) => Ok(changes),
            Some(Script::Fail(message)) => Err(message.into()),
            Some(Script::Rows(_)) | None => Ok(Changes::default()),
        }
    }

    fn rows<'a>(&'a self, sql: &str, params: &[SqlValue]) -> Result<RowStream<'a>, BoxError> {
        self.calls
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));
        match self.next_script() {
            Some(Script::Rows(rows)) => Ok(Box::new(
                rows.into_iter()
                    .map(|row| Ok(Box::new(row) as Box<dyn Row>)),
            )),
            Some(Script::Fail(message)) => Err(message.into()),
            Some(Script::Changes(_)) | None => Ok(Box::new(std::iter::empty())),
        }
    }
}
