use crate::{types::EntityId, value::SqlValue};
use thiserror::Error as ThisError;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

///
/// DecodeError
///
/// Failure to convert one raw column value into a typed field value.
/// Always surfaced wrapped in [`Error::Deserialize`](crate::error::Error)
/// together with the offending column name.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DecodeError {
    #[error("expected {expected}, got {got}")]
    Unexpected {
        expected: &'static str,
        got: &'static str,
    },

    #[error("value out of range for {target}")]
    OutOfRange { target: &'static str },

    #[error("column missing from result row")]
    MissingColumn,

    #[error("{0}")]
    Message(String),
}

impl DecodeError {
    /// Construct an `Unexpected` error against the given raw value.
    #[must_use]
    pub const fn unexpected(expected: &'static str, got: &SqlValue) -> Self {
        Self::Unexpected {
            expected,
            got: got.class_name(),
        }
    }

    /// Construct a free-form decode error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

///
/// ColumnEncode
///
/// A value that can be bound as a single statement parameter.
///

pub trait ColumnEncode {
    fn encode(&self) -> SqlValue;
}

///
/// ColumnDecode
///
/// A value that can be rebuilt from a single raw column value. Custom
/// implementations are the type-specific leg of the decode cascade; the
/// built-in implementations below are the native scalar fallback.
///

pub trait ColumnDecode: Sized {
    fn decode(value: &SqlValue) -> Result<Self, DecodeError>;
}

macro_rules! impl_integer_codec {
    ( $( $type:ty ),* $(,)? ) => {
        $(
            impl ColumnEncode for $type {
                fn encode(&self) -> SqlValue {
                    SqlValue::Integer(i64::from(*self))
                }
            }

            impl ColumnDecode for $type {
                fn decode(value: &SqlValue) -> Result<Self, DecodeError> {
                    let raw = value
                        .as_integer()
                        .ok_or(DecodeError::unexpected("integer", value))?;

                    Self::try_from(raw).map_err(|_| DecodeError::OutOfRange {
                        target: stringify!($type),
                    })
                }
            }
        )*
    };
}

impl_integer_codec!(i8, i16, i32, i64, u8, u16, u32);

impl ColumnEncode for f64 {
    fn encode(&self) -> SqlValue {
        SqlValue::Real(*self)
    }
}

impl ColumnDecode for f64 {
    fn decode(value: &SqlValue) -> Result<Self, DecodeError> {
        match value {
            SqlValue::Real(v) => Ok(*v),
            // Integer-affinity columns are legal sources for float fields.
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Integer(v) => Ok(*v as Self),
            _ => Err(DecodeError::unexpected("real", value)),
        }
    }
}

impl ColumnEncode for f32 {
    fn encode(&self) -> SqlValue {
        SqlValue::Real(f64::from(*self))
    }
}

impl ColumnDecode for f32 {
    fn decode(value: &SqlValue) -> Result<Self, DecodeError> {
        #[allow(clippy::cast_possible_truncation)]
        let narrowed = f64::decode(value).map(|v| v as Self);
        narrowed
    }
}

impl ColumnEncode for bool {
    fn encode(&self) -> SqlValue {
        SqlValue::Integer(i64::from(*self))
    }
}

impl ColumnDecode for bool {
    fn decode(value: &SqlValue) -> Result<Self, DecodeError> {
        value
            .as_integer()
            .map(|v| v != 0)
            .ok_or(DecodeError::unexpected("integer", value))
    }
}

impl ColumnEncode for String {
    fn encode(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl ColumnDecode for String {
    fn decode(value: &SqlValue) -> Result<Self, DecodeError> {
        value
            .as_text()
            .map(ToString::to_string)
            .ok_or(DecodeError::unexpected("text", value))
    }
}

impl ColumnEncode for Vec<u8> {
    fn encode(&self) -> SqlValue {
        SqlValue::Blob(self.clone())
    }
}

impl ColumnDecode for Vec<u8> {
    fn decode(value: &SqlValue) -> Result<Self, DecodeError> {
        match value {
            SqlValue::Blob(b) => Ok(b.clone()),
            // Text-affinity columns round-trip as raw bytes.
            SqlValue::Text(s) => Ok(s.clone().into_bytes()),
            _ => Err(DecodeError::unexpected("blob", value)),
        }
    }
}

impl ColumnEncode for EntityId {
    fn encode(&self) -> SqlValue {
        SqlValue::Integer(self.get())
    }
}

impl ColumnDecode for EntityId {
    fn decode(value: &SqlValue) -> Result<Self, DecodeError> {
        value
            .as_integer()
            .map(Self::new)
            .ok_or(DecodeError::unexpected("integer", value))
    }
}

// Timestamps persist as unix seconds; RFC 3339 text is accepted on read so
// hand-written seed scripts can use readable literals.
impl ColumnEncode for OffsetDateTime {
    fn encode(&self) -> SqlValue {
        SqlValue::Integer(self.unix_timestamp())
    }
}

impl ColumnDecode for OffsetDateTime {
    fn decode(value: &SqlValue) -> Result<Self, DecodeError> {
        match value {
            SqlValue::Integer(secs) => Self::from_unix_timestamp(*secs)
                .map_err(|_| DecodeError::OutOfRange { target: "timestamp" }),
            SqlValue::Text(s) => Self::parse(s, &Rfc3339)
                .map_err(|err| DecodeError::message(format!("invalid timestamp text: {err}"))),
            _ => Err(DecodeError::unexpected("integer", value)),
        }
    }
}

impl<T> ColumnEncode for Option<T>
where
    T: ColumnEncode,
{
    fn encode(&self) -> SqlValue {
        self.as_ref().map_or(SqlValue::Null, ColumnEncode::encode)
    }
}

impl<T> ColumnDecode for Option<T>
where
    T: ColumnDecode,
{
    fn decode(value: &SqlValue) -> Result<Self, DecodeError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::decode(value).map(Some)
        }
    }
}
