use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// SqlValue
///
/// The execution backend's typed value union. Every column value crossing the
/// boundary in either direction is one of these five storage classes.
///
/// `Null` → the column holds SQL NULL (an absent field on the mapping side).
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns true if the value is SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        if let Self::Integer(v) = self { Some(*v) } else { None }
    }

    #[must_use]
    pub const fn as_real(&self) -> Option<f64> {
        if let Self::Real(v) = self { Some(*v) } else { None }
    }

    #[must_use]
    pub const fn as_text(&self) -> Option<&str> {
        if let Self::Text(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_blob(&self) -> Option<&[u8]> {
        if let Self::Blob(b) = self {
            Some(b.as_slice())
        } else {
            None
        }
    }

    /// Stable storage-class label used in diagnostics and decode errors.
    #[must_use]
    pub const fn class_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    /// Render the value as an inline SQL literal.
    ///
    /// Text is emitted double-quoted; the predicate layer's quote substitution
    /// rewrites it to the backend's single-quote literal syntax afterwards.
    #[must_use]
    pub fn literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(v) => v.to_string(),
            Self::Real(v) => v.to_string(),
            Self::Text(s) => format!("\"{s}\""),
            Self::Blob(b) => {
                let mut hex = String::with_capacity(b.len() * 2 + 3);
                hex.push_str("X'");
                for byte in b {
                    hex.push_str(&format!("{byte:02X}"));
                }
                hex.push('\'');
                hex
            }
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

macro_rules! impl_from_for {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for SqlValue {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for! {
    i8      => Integer,
    i16     => Integer,
    i32     => Integer,
    i64     => Integer,
    u8      => Integer,
    u16     => Integer,
    u32     => Integer,
    f32     => Real,
    f64     => Real,
    &str    => Text,
    String  => Text,
    Vec<u8> => Blob,
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<EntityId> for SqlValue {
    fn from(id: EntityId) -> Self {
        Self::Integer(id.get())
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<Self>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
