use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

/// A property value captured for key extraction.
///
/// String values pass through to the wire untouched; every other variant
/// converts through its natural display form when the key string is built.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Text(String),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Null,
}

impl KeyValue {
    /// Converts the captured value into its wire-level key representation.
    pub fn into_key_string(self) -> String {
        match self {
            Self::Text(value) => value,
            Self::Integer(value) => value.to_string(),
            Self::Unsigned(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Timestamp(value) => value.to_rfc3339(),
            Self::Null => String::new(),
        }
    }
}

/// Conversion from a property reference into a [`KeyValue`].
///
/// Implemented for the property types that commonly serve as entity keys;
/// fields of other types are not key candidates.
pub trait AsKeyValue {
    fn as_key_value(&self) -> KeyValue;
}

impl AsKeyValue for String {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Text(self.clone())
    }
}

impl AsKeyValue for bool {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Bool(*self)
    }
}

impl AsKeyValue for Uuid {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Text(self.to_string())
    }
}

impl AsKeyValue for DateTime<Utc> {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Timestamp(*self)
    }
}

impl AsKeyValue for DateTime<FixedOffset> {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Timestamp(self.with_timezone(&Utc))
    }
}

impl AsKeyValue for NaiveDate {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Text(self.to_string())
    }
}

impl AsKeyValue for NaiveDateTime {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Text(self.to_string())
    }
}

impl<T: AsKeyValue> AsKeyValue for Option<T> {
    fn as_key_value(&self) -> KeyValue {
        match self {
            Some(value) => value.as_key_value(),
            None => KeyValue::Null,
        }
    }
}

macro_rules! signed_key_value {
    ($($ty:ty),*) => {
        $(impl AsKeyValue for $ty {
            fn as_key_value(&self) -> KeyValue {
                KeyValue::Integer(i64::from(*self))
            }
        })*
    };
}

macro_rules! unsigned_key_value {
    ($($ty:ty),*) => {
        $(impl AsKeyValue for $ty {
            fn as_key_value(&self) -> KeyValue {
                KeyValue::Unsigned(*self as u64)
            }
        })*
    };
}

signed_key_value!(i8, i16, i32, i64);
unsigned_key_value!(u8, u16, u32, u64, usize);

impl AsKeyValue for isize {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Integer(*self as i64)
    }
}

impl AsKeyValue for f32 {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Float(f64::from(*self))
    }
}

impl AsKeyValue for f64 {
    fn as_key_value(&self) -> KeyValue {
        KeyValue::Float(*self)
    }
}
