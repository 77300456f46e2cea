use std::fmt::{self, Display};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

/// Zero value of timestamp fields: `0001-01-01 00:00:00`.
pub const ZERO_TIMESTAMP: PrimitiveDateTime = match Date::from_calendar_date(1, Month::January, 1) {
    Ok(date) => PrimitiveDateTime::new(date, Time::MIDNIGHT),
    Err(..) => panic!("year 1 is a valid calendar date"),
};

/// Wire level value exchanged with the executor.
///
/// Results are always one of the six wire kinds (or `Null`). `UInt64` only shows up on
/// the argument side, for unsigned fields and pagination bounds that do not fit an `i64`.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Varchar(String),
    Blob(Vec<u8>),
    Timestamp(PrimitiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the wire kind, used in conversion errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(..) => "bool",
            Value::Int64(..) => "i64",
            Value::UInt64(..) => "u64",
            Value::Float64(..) => "f64",
            Value::Varchar(..) => "string",
            Value::Blob(..) => "bytes",
            Value::Timestamp(..) => "timestamp",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Varchar(v) => write!(f, "{v:?}"),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
            Value::Timestamp(v) => write!(f, "{v}"),
        }
    }
}

/// Declared shape of a record field, as far as the mapping layer cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Int,
    UInt,
    Float,
    Bool,
    Text,
    Bytes,
    Timestamp,
    Nullable,
    Other,
}

impl FieldKind {
    /// Primary keys must be integers or strings.
    pub fn is_key_compatible(&self) -> bool {
        matches!(self, FieldKind::Int | FieldKind::UInt | FieldKind::Text)
    }
}

/// Types that can be sent as query arguments and tested for their zero value.
pub trait AsValue {
    const KIND: FieldKind;
    fn as_value(&self) -> Value;
    fn is_zero(&self) -> bool;
}

macro_rules! impl_as_value {
    ($kind:ident, $variant:ident, $($source:ty),+ $(,)?) => {
        $(impl AsValue for $source {
            const KIND: FieldKind = FieldKind::$kind;
            fn as_value(&self) -> Value {
                Value::$variant((*self).into())
            }
            fn is_zero(&self) -> bool {
                *self == Default::default()
            }
        })+
    };
}
impl_as_value!(Int, Int64, i8, i16, i32, i64);
impl_as_value!(UInt, Int64, u8, u16, u32);
impl_as_value!(Float, Float64, f32, f64);
impl_as_value!(Bool, Boolean, bool);

impl AsValue for isize {
    const KIND: FieldKind = FieldKind::Int;
    fn as_value(&self) -> Value {
        Value::Int64(*self as i64)
    }
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl AsValue for u64 {
    const KIND: FieldKind = FieldKind::UInt;
    fn as_value(&self) -> Value {
        match i64::try_from(*self) {
            Ok(v) => Value::Int64(v),
            Err(..) => Value::UInt64(*self),
        }
    }
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl AsValue for usize {
    const KIND: FieldKind = FieldKind::UInt;
    fn as_value(&self) -> Value {
        (*self as u64).as_value()
    }
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl AsValue for String {
    const KIND: FieldKind = FieldKind::Text;
    fn as_value(&self) -> Value {
        Value::Varchar(self.clone())
    }
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl AsValue for &str {
    const KIND: FieldKind = FieldKind::Text;
    fn as_value(&self) -> Value {
        Value::Varchar((*self).to_owned())
    }
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl AsValue for Vec<u8> {
    const KIND: FieldKind = FieldKind::Bytes;
    fn as_value(&self) -> Value {
        Value::Blob(self.clone())
    }
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl AsValue for &[u8] {
    const KIND: FieldKind = FieldKind::Bytes;
    fn as_value(&self) -> Value {
        Value::Blob(self.to_vec())
    }
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl AsValue for PrimitiveDateTime {
    const KIND: FieldKind = FieldKind::Timestamp;
    fn as_value(&self) -> Value {
        Value::Timestamp(*self)
    }
    fn is_zero(&self) -> bool {
        *self == ZERO_TIMESTAMP
    }
}

impl AsValue for OffsetDateTime {
    const KIND: FieldKind = FieldKind::Timestamp;
    fn as_value(&self) -> Value {
        let utc = self.to_offset(time::UtcOffset::UTC);
        Value::Timestamp(PrimitiveDateTime::new(utc.date(), utc.time()))
    }
    fn is_zero(&self) -> bool {
        *self == ZERO_TIMESTAMP.assume_utc()
    }
}

impl<T: AsValue> AsValue for Option<T> {
    const KIND: FieldKind = FieldKind::Nullable;
    fn as_value(&self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T: AsValue> AsValue for Box<T> {
    const KIND: FieldKind = T::KIND;
    fn as_value(&self) -> Value {
        (**self).as_value()
    }
    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }
}

impl AsValue for Value {
    const KIND: FieldKind = FieldKind::Other;
    fn as_value(&self) -> Value {
        self.clone()
    }
    fn is_zero(&self) -> bool {
        self.is_null()
    }
}
