use crate::{OrmError, Result, Value, ZERO_TIMESTAMP};
use std::{any::type_name, fmt::Display, str::FromStr};
use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

/// Text form of timestamps parsed from strings, the fraction of second is optional.
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);
const WHOLE_SECONDS_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const SUBSECOND_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");

/// Typed place a column value is written into.
///
/// Implemented for the primitive types, strings, byte vectors, timestamps, `Option<T>`
/// (the nullable wrapper, allocated on the first non null write) and `Box<T>`. Newtypes
/// can implement it by exposing the slot of their inner value, and [`ZeroValue`] to be
/// usable inside `Option`.
pub trait Destination {
    fn slot(&mut self) -> Slot<'_>;
    fn set_zero(&mut self);
    fn type_name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Concrete shape of a [`Destination`].
pub enum Slot<'a> {
    I8(&'a mut i8),
    I16(&'a mut i16),
    I32(&'a mut i32),
    I64(&'a mut i64),
    Isize(&'a mut isize),
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    U64(&'a mut u64),
    Usize(&'a mut usize),
    F32(&'a mut f32),
    F64(&'a mut f64),
    Bool(&'a mut bool),
    Text(&'a mut String),
    Bytes(&'a mut Vec<u8>),
    Timestamp(&'a mut PrimitiveDateTime),
    TimestampTz(&'a mut OffsetDateTime),
    /// Raw value, stored as received.
    Value(&'a mut Value),
    Nullable(&'a mut dyn Nullable),
    Unsupported,
}

/// Destination that can hold a null.
pub trait Nullable {
    fn set_null(&mut self);
    /// Runs `write` on the inner destination, allocating it if missing. A freshly
    /// allocated inner value is kept only if `write` succeeds.
    fn write(&mut self, write: &mut dyn FnMut(&mut dyn Destination) -> Result<()>)
    -> Result<()>;
}

macro_rules! impl_destination {
    ($($variant:ident $ty:ty),+ $(,)?) => {
        $(impl Destination for $ty {
            fn slot(&mut self) -> Slot<'_> {
                Slot::$variant(self)
            }
            fn set_zero(&mut self) {
                *self = Default::default();
            }
        })+
    };
}
impl_destination!(
    I8 i8, I16 i16, I32 i32, I64 i64, Isize isize,
    U8 u8, U16 u16, U32 u32, U64 u64, Usize usize,
    F32 f32, F64 f64, Bool bool,
    Text String, Bytes Vec<u8>, Value Value,
);

/// Value a nullable destination starts from before its first non null write.
pub trait ZeroValue {
    fn zero_value() -> Self;
}

macro_rules! impl_zero_value {
    ($($ty:ty),+ $(,)?) => {
        $(impl ZeroValue for $ty {
            fn zero_value() -> Self {
                Default::default()
            }
        })+
    };
}
impl_zero_value!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, String, Vec<u8>, Value,
);

impl ZeroValue for PrimitiveDateTime {
    fn zero_value() -> Self {
        ZERO_TIMESTAMP
    }
}

impl ZeroValue for OffsetDateTime {
    fn zero_value() -> Self {
        ZERO_TIMESTAMP.assume_utc()
    }
}

impl<T: ZeroValue> ZeroValue for Box<T> {
    fn zero_value() -> Self {
        Box::new(T::zero_value())
    }
}

impl Destination for PrimitiveDateTime {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Timestamp(self)
    }
    fn set_zero(&mut self) {
        *self = ZERO_TIMESTAMP;
    }
}

impl Destination for OffsetDateTime {
    fn slot(&mut self) -> Slot<'_> {
        Slot::TimestampTz(self)
    }
    fn set_zero(&mut self) {
        *self = ZERO_TIMESTAMP.assume_utc();
    }
}

impl<T: Destination + ZeroValue> Destination for Option<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Nullable(self)
    }
    fn set_zero(&mut self) {
        *self = None;
    }
}

impl<T: Destination + ZeroValue> Nullable for Option<T> {
    fn set_null(&mut self) {
        *self = None;
    }
    fn write(
        &mut self,
        write: &mut dyn FnMut(&mut dyn Destination) -> Result<()>,
    ) -> Result<()> {
        match self {
            Some(inner) => write(inner),
            None => {
                let mut inner = T::zero_value();
                write(&mut inner)?;
                *self = Some(inner);
                Ok(())
            }
        }
    }
}

impl<T: Destination + ?Sized> Destination for Box<T> {
    fn slot(&mut self) -> Slot<'_> {
        (**self).slot()
    }
    fn set_zero(&mut self) {
        (**self).set_zero();
    }
    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

/// What happens when a column is null.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NullStrategy {
    /// The destination keeps its current value.
    #[default]
    LeaveUntouched,
    /// The destination is set to its zero value, `None` for `Option`.
    SetZero,
    /// The converter decides: nullable destinations become `None`, others fail.
    Delegate,
}

/// Accepts the same spellings as the usual boolean parsers of SQL drivers.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn unsupported(from: &'static str, dest: &dyn Destination) -> crate::Error {
    OrmError::UnsupportedConversion {
        from,
        to: dest.type_name(),
    }
    .into()
}

fn parse_into<T>(slot: &mut T, value: &str, to: &'static str) -> Result<()>
where
    T: FromStr,
    T::Err: Display,
{
    *slot = value
        .parse()
        .map_err(|e| OrmError::conversion(format!("{value:?}"), "string", to, e))?;
    Ok(())
}

fn narrow<S, T>(slot: &mut T, value: S, from: &'static str, to: &'static str) -> Result<()>
where
    S: Copy + Display,
    T: TryFrom<S>,
    T::Error: Display,
{
    *slot = T::try_from(value).map_err(|e| OrmError::conversion(value, from, to, e))?;
    Ok(())
}

/// Text form of a timestamp, readable back with [`TIMESTAMP_FORMAT`]. The fraction of
/// second is written only when not zero, with as few digits as needed.
pub fn format_timestamp(value: &PrimitiveDateTime) -> Result<String> {
    let format = if value.nanosecond() == 0 {
        WHOLE_SECONDS_FORMAT
    } else {
        SUBSECOND_FORMAT
    };
    value
        .format(format)
        .map_err(|e| OrmError::conversion(value, "timestamp", "string", e).into())
}

/// Conversion from the wire kinds into destinations.
///
/// Every method has a default, a custom converter overrides only the kinds it cares about.
pub trait ValueConverter: Send + Sync {
    /// Layout of the strings converted into timestamps.
    fn time_format(&self) -> &'static [BorrowedFormatItem<'static>] {
        TIMESTAMP_FORMAT
    }

    fn convert_string(&self, dest: &mut dyn Destination, value: &str) -> Result<()> {
        let to = dest.type_name();
        match dest.slot() {
            Slot::Text(v) => value.clone_into(v),
            Slot::Bytes(v) => *v = value.as_bytes().to_vec(),
            Slot::I8(v) => parse_into(v, value, to)?,
            Slot::I16(v) => parse_into(v, value, to)?,
            Slot::I32(v) => parse_into(v, value, to)?,
            Slot::I64(v) => parse_into(v, value, to)?,
            Slot::Isize(v) => parse_into(v, value, to)?,
            Slot::U8(v) => parse_into(v, value, to)?,
            Slot::U16(v) => parse_into(v, value, to)?,
            Slot::U32(v) => parse_into(v, value, to)?,
            Slot::U64(v) => parse_into(v, value, to)?,
            Slot::Usize(v) => parse_into(v, value, to)?,
            Slot::F32(v) => parse_into(v, value, to)?,
            Slot::F64(v) => parse_into(v, value, to)?,
            Slot::Bool(v) => {
                *v = parse_bool(value).ok_or_else(|| {
                    OrmError::conversion(format!("{value:?}"), "string", to, "invalid syntax")
                })?
            }
            Slot::Timestamp(v) => {
                *v = PrimitiveDateTime::parse(value, self.time_format())
                    .map_err(|e| OrmError::conversion(format!("{value:?}"), "string", to, e))?
            }
            Slot::TimestampTz(v) => {
                *v = PrimitiveDateTime::parse(value, self.time_format())
                    .map_err(|e| OrmError::conversion(format!("{value:?}"), "string", to, e))?
                    .assume_utc()
            }
            Slot::Value(v) => *v = Value::Varchar(value.to_owned()),
            Slot::Nullable(v) => return v.write(&mut |d| self.convert_string(d, value)),
            Slot::Unsupported => return Err(unsupported("string", dest)),
        }
        Ok(())
    }

    fn convert_int64(&self, dest: &mut dyn Destination, value: i64) -> Result<()> {
        let to = dest.type_name();
        match dest.slot() {
            Slot::I8(v) => narrow(v, value, "i64", to)?,
            Slot::I16(v) => narrow(v, value, "i64", to)?,
            Slot::I32(v) => narrow(v, value, "i64", to)?,
            Slot::I64(v) => *v = value,
            Slot::Isize(v) => narrow(v, value, "i64", to)?,
            Slot::U8(v) => narrow(v, value, "i64", to)?,
            Slot::U16(v) => narrow(v, value, "i64", to)?,
            Slot::U32(v) => narrow(v, value, "i64", to)?,
            Slot::U64(v) => narrow(v, value, "i64", to)?,
            Slot::Usize(v) => narrow(v, value, "i64", to)?,
            Slot::F32(v) => *v = value as f32,
            Slot::F64(v) => *v = value as f64,
            Slot::Bool(v) => {
                *v = match value {
                    0 => false,
                    1 => true,
                    _ => {
                        return Err(
                            OrmError::conversion(value, "i64", to, "only 0 and 1 are booleans")
                                .into(),
                        );
                    }
                }
            }
            Slot::Text(v) => *v = value.to_string(),
            Slot::Bytes(v) => *v = value.to_string().into_bytes(),
            Slot::Value(v) => *v = Value::Int64(value),
            Slot::Nullable(v) => return v.write(&mut |d| self.convert_int64(d, value)),
            Slot::Timestamp(..) | Slot::TimestampTz(..) | Slot::Unsupported => {
                return Err(unsupported("i64", dest));
            }
        }
        Ok(())
    }

    /// Integer and boolean destinations go through the decimal text of the value, so only
    /// integral values are accepted.
    fn convert_float64(&self, dest: &mut dyn Destination, value: f64) -> Result<()> {
        let to = dest.type_name();
        match dest.slot() {
            Slot::F64(v) => *v = value,
            Slot::F32(v) => {
                let narrowed = value as f32;
                if value.is_finite() && !narrowed.is_finite() {
                    return Err(OrmError::conversion(value, "f64", to, "value out of range").into());
                }
                *v = narrowed;
            }
            Slot::Text(v) => *v = value.to_string(),
            Slot::Bytes(v) => *v = value.to_string().into_bytes(),
            Slot::Value(v) => *v = Value::Float64(value),
            Slot::Nullable(v) => return v.write(&mut |d| self.convert_float64(d, value)),
            Slot::Timestamp(..) | Slot::TimestampTz(..) | Slot::Unsupported => {
                return Err(unsupported("f64", dest));
            }
            _ => return self.convert_string(dest, &value.to_string()),
        }
        Ok(())
    }

    fn convert_bool(&self, dest: &mut dyn Destination, value: bool) -> Result<()> {
        match dest.slot() {
            Slot::Bool(v) => *v = value,
            Slot::I8(v) => *v = value.into(),
            Slot::I16(v) => *v = value.into(),
            Slot::I32(v) => *v = value.into(),
            Slot::I64(v) => *v = value.into(),
            Slot::Isize(v) => *v = value.into(),
            Slot::U8(v) => *v = value.into(),
            Slot::U16(v) => *v = value.into(),
            Slot::U32(v) => *v = value.into(),
            Slot::U64(v) => *v = value.into(),
            Slot::Usize(v) => *v = value.into(),
            Slot::F32(v) => *v = u8::from(value).into(),
            Slot::F64(v) => *v = u8::from(value).into(),
            Slot::Text(v) => *v = value.to_string(),
            Slot::Bytes(v) => *v = value.to_string().into_bytes(),
            Slot::Value(v) => *v = Value::Boolean(value),
            Slot::Nullable(v) => return v.write(&mut |d| self.convert_bool(d, value)),
            Slot::Timestamp(..) | Slot::TimestampTz(..) | Slot::Unsupported => {
                return Err(unsupported("bool", dest));
            }
        }
        Ok(())
    }

    /// Destinations other than bytes receive the value as UTF-8 text.
    fn convert_bytes(&self, dest: &mut dyn Destination, value: &[u8]) -> Result<()> {
        let to = dest.type_name();
        match dest.slot() {
            Slot::Bytes(v) => value.clone_into(v),
            Slot::Value(v) => *v = Value::Blob(value.to_vec()),
            Slot::Nullable(v) => return v.write(&mut |d| self.convert_bytes(d, value)),
            Slot::Unsupported => return Err(unsupported("bytes", dest)),
            _ => {
                let text = std::str::from_utf8(value).map_err(|e| {
                    OrmError::conversion(format!("<{} bytes>", value.len()), "bytes", to, e)
                })?;
                return self.convert_string(dest, text);
            }
        }
        Ok(())
    }

    fn convert_timestamp(&self, dest: &mut dyn Destination, value: &PrimitiveDateTime) -> Result<()> {
        match dest.slot() {
            Slot::Timestamp(v) => *v = *value,
            Slot::TimestampTz(v) => *v = value.assume_utc(),
            Slot::Text(v) => *v = format_timestamp(value)?,
            Slot::Bytes(v) => *v = format_timestamp(value)?.into_bytes(),
            Slot::Value(v) => *v = Value::Timestamp(*value),
            Slot::Nullable(v) => return v.write(&mut |d| self.convert_timestamp(d, value)),
            _ => return Err(unsupported("timestamp", dest)),
        }
        Ok(())
    }

    /// Used with [`NullStrategy::Delegate`].
    fn convert_null(&self, dest: &mut dyn Destination) -> Result<()> {
        let to = dest.type_name();
        match dest.slot() {
            Slot::Nullable(v) => v.set_null(),
            Slot::Value(v) => *v = Value::Null,
            _ => {
                return Err(
                    OrmError::conversion("NULL", "null", to, "the destination is not nullable")
                        .into(),
                );
            }
        }
        Ok(())
    }
}

/// Converter used when the database options do not name one.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConverter;

impl ValueConverter for DefaultConverter {}

/// Writes `value` into `dest`, dispatching on the wire kind.
pub fn convert_value(
    dest: &mut dyn Destination,
    value: &Value,
    converter: &dyn ValueConverter,
    on_null: NullStrategy,
) -> Result<()> {
    match value {
        Value::Null => match on_null {
            NullStrategy::LeaveUntouched => Ok(()),
            NullStrategy::SetZero => {
                dest.set_zero();
                Ok(())
            }
            NullStrategy::Delegate => converter.convert_null(dest),
        },
        Value::Boolean(v) => converter.convert_bool(dest, *v),
        Value::Int64(v) => converter.convert_int64(dest, *v),
        Value::UInt64(v) => match i64::try_from(*v) {
            Ok(v) => converter.convert_int64(dest, v),
            Err(..) => converter.convert_string(dest, &v.to_string()),
        },
        Value::Float64(v) => converter.convert_float64(dest, *v),
        Value::Varchar(v) => converter.convert_string(dest, v),
        Value::Blob(v) => converter.convert_bytes(dest, v),
        Value::Timestamp(v) => converter.convert_timestamp(dest, v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrmError;
    use assert_matches::assert_matches;
    use time::macros::datetime;

    fn error_of(result: Result<()>) -> OrmError {
        result
            .expect_err("conversion should fail")
            .downcast::<OrmError>()
            .expect("should be an OrmError")
    }

    #[test]
    fn narrowing_is_range_checked() {
        let mut small = 0i8;
        DefaultConverter.convert_int64(&mut small, 127).unwrap();
        assert_eq!(small, 127);
        let error = error_of(DefaultConverter.convert_int64(&mut small, 128));
        assert_matches!(error, OrmError::Conversion { from: "i64", to: "i8", .. });
        assert_eq!(small, 127);

        let mut unsigned = 0u32;
        assert_matches!(
            error_of(DefaultConverter.convert_int64(&mut unsigned, -1)),
            OrmError::Conversion { .. }
        );
    }

    #[test]
    fn float_into_integer() {
        let mut value = 0i32;
        DefaultConverter.convert_float64(&mut value, 42.0).unwrap();
        assert_eq!(value, 42);
        assert_matches!(
            error_of(DefaultConverter.convert_float64(&mut value, 1.5)),
            OrmError::Conversion { .. }
        );
    }

    #[test]
    fn option_is_allocated_on_success_only() {
        let mut value: Option<u8> = None;
        assert!(DefaultConverter.convert_int64(&mut value, 300).is_err());
        assert_eq!(value, None);
        DefaultConverter.convert_int64(&mut value, 30).unwrap();
        assert_eq!(value, Some(30));
    }

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("T"), Some(true));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool("yes"), None);
        let mut flag = false;
        DefaultConverter.convert_int64(&mut flag, 1).unwrap();
        assert!(flag);
        assert!(DefaultConverter.convert_int64(&mut flag, 2).is_err());
    }

    #[test]
    fn null_strategies() {
        let converter = DefaultConverter;
        let mut value = 7i64;
        convert_value(&mut value, &Value::Null, &converter, NullStrategy::LeaveUntouched).unwrap();
        assert_eq!(value, 7);
        convert_value(&mut value, &Value::Null, &converter, NullStrategy::SetZero).unwrap();
        assert_eq!(value, 0);
        assert!(convert_value(&mut value, &Value::Null, &converter, NullStrategy::Delegate).is_err());

        let mut nullable = Some(3i64);
        convert_value(&mut nullable, &Value::Null, &converter, NullStrategy::Delegate).unwrap();
        assert_eq!(nullable, None);
    }

    #[test]
    fn timestamp_fractions() {
        let mut stamp = PrimitiveDateTime::MIN;
        DefaultConverter
            .convert_string(&mut stamp, "2024-03-05 10:20:30.456")
            .unwrap();
        assert_eq!(stamp, datetime!(2024-03-05 10:20:30.456));
        DefaultConverter
            .convert_string(&mut stamp, "2024-03-05 10:20:30")
            .unwrap();
        assert_eq!(stamp, datetime!(2024-03-05 10:20:30));
        assert_eq!(
            format_timestamp(&datetime!(2024-03-05 10:20:30.456)).unwrap(),
            "2024-03-05 10:20:30.456"
        );
        assert_eq!(
            format_timestamp(&datetime!(2024-03-05 10:20:30.000001)).unwrap(),
            "2024-03-05 10:20:30.000001"
        );
        assert_eq!(
            format_timestamp(&datetime!(2024-03-05 10:20:30)).unwrap(),
            "2024-03-05 10:20:30"
        );

        let mut text = String::new();
        DefaultConverter
            .convert_timestamp(&mut text, &datetime!(2024-03-05 10:20:30.5))
            .unwrap();
        assert_eq!(text, "2024-03-05 10:20:30.5");
    }

    #[test]
    fn custom_time_format() {
        struct DayFirst;
        impl ValueConverter for DayFirst {
            fn time_format(&self) -> &'static [BorrowedFormatItem<'static>] {
                format_description!("[day]/[month]/[year] [hour]:[minute]")
            }
        }
        let mut stamp: Option<PrimitiveDateTime> = None;
        DayFirst.convert_string(&mut stamp, "05/03/2024 10:20").unwrap();
        assert_eq!(stamp, Some(datetime!(2024-03-05 10:20)));
        assert_matches!(
            error_of(DayFirst.convert_string(&mut stamp, "2024-03-05 10:20:30")),
            OrmError::Conversion { from: "string", .. }
        );
    }
}
