use crate::{Destination, FieldKind, Value};
use std::sync::Arc;

/// Row shaped type mapped to a table.
///
/// Usually derived with `#[derive(Record)]`:
///
/// ```ignore
/// #[derive(Record, Default)]
/// #[record(table = "users", primary_key = "id")]
/// struct User {
///     id: i64,
///     #[record(column = "full_name")]
///     name: String,
///     #[record(skip)]
///     cached: Vec<u8>,
/// }
/// ```
pub trait Record: Send + Sync + 'static {
    fn table_name() -> &'static str;
    fn primary_key_column() -> &'static str;
    /// Every declared field in order, excluded ones included.
    fn fields() -> &'static [Field<Self>]
    where
        Self: Sized;
}

/// Declared field of a record.
pub struct Field<R> {
    pub name: &'static str,
    /// Explicit column name, otherwise derived from `name` with the naming convention.
    pub column: Option<&'static str>,
    /// `None` for fields excluded from the mapping.
    pub access: Option<Access<R>>,
}

impl<R> Field<R> {
    pub fn is_mapped(&self) -> bool {
        self.access.is_some()
    }
}

/// Getter, setter and zero test of one field.
pub struct Access<R> {
    pub kind: FieldKind,
    pub type_name: &'static str,
    pub get: fn(&R) -> Value,
    pub get_mut: fn(&mut R) -> &mut dyn Destination,
    pub is_zero: fn(&R) -> bool,
}

/// Element of the vector filled by `query_multiple`: the record itself or a shared pointer
/// to it.
pub trait Element: Send + 'static {
    type Record: Record + Default;
    fn from_record(record: Self::Record) -> Self;
}

impl<R: Record + Default> Element for R {
    type Record = R;
    fn from_record(record: R) -> Self {
        record
    }
}

impl<R: Record + Default> Element for Arc<R> {
    type Record = R;
    fn from_record(record: R) -> Self {
        Arc::new(record)
    }
}
