use crate::{FieldKind, Naming, OrmError, Record, Result};
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

/// Column layout of a record type under one naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub table: &'static str,
    /// Declared fields, excluded ones included.
    pub field_count: usize,
    /// Mapped columns in declaration order.
    pub columns: Vec<String>,
    /// Field index of each entry of `columns`.
    pub fields: Vec<usize>,
    /// Field index of every mapped column.
    pub column_fields: HashMap<String, usize>,
    /// Set when a field maps to the primary key column.
    pub primary_key: Option<PrimaryKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub field: usize,
    pub column: String,
    pub kind: FieldKind,
}

impl Metadata {
    pub fn field_of(&self, column: &str) -> Option<usize> {
        self.column_fields.get(column).copied()
    }

    fn build<R: Record>(naming: Naming) -> Result<Self> {
        let fields = R::fields();
        let key = R::primary_key_column();
        let converted_key = naming.convert(key);
        let mut columns = Vec::with_capacity(fields.len());
        let mut indices = Vec::with_capacity(fields.len());
        let mut column_fields = HashMap::with_capacity(fields.len());
        let mut primary_key = None;
        for (i, field) in fields.iter().enumerate() {
            let Some(access) = &field.access else {
                continue;
            };
            let column = field
                .column
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| naming.convert(field.name));
            if primary_key.is_none() && (column == key || column == converted_key) {
                if !access.kind.is_key_compatible() {
                    let error = OrmError::InvalidPrimaryKeyType(access.type_name);
                    log::error!("{}", error);
                    return Err(error.into());
                }
                primary_key = Some(PrimaryKey {
                    field: i,
                    column: column.clone(),
                    kind: access.kind,
                });
            }
            column_fields.entry(column.clone()).or_insert(i);
            columns.push(column);
            indices.push(i);
        }
        Ok(Self {
            table: R::table_name(),
            field_count: fields.len(),
            columns,
            fields: indices,
            column_fields,
            primary_key,
        })
    }
}

type Cache = RwLock<HashMap<(TypeId, Naming), Arc<Metadata>>>;

static METADATA: LazyLock<Cache> = LazyLock::new(Default::default);

/// Metadata of `R`, computed on first use and shared afterwards.
pub fn resolve<R: Record>(naming: Naming) -> Result<Arc<Metadata>> {
    let key = (TypeId::of::<R>(), naming);
    if let Some(metadata) = METADATA
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(metadata.clone());
    }
    let metadata = Arc::new(Metadata::build::<R>(naming)?);
    let mut cache = METADATA.write().unwrap_or_else(PoisonError::into_inner);
    Ok(cache.entry(key).or_insert(metadata).clone())
}
