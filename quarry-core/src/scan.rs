use crate::{
    Context, Metadata, NullStrategy, Record, Result, RowLabeled, Value, ValueConverter,
    convert_value,
};
use std::collections::HashMap;

/// Copies result rows into records.
#[derive(Clone, Copy)]
pub struct RowScanner<'a> {
    pub metadata: &'a Metadata,
    pub converter: &'a dyn ValueConverter,
    pub on_null: NullStrategy,
}

impl<'a> RowScanner<'a> {
    pub fn new(
        metadata: &'a Metadata,
        converter: &'a dyn ValueConverter,
        on_null: NullStrategy,
    ) -> Self {
        Self {
            metadata,
            converter,
            on_null,
        }
    }

    /// Writes every mapped column of `row` into `record`. Columns no field maps to are
    /// stored in `unused` when given, dropped otherwise. The first failing column stops
    /// the scan.
    pub fn scan<R: Record>(
        &self,
        record: &mut R,
        row: &RowLabeled,
        mut unused: Option<&mut HashMap<String, Value>>,
    ) -> Result<()> {
        let fields = R::fields();
        for (label, value) in row.labels.iter().zip(row.values.iter()) {
            let access = self
                .metadata
                .field_of(label)
                .and_then(|i| fields.get(i))
                .and_then(|f| f.access.as_ref());
            match access {
                Some(access) => {
                    convert_value((access.get_mut)(record), value, self.converter, self.on_null)
                        .with_context(|| {
                            format!("While scanning column `{}` of `{}`", label, R::table_name())
                        })?;
                }
                None => {
                    if let Some(unused) = unused.as_deref_mut() {
                        unused.insert(label.clone(), value.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// New record from `row`, starting from the default value.
    pub fn materialize<R: Record + Default>(&self, row: &RowLabeled) -> Result<R> {
        let mut record = R::default();
        self.scan(&mut record, row, None)?;
        Ok(record)
    }
}
