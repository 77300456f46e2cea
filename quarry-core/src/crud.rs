use crate::{
    AppendSql, Context, ContextPool, DefaultConverter, DeleteOption, DeleteSpec, Dialect, Element,
    ExecOption, ExecSpec, Executor, FieldKind, GeneratedKey, Metadata,
    MultiQueryOption, NullStrategy, OrmError, PooledContext, PrimaryKey, QueryResult, QuerySpec,
    Record, Result, RowLabeled, RowScanner, RowsAffected, SingleQuery, SingleQueryOption,
    SqlContext, Statement, TableSource, TableSpec, Value, ValueConverter, convert_value, resolve,
    stream::{Stream, TryStreamExt},
    truncate_long,
};
use std::{pin::pin, sync::Arc};

/// Builds and runs the statements of the record operations.
///
/// It holds no connection: every operation receives the [`Executor`] to run on, so the
/// same instance serves a database and the transactions started from it.
pub struct Crud {
    pool: ContextPool,
    converter: Arc<dyn ValueConverter>,
    on_null: NullStrategy,
}

impl Crud {
    pub fn new(
        driver: impl Into<Arc<str>>,
        dialect: Arc<dyn Dialect>,
        converter: Arc<dyn ValueConverter>,
        on_null: NullStrategy,
    ) -> Self {
        Self {
            pool: ContextPool::new(driver, dialect),
            converter,
            on_null,
        }
    }

    /// Default converter, nulls leave fields untouched.
    pub fn with_dialect(driver: impl Into<Arc<str>>, dialect: Arc<dyn Dialect>) -> Self {
        Self::new(
            driver,
            dialect,
            Arc::new(DefaultConverter),
            NullStrategy::default(),
        )
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        self.pool.dialect()
    }

    pub fn driver(&self) -> &str {
        self.pool.driver()
    }

    pub fn converter(&self) -> &dyn ValueConverter {
        &*self.converter
    }

    pub fn on_null(&self) -> NullStrategy {
        self.on_null
    }

    pub fn quote(&self, identifier: &str) -> String {
        self.dialect().quote(identifier)
    }

    /// Empty SQL context from the pool.
    pub fn context(&self) -> PooledContext<'_> {
        self.pool.acquire()
    }

    pub fn metadata<R: Record>(&self) -> Result<Arc<Metadata>> {
        resolve::<R>(self.dialect().naming())
    }

    pub fn scanner<'a>(&'a self, metadata: &'a Metadata) -> RowScanner<'a> {
        RowScanner::new(metadata, self.converter(), self.on_null)
    }

    /// Renders any fragment (usually a [`QuerySpec`]) into a statement.
    pub fn render(&self, fragment: &dyn AppendSql) -> Result<Statement> {
        let mut context = self.context();
        context.append(fragment)?;
        Ok(self.statement(&context))
    }

    fn statement(&self, context: &SqlContext) -> Statement {
        log::debug!(
            "[{}] {} ({} arguments)",
            self.driver(),
            truncate_long(context.sql()),
            context.arguments().len()
        );
        Statement::new(context.sql(), context.arguments().to_vec())
    }

    /// Select of every mapped column of the record's table.
    pub fn default_query(&self, metadata: &Metadata) -> QuerySpec {
        QuerySpec {
            select: metadata.columns.iter().map(|c| self.quote(c)).collect(),
            table: TableSpec {
                source: TableSource::Name(metadata.table.to_owned()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Inserts the record and reads back the generated key when the key field is zero.
    ///
    /// Failing to read the key back is not an error: the row is written, the field keeps
    /// its zero value and a warning is logged.
    pub async fn insert<R: Record, E: Executor>(
        &self,
        executor: &mut E,
        record: &mut R,
        options: impl ExecOption,
    ) -> Result<RowsAffected> {
        let metadata = self.metadata::<R>()?;
        let strategy = self.dialect().generated_key();
        let key = metadata
            .primary_key
            .as_ref()
            .filter(|key| key_access::<R>(key).is_some_and(|access| (access.is_zero)(&*record)))
            .filter(|key| {
                // Generated string keys cannot be selected back with a scalar select
                !(strategy == GeneratedKey::TrailingSelect && key.kind == FieldKind::Text)
            });
        let through_rows = key.is_some() && strategy != GeneratedKey::LastInsertId;
        let statement =
            self.render_insert(&metadata, &*record, options, key.filter(|_| through_rows))?;
        let Some(key) = key else {
            return self.execute(executor, statement).await;
        };
        if !through_rows {
            let affected = self.execute(executor, statement).await?;
            match affected.last_affected_id {
                Some(id) => self.assign_key(record, key, &Value::Int64(id)),
                None => log::warn!(
                    "[{}] The generated key of `{}` was not reported, `{}` is left unset",
                    self.driver(),
                    metadata.table,
                    key.column,
                ),
            }
            return Ok(affected);
        }
        let shown = statement.to_string();
        let mut affected = RowsAffected::default();
        let mut returned = None;
        {
            let mut stream = pin!(executor.run(statement));
            while let Some(item) = stream
                .try_next()
                .await
                .with_context(|| format!("While executing `{}`", shown))?
            {
                match item {
                    QueryResult::Affected(v) => affected.extend([v]),
                    QueryResult::Row(row) if returned.is_none() => {
                        returned = row.values.first().cloned();
                    }
                    QueryResult::Row(..) => {}
                }
            }
        }
        match returned {
            Some(value) => {
                if affected.rows_affected == 0 {
                    affected.rows_affected = 1;
                }
                self.assign_key(record, key, &value);
            }
            None => log::warn!(
                "[{}] No generated key returned for `{}`, `{}` is left unset",
                self.driver(),
                metadata.table,
                key.column,
            ),
        }
        Ok(affected)
    }

    /// Inserts the record as is, the generated key is not read back.
    pub async fn insert_only<R: Record, E: Executor>(
        &self,
        executor: &mut E,
        record: &R,
        options: impl ExecOption,
    ) -> Result<RowsAffected> {
        let metadata = self.metadata::<R>()?;
        let statement = self.render_insert(&metadata, record, options, None)?;
        self.execute(executor, statement).await
    }

    fn render_insert<R: Record>(
        &self,
        metadata: &Metadata,
        record: &R,
        options: impl ExecOption,
        returning: Option<&PrimaryKey>,
    ) -> Result<Statement> {
        let mut exec = ExecSpec::default();
        options.apply_exec(&mut exec);
        let columns = written_columns(metadata, &exec, record, false)?;
        let dialect = self.dialect().clone();
        let mut context = self.context();
        context.write_str("insert into ").write_quoted(metadata.table);
        if columns.is_empty() {
            dialect.write_default_values(&mut context);
        } else {
            context.write_str(" (");
            for (i, (column, _)) in columns.iter().enumerate() {
                if i > 0 {
                    context.write_str(", ");
                }
                context.write_quoted(column);
            }
            context.write_str(") values (");
            for (i, (_, value)) in columns.into_iter().enumerate() {
                if i > 0 {
                    context.write_str(", ");
                }
                context.next_placeholder(value);
            }
            context.write_char(')');
        }
        if let Some(key) = returning {
            dialect.write_generated_key(&mut context, &key.column);
        }
        Ok(self.statement(&context))
    }

    fn assign_key<R: Record>(&self, record: &mut R, key: &PrimaryKey, value: &Value) {
        let Some(access) = key_access::<R>(key) else {
            return;
        };
        if let Err(error) = convert_value((access.get_mut)(record), value, self.converter(), self.on_null) {
            log::warn!(
                "[{}] Could not assign the generated key {} to `{}`.`{}`: {:#}",
                self.driver(),
                value,
                R::table_name(),
                key.column,
                error,
            );
        }
    }

    /// Updates the row of the record, matched by primary key. The key field must not be
    /// zero. When no column is left to write, no statement is sent.
    pub async fn update<R: Record, E: Executor>(
        &self,
        executor: &mut E,
        record: &R,
        options: impl ExecOption,
    ) -> Result<RowsAffected> {
        match self.render_update(record, options)? {
            Some(statement) => self.execute(executor, statement).await,
            None => Ok(RowsAffected::default()),
        }
    }

    pub fn render_update<R: Record>(
        &self,
        record: &R,
        options: impl ExecOption,
    ) -> Result<Option<Statement>> {
        let metadata = self.metadata::<R>()?;
        let (key, access) = required_key::<R>(&metadata)?;
        if (access.is_zero)(record) {
            let error = OrmError::EmptyPrimaryKey(key.column.clone());
            log::error!("{}", error);
            return Err(error.into());
        }
        let mut exec = ExecSpec::default();
        options.apply_exec(&mut exec);
        let columns = written_columns(&metadata, &exec, record, true)?;
        if columns.is_empty() {
            log::debug!(
                "[{}] Nothing to update in `{}`, no statement sent",
                self.driver(),
                metadata.table
            );
            return Ok(None);
        }
        let mut context = self.context();
        context
            .write_str("update ")
            .write_quoted(metadata.table)
            .write_str(" set ");
        for (i, (column, value)) in columns.into_iter().enumerate() {
            if i > 0 {
                context.write_str(", ");
            }
            context
                .write_quoted(&column)
                .write_str(" = ")
                .next_placeholder(value);
        }
        context
            .write_str(" where ")
            .write_quoted(&key.column)
            .write_str(" = ")
            .next_placeholder((access.get)(record));
        Ok(Some(self.statement(&context)))
    }

    /// Inserts the record when its key is zero, updates it otherwise.
    pub async fn save<R: Record, E: Executor>(
        &self,
        executor: &mut E,
        record: &mut R,
        options: impl ExecOption,
    ) -> Result<RowsAffected> {
        let metadata = self.metadata::<R>()?;
        let stored = metadata
            .primary_key
            .as_ref()
            .and_then(key_access::<R>)
            .is_some_and(|access| !(access.is_zero)(&*record));
        if stored {
            self.update(executor, record, options).await
        } else {
            self.insert(executor, record, options).await
        }
    }

    /// Fills `record` with the first row of the query, returns whether a row was found.
    /// The query is limited to one row.
    pub async fn query<'u, R: Record, E: Executor>(
        &self,
        executor: &mut E,
        record: &mut R,
        options: impl SingleQueryOption<'u>,
    ) -> Result<bool> {
        let metadata = self.metadata::<R>()?;
        let mut query = self.default_query(&metadata);
        query.limit = 1;
        let mut single = SingleQuery::new(query);
        options.apply_single(&mut single);
        let statement = self.render(&single.query)?;
        let shown = statement.to_string();
        let row = {
            let mut stream = pin!(executor.fetch(statement));
            stream
                .try_next()
                .await
                .with_context(|| format!("While querying `{}`", shown))?
        };
        let Some(row) = row else {
            return Ok(false);
        };
        self.scanner(&metadata).scan(record, &row, single.unused)?;
        Ok(true)
    }

    /// Appends one element per returned row to `out`. Nothing is appended if any row
    /// fails.
    pub async fn query_multiple<T: Element, E: Executor>(
        &self,
        executor: &mut E,
        out: &mut Vec<T>,
        options: impl MultiQueryOption,
    ) -> Result<()> {
        let metadata = self.metadata::<T::Record>()?;
        let mut query = self.default_query(&metadata);
        options.apply_multi(&mut query);
        let statement = self.render(&query)?;
        let shown = statement.to_string();
        let scanner = self.scanner(&metadata);
        let mut items = Vec::new();
        let mut stream = pin!(executor.fetch(statement));
        while let Some(row) = stream
            .try_next()
            .await
            .with_context(|| format!("While querying `{}`", shown))?
        {
            items.push(T::from_record(scanner.materialize::<T::Record>(&row)?));
        }
        out.append(&mut items);
        Ok(())
    }

    /// `delete from <table>[ where ...]`
    pub async fn delete<E: Executor>(
        &self,
        executor: &mut E,
        table: &str,
        options: impl DeleteOption,
    ) -> Result<RowsAffected> {
        let mut delete = DeleteSpec::default();
        options.apply_delete(&mut delete);
        let statement = {
            let mut context = self.context();
            context.write_str("delete from ").write_quoted(table);
            context.write_where(&delete.filter.text, &delete.filter.arguments)?;
            self.statement(&context)
        };
        self.execute(executor, statement).await
    }

    /// Deletes the row of the record, matched by primary key.
    pub async fn delete_record<R: Record, E: Executor>(
        &self,
        executor: &mut E,
        record: &R,
    ) -> Result<RowsAffected> {
        let metadata = self.metadata::<R>()?;
        let statement = {
            let (key, access) = required_key::<R>(&metadata)?;
            if (access.is_zero)(record) {
                let error = OrmError::EmptyPrimaryKey(key.column.clone());
                log::error!("{}", error);
                return Err(error.into());
            }
            let mut context = self.context();
            context
                .write_str("delete from ")
                .write_quoted(metadata.table)
                .write_str(" where ")
                .write_quoted(&key.column)
                .write_str(" = ")
                .next_placeholder((access.get)(record));
            self.statement(&context)
        };
        self.execute(executor, statement).await
    }

    pub async fn raw_execute<E: Executor>(
        &self,
        executor: &mut E,
        sql: &str,
        arguments: Vec<Value>,
    ) -> Result<RowsAffected> {
        self.execute(executor, Statement::new(sql, arguments)).await
    }

    pub fn raw_fetch<'e, E: Executor>(
        &self,
        executor: &'e mut E,
        sql: &str,
        arguments: Vec<Value>,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send + 'e {
        log::debug!("[{}] {}", self.driver(), truncate_long(sql));
        executor.fetch(Statement::new(sql, arguments))
    }

    /// First row of the result, `None` when there is none.
    pub async fn raw_query_row<E: Executor>(
        &self,
        executor: &mut E,
        sql: &str,
        arguments: Vec<Value>,
    ) -> Result<Option<RowLabeled>> {
        let mut stream = pin!(self.raw_fetch(executor, sql, arguments));
        stream
            .try_next()
            .await
            .with_context(|| format!("While querying `{}`", truncate_long(sql)))
    }

    async fn execute<E: Executor>(
        &self,
        executor: &mut E,
        statement: Statement,
    ) -> Result<RowsAffected> {
        let shown = statement.to_string();
        executor
            .execute(statement)
            .await
            .with_context(|| format!("While executing `{}`", shown))
    }
}

fn key_access<R: Record>(key: &PrimaryKey) -> Option<&'static crate::Access<R>> {
    R::fields().get(key.field)?.access.as_ref()
}

fn required_key<R: Record>(metadata: &Metadata) -> Result<(&PrimaryKey, &'static crate::Access<R>)> {
    match metadata
        .primary_key
        .as_ref()
        .and_then(|key| Some((key, key_access::<R>(key)?)))
    {
        Some(v) => Ok(v),
        None => {
            let error = OrmError::MissingPrimaryKey {
                table: metadata.table.to_owned(),
                column: R::primary_key_column().to_owned(),
            };
            log::error!("{}", error);
            Err(error.into())
        }
    }
}

/// Column and value of every field written by an insert or update.
fn written_columns<R: Record>(
    metadata: &Metadata,
    exec: &ExecSpec,
    record: &R,
    skip_key: bool,
) -> Result<Vec<(String, Value)>> {
    let fields = R::fields();
    let key = metadata.primary_key.as_ref().map(|k| k.field);
    let selected = if exec.columns.is_empty() {
        metadata
            .columns
            .iter()
            .cloned()
            .zip(metadata.fields.iter().copied())
            .collect::<Vec<_>>()
    } else {
        exec.columns
            .iter()
            .map(|column| match metadata.field_of(column) {
                Some(i) => Ok((column.clone(), i)),
                None => {
                    let error = OrmError::UnknownColumn(column.clone());
                    log::error!("{}", error);
                    Err(error)
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?
    };
    let mut result = Vec::with_capacity(selected.len());
    for (column, index) in selected {
        if skip_key && key == Some(index) {
            continue;
        }
        let Some(access) = fields.get(index).and_then(|f| f.access.as_ref()) else {
            continue;
        };
        if !exec.including_zeros && (access.is_zero)(record) {
            continue;
        }
        result.push((column, (access.get)(record)));
    }
    Ok(result)
}
