use crate::{
    Connection, Context, Crud, DefaultConverter, DeleteOption, Dialect, Element, ExecOption,
    Executor, MultiQueryOption, NullStrategy, Record, Result, RowLabeled, RowsAffected,
    SingleQueryOption, Value, ValueConverter, dialect_for,
};
use std::{future::Future, sync::Arc};

/// Settings of a [`Database`].
#[derive(Clone, Default)]
pub struct DatabaseOptions {
    pub no_ping: bool,
    pub on_null: NullStrategy,
    /// Replaces the dialect registered for the driver.
    pub dialect: Option<Arc<dyn Dialect>>,
    pub value_converter: Option<Arc<dyn ValueConverter>>,
}

impl DatabaseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips the ping done when the database is created.
    pub fn no_ping(mut self) -> Self {
        self.no_ping = true;
        self
    }

    pub fn on_null(mut self, strategy: NullStrategy) -> Self {
        self.on_null = strategy;
        self
    }

    pub fn dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn value_converter(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.value_converter = Some(converter);
        self
    }
}

/// Record operations over an executor: implemented by [`Database`] and by the
/// transactions started from it.
pub trait Session: Send {
    type Executor: Executor;

    fn parts(&mut self) -> (&Crud, &mut Self::Executor);

    fn crud(&mut self) -> &Crud {
        self.parts().0
    }

    /// See [`Crud::insert`].
    fn insert<R: Record>(
        &mut self,
        record: &mut R,
        options: impl ExecOption + Send,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let (crud, executor) = self.parts();
            crud.insert(executor, record, options).await
        }
    }

    fn insert_only<R: Record>(
        &mut self,
        record: &R,
        options: impl ExecOption + Send,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let (crud, executor) = self.parts();
            crud.insert_only(executor, record, options).await
        }
    }

    fn update<R: Record>(
        &mut self,
        record: &R,
        options: impl ExecOption + Send,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let (crud, executor) = self.parts();
            crud.update(executor, record, options).await
        }
    }

    fn save<R: Record>(
        &mut self,
        record: &mut R,
        options: impl ExecOption + Send,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let (crud, executor) = self.parts();
            crud.save(executor, record, options).await
        }
    }

    /// See [`Crud::query`].
    fn query<'u, R: Record>(
        &mut self,
        record: &mut R,
        options: impl SingleQueryOption<'u> + Send,
    ) -> impl Future<Output = Result<bool>> + Send {
        async move {
            let (crud, executor) = self.parts();
            crud.query(executor, record, options).await
        }
    }

    fn query_multiple<T: Element>(
        &mut self,
        out: &mut Vec<T>,
        options: impl MultiQueryOption + Send,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let (crud, executor) = self.parts();
            crud.query_multiple(executor, out, options).await
        }
    }

    fn delete(
        &mut self,
        table: &str,
        options: impl DeleteOption + Send,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let (crud, executor) = self.parts();
            crud.delete(executor, table, options).await
        }
    }

    fn delete_record<R: Record>(
        &mut self,
        record: &R,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let (crud, executor) = self.parts();
            crud.delete_record(executor, record).await
        }
    }

    fn raw_execute(
        &mut self,
        sql: &str,
        arguments: Vec<Value>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        async move {
            let (crud, executor) = self.parts();
            crud.raw_execute(executor, sql, arguments).await
        }
    }

    fn raw_query_row(
        &mut self,
        sql: &str,
        arguments: Vec<Value>,
    ) -> impl Future<Output = Result<Option<RowLabeled>>> + Send {
        async move {
            let (crud, executor) = self.parts();
            crud.raw_query_row(executor, sql, arguments).await
        }
    }
}

/// A connection together with the dialect and conversion settings used on it.
pub struct Database<C: Connection> {
    pub(crate) crud: Crud,
    pub(crate) connection: C,
}

impl<C: Connection> Database<C> {
    /// Connects to `url` and wraps the connection, see [`Database::new`].
    pub async fn open(url: &str, options: DatabaseOptions) -> Result<Self> {
        let connection = C::connect(url)
            .await
            .with_context(|| format!("While connecting to `{}`", url))?;
        Self::new(connection, options).await
    }

    /// Pings the connection unless disabled, the dialect is the one registered for the
    /// driver unless the options name one.
    pub async fn new(mut connection: C, options: DatabaseOptions) -> Result<Self> {
        let driver = connection.driver_name();
        if !options.no_ping {
            if let Err(error) = connection.ping().await {
                log::error!("[{}] Ping failed: {:#}", driver, error);
                return Err(error.context(format!("While pinging the `{}` database", driver)));
            }
        }
        let dialect = options.dialect.unwrap_or_else(|| dialect_for(driver));
        let converter = options
            .value_converter
            .unwrap_or_else(|| Arc::new(DefaultConverter));
        log::debug!(
            "[{}] Database ready with the `{}` dialect",
            driver,
            dialect.name()
        );
        Ok(Self {
            crud: Crud::new(driver, dialect, converter, options.on_null),
            connection,
        })
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        self.crud.dialect()
    }

    pub fn connection(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn into_connection(self) -> C {
        self.connection
    }

    pub fn quote(&self, identifier: &str) -> String {
        self.crud.quote(identifier)
    }

    /// Rows of a raw query, streamed.
    pub fn raw_fetch(
        &mut self,
        sql: &str,
        arguments: Vec<Value>,
    ) -> impl crate::stream::Stream<Item = Result<RowLabeled>> + Send {
        self.crud.raw_fetch(&mut self.connection, sql, arguments)
    }

    pub async fn close(self) -> Result<()> {
        self.connection.disconnect().await
    }
}

impl<C: Connection> Session for Database<C> {
    type Executor = C;

    fn parts(&mut self) -> (&Crud, &mut C) {
        (&self.crud, &mut self.connection)
    }
}
