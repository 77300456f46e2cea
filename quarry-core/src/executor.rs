use crate::{
    Result, Value,
    stream::{Stream, StreamExt, TryStreamExt},
    truncate_long,
};
use std::{
    fmt::{self, Display},
    future::Future,
    sync::Arc,
};

/// SQL text with its positional arguments, ready to be sent to an [`Executor`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub arguments: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            arguments,
        }
    }
}

impl From<&str> for Statement {
    fn from(value: &str) -> Self {
        Statement::new(value, Vec::new())
    }
}

impl From<String> for Statement {
    fn from(value: String) -> Self {
        Statement::new(value, Vec::new())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&truncate_long(&self.sql))
    }
}

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Identifier generated by the last insert, when the backend reports it.
    pub last_affected_id: Option<i64>,
}

impl Extend<RowsAffected> for RowsAffected {
    fn extend<T: IntoIterator<Item = RowsAffected>>(&mut self, iter: T) {
        for elem in iter {
            self.rows_affected += elem.rows_affected;
            if elem.last_affected_id.is_some() {
                self.last_affected_id = elem.last_affected_id;
            }
        }
    }
}

/// Shared column name list of a result.
pub type RowNames = Arc<[String]>;
/// Values of one row, aligned with its `RowNames`.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    pub labels: RowNames,
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values[i])
    }
}

/// Items emitted by [`Executor::run`]: rows and modify results.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Row(RowLabeled),
    Affected(RowsAffected),
}

/// Something statements can be sent to: a connection or a transaction.
pub trait Executor: Send {
    /// Sends the statement and returns everything it produced, rows and modify results.
    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Sends the statement and returns the rows.
    fn fetch(&mut self, statement: Statement) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.run(statement).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Sends the statement and returns the total number of rows affected.
    fn execute(&mut self, statement: Statement) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.run(statement)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Options of [`Connection::begin`], honored as far as the backend supports them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    pub read_only: bool,
    pub isolation: Option<IsolationLevel>,
}

pub trait Connection: Executor + Sized {
    type Transaction<'c>: Transaction<'c>
    where
        Self: 'c;

    /// Opens a connection to `url`, its scheme names the driver (`sqlite://`).
    fn connect(url: &str) -> impl Future<Output = Result<Self>> + Send;

    /// Name the dialect is looked up with.
    fn driver_name(&self) -> &'static str;

    fn ping(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.execute("SELECT 1".into()).await?;
            Ok(())
        }
    }

    fn begin(
        &mut self,
        options: TransactionOptions,
    ) -> impl Future<Output = Result<Self::Transaction<'_>>> + Send;

    fn disconnect(self) -> impl Future<Output = Result<()>> + Send {
        async move {
            drop(self);
            Ok(())
        }
    }
}

/// Transaction started by a [`Connection`]. Dropping it without a commit rolls it back.
pub trait Transaction<'c>: Executor {
    fn commit(self) -> impl Future<Output = Result<()>> + Send;
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}
