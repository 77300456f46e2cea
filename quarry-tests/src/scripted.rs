//! Connection double for backends that are not available in tests.
use quarry::{
    Connection, Error, Executor, QueryResult, Result, RowLabeled, RowsAffected, Statement,
    Transaction, TransactionOptions, Value, dialect_for,
    stream::{self, Stream},
};
use std::{collections::VecDeque, sync::Arc};

const DRIVERS: [&str; 7] = [
    "sqlite", "mysql", "postgres", "pgx", "sqlserver", "mssql", "oracle",
];

enum Response {
    Results(Vec<QueryResult>),
    Fail(String),
}

/// Records every statement it receives and answers with the queued responses, in
/// order. Statements without a queued response produce nothing.
pub struct ScriptedConnection {
    driver: &'static str,
    statements: Vec<Statement>,
    responses: VecDeque<Response>,
}

impl ScriptedConnection {
    pub fn new(driver: &'static str) -> Self {
        Self {
            driver,
            statements: Vec::new(),
            responses: VecDeque::new(),
        }
    }

    /// Queues the results of the next statement.
    pub fn respond(&mut self, results: Vec<QueryResult>) -> &mut Self {
        self.responses.push_back(Response::Results(results));
        self
    }

    /// Queues a single row result.
    pub fn respond_row(&mut self, labels: &[&str], values: Vec<Value>) -> &mut Self {
        let labels: Arc<[String]> = labels.iter().map(|v| v.to_string()).collect();
        self.respond(vec![QueryResult::Row(RowLabeled::new(
            labels,
            values.into_boxed_slice(),
        ))])
    }

    /// Queues a modify result.
    pub fn respond_affected(&mut self, rows: u64, last_id: Option<i64>) -> &mut Self {
        self.respond(vec![QueryResult::Affected(RowsAffected {
            rows_affected: rows,
            last_affected_id: last_id,
        })])
    }

    /// Makes the next statement fail.
    pub fn fail(&mut self, message: impl Into<String>) -> &mut Self {
        self.responses.push_back(Response::Fail(message.into()));
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// SQL text of the statements received so far.
    pub fn sql(&self) -> Vec<&str> {
        self.statements.iter().map(|v| v.sql.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.statements.clear();
        self.responses.clear();
    }

    fn transaction_sql(&self, write: impl FnOnce(&mut String)) -> Statement {
        let mut sql = String::new();
        write(&mut sql);
        sql.into()
    }
}

impl Executor for ScriptedConnection {
    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        log::debug!("[scripted {}] {}", self.driver, statement);
        self.statements.push(statement);
        let items: Vec<Result<QueryResult>> = match self.responses.pop_front() {
            Some(Response::Results(results)) => results.into_iter().map(Ok).collect(),
            Some(Response::Fail(message)) => vec![Err(Error::msg(message))],
            None => Vec::new(),
        };
        stream::iter(items)
    }
}

impl Connection for ScriptedConnection {
    type Transaction<'c> = ScriptedTransaction<'c>;

    /// `scripted://<driver>`
    #[allow(refining_impl_trait)]
    async fn connect(url: &str) -> Result<ScriptedConnection> {
        let driver = url
            .strip_prefix("scripted://")
            .and_then(|name| DRIVERS.into_iter().find(|v| *v == name));
        match driver {
            Some(driver) => Ok(Self::new(driver)),
            None => {
                let error = Error::msg(format!(
                    "Expected `scripted://<driver>` with a known driver, got `{}`",
                    url
                ));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    fn driver_name(&self) -> &'static str {
        self.driver
    }

    #[allow(refining_impl_trait)]
    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    #[allow(refining_impl_trait)]
    async fn begin(&mut self, _options: TransactionOptions) -> Result<ScriptedTransaction<'_>> {
        let dialect = dialect_for(self.driver);
        let statement = self.transaction_sql(|out| dialect.write_transaction_begin(out));
        self.execute(statement).await?;
        Ok(ScriptedTransaction { connection: self })
    }
}

pub struct ScriptedTransaction<'c> {
    connection: &'c mut ScriptedConnection,
}

impl<'c> Executor for ScriptedTransaction<'c> {
    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.connection.run(statement)
    }
}

impl<'c> Transaction<'c> for ScriptedTransaction<'c> {
    #[allow(refining_impl_trait)]
    async fn commit(self) -> Result<()> {
        let dialect = dialect_for(self.connection.driver);
        let statement = self
            .connection
            .transaction_sql(|out| dialect.write_transaction_commit(out));
        self.connection.execute(statement).await?;
        Ok(())
    }

    #[allow(refining_impl_trait)]
    async fn rollback(self) -> Result<()> {
        let dialect = dialect_for(self.connection.driver);
        let statement = self
            .connection
            .transaction_sql(|out| dialect.write_transaction_rollback(out));
        self.connection.execute(statement).await?;
        Ok(())
    }
}
