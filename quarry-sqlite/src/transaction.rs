use crate::{SqliteConnection, error_message_from_ptr};
use libsqlite3_sys::{SQLITE_OK, sqlite3_exec, sqlite3_get_autocommit};
use quarry_core::{
    Dialect, Executor, QueryResult, Result, SqliteDialect, Statement, Transaction,
    TransactionOptions, stream::Stream,
};
use std::ptr;

/// Transaction on a [`SqliteConnection`], rolled back when dropped without a commit.
pub struct SqliteTransaction<'c> {
    connection: &'c mut SqliteConnection,
    done: bool,
}

impl<'c> SqliteTransaction<'c> {
    pub async fn new(
        connection: &'c mut SqliteConnection,
        options: TransactionOptions,
    ) -> Result<Self> {
        if options.isolation.is_some() || options.read_only {
            log::debug!(
                "[{}] Sqlite transactions are always serializable, {:?} is ignored",
                SqliteConnection::DRIVER,
                options
            );
        }
        let mut sql = String::new();
        SqliteDialect.write_transaction_begin(&mut sql);
        connection.execute(sql.into()).await?;
        Ok(Self {
            connection,
            done: false,
        })
    }

    async fn finish(&mut self, write: fn(&SqliteDialect, &mut String)) -> Result<()> {
        let mut sql = String::new();
        write(&SqliteDialect, &mut sql);
        self.connection.execute(sql.into()).await?;
        self.done = true;
        Ok(())
    }
}

impl<'c> Executor for SqliteTransaction<'c> {
    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.connection.run(statement)
    }
}

impl<'c> Transaction<'c> for SqliteTransaction<'c> {
    #[allow(refining_impl_trait)]
    async fn commit(mut self) -> Result<()> {
        self.finish(SqliteDialect::write_transaction_commit).await
    }

    #[allow(refining_impl_trait)]
    async fn rollback(mut self) -> Result<()> {
        self.finish(SqliteDialect::write_transaction_rollback).await
    }
}

impl<'c> Drop for SqliteTransaction<'c> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        unsafe {
            let connection = *self.connection.connection;
            if sqlite3_get_autocommit(connection) != 0 {
                // Already ended by the engine
                return;
            }
            let mut sql = String::new();
            SqliteDialect.write_transaction_rollback(&mut sql);
            sql.push('\0');
            let rc = sqlite3_exec(
                connection,
                sql.as_ptr() as *const _,
                None,
                ptr::null_mut(),
                ptr::null_mut(),
            );
            if rc != SQLITE_OK {
                log::error!(
                    "[{}] Could not roll back the dropped transaction: {}",
                    SqliteConnection::DRIVER,
                    error_message_from_ptr(&libsqlite3_sys::sqlite3_errmsg(connection)),
                );
            } else {
                log::debug!(
                    "[{}] Dropped transaction rolled back",
                    SqliteConnection::DRIVER
                );
            }
        }
    }
}
