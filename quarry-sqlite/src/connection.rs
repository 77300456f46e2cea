use crate::{
    CBox, SqliteTransaction, error_message_from_ptr,
    extract::{bind_value, extract_name, extract_value},
};
use async_stream::stream;
use libsqlite3_sys::{
    SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX,
    SQLITE_OPEN_READWRITE, SQLITE_OPEN_URI, SQLITE_ROW, sqlite3, sqlite3_bind_parameter_count,
    sqlite3_busy_timeout, sqlite3_changes64, sqlite3_clear_bindings, sqlite3_close,
    sqlite3_column_count, sqlite3_db_handle, sqlite3_errmsg, sqlite3_finalize,
    sqlite3_last_insert_rowid, sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt,
};
use quarry_core::{
    Connection, Context, Error, Executor, OrmError, QueryResult, Result, Row, RowLabeled,
    RowNames, RowsAffected, Statement, TransactionOptions, as_c_string, stream::Stream,
    truncate_long,
};
use std::{
    ffi::{CStr, c_char, c_int},
    ptr,
};
use tokio::task::spawn_blocking;

/// Milliseconds a statement waits on a locked database before failing.
const BUSY_TIMEOUT: c_int = 5000;

/// Connection to a sqlite database file, `sqlite://<path>[?<uri parameters>]`.
///
/// The path follows the sqlite URI filename rules: `sqlite://:memory:` opens a private
/// in-memory database and `?mode=ro` opens read only.
pub struct SqliteConnection {
    pub(crate) connection: CBox<*mut sqlite3>,
}

impl SqliteConnection {
    pub const DRIVER: &'static str = "sqlite";

    /// Non owning copy of the handle, it can be moved into streams.
    pub(crate) fn handle(&self) -> CBox<*mut sqlite3> {
        CBox::new(*self.connection, |_| {})
    }
}

impl Executor for SqliteConnection {
    /// Runs every statement in `statement.sql`, the arguments are bound in order across
    /// them. Statements without result columns produce a [`QueryResult::Affected`].
    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        let connection = self.handle();
        stream! {
            let Statement { sql: text, arguments } = statement;
            let sql = match as_c_string(text.as_str()) {
                Ok(v) => v,
                Err(error) => {
                    log::error!("{:#}", error);
                    yield Err(error);
                    return;
                }
            };
            let total = sql.as_bytes().len();
            let mut offset = 0;
            let mut bound = 0;
            while offset < total {
                let prepared = prepare(&connection, &sql, offset);
                let (prepared, next) = match prepared {
                    Ok(v) => v,
                    Err(error) => {
                        yield Err(error.context(format!("While preparing `{}`", truncate_long(&text))));
                        return;
                    }
                };
                if next <= offset {
                    break;
                }
                let start = offset;
                offset = next;
                let Some(prepared) = prepared else {
                    // Only whitespace or comments left
                    continue;
                };
                let result = bind_arguments(&prepared, &arguments, bound, &text);
                bound = match result {
                    Ok(v) => v,
                    Err(error) => {
                        yield Err(error);
                        return;
                    }
                };
                let labels = column_labels(&prepared);
                let labels = match labels {
                    Ok(v) => v,
                    Err(error) => {
                        yield Err(error);
                        return;
                    }
                };
                loop {
                    let row = step(&prepared, labels.len());
                    match row {
                        Ok(Some(values)) => {
                            yield Ok(QueryResult::Row(RowLabeled::new(labels.clone(), values)));
                        }
                        Ok(None) => break,
                        Err(error) => {
                            let error = error.context(format!("While executing `{}`", truncate_long(&text)));
                            log::error!("{:#}", error);
                            yield Err(error);
                            return;
                        }
                    }
                }
                if labels.is_empty() {
                    let insert = is_insert(&sql.as_bytes()[start..next]);
                    let affected = rows_affected(&connection, insert);
                    yield Ok(QueryResult::Affected(affected));
                }
            }
            if bound < arguments.len() {
                let error = Error::new(OrmError::TooManyArguments(truncate_long(&text).into_owned()));
                log::error!("{:#}", error);
                yield Err(error);
            }
        }
    }
}

impl Connection for SqliteConnection {
    type Transaction<'c> = SqliteTransaction<'c>;

    #[allow(refining_impl_trait)]
    async fn connect(url: &str) -> Result<SqliteConnection> {
        let prefix = format!("{}://", Self::DRIVER);
        let Some(path) = url.strip_prefix(&prefix) else {
            let error = Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                &prefix
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        let context = || format!("Error while decoding connection URL: `{}`", url);
        let path = as_c_string(format!("file:{}", path)).with_context(context)?;
        let connection = spawn_blocking(move || unsafe {
            let mut connection = CBox::new(ptr::null_mut(), |p| {
                sqlite3_close(p);
            });
            let rc = sqlite3_open_v2(
                path.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI | SQLITE_OPEN_FULLMUTEX,
                ptr::null(),
            );
            if rc != SQLITE_OK {
                let message = if connection.is_null() {
                    "Out of memory".to_string()
                } else {
                    error_message_from_ptr(&sqlite3_errmsg(*connection)).to_string()
                };
                return Err(Error::msg(message));
            }
            sqlite3_busy_timeout(*connection, BUSY_TIMEOUT);
            Ok(connection)
        })
        .await?;
        match connection {
            Ok(connection) => {
                log::debug!("[{}] Connected to `{}`", Self::DRIVER, url);
                Ok(Self { connection })
            }
            Err(error) => {
                let error = error.context(context());
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    fn driver_name(&self) -> &'static str {
        Self::DRIVER
    }

    #[allow(refining_impl_trait)]
    async fn begin(&mut self, options: TransactionOptions) -> Result<SqliteTransaction<'_>> {
        SqliteTransaction::new(self, options).await
    }
}

fn prepare(
    connection: &CBox<*mut sqlite3>,
    sql: &CStr,
    offset: usize,
) -> Result<(Option<CBox<*mut sqlite3_stmt>>, usize)> {
    let total = sql.to_bytes().len();
    unsafe {
        let base = sql.as_ptr();
        let mut statement = CBox::new(ptr::null_mut(), |p| {
            sqlite3_finalize(p);
        });
        let mut tail: *const c_char = ptr::null();
        let rc = sqlite3_prepare_v2(
            **connection,
            base.add(offset),
            (total - offset) as c_int,
            &mut *statement,
            &mut tail,
        );
        if rc != SQLITE_OK {
            let error = Error::msg(error_message_from_ptr(&sqlite3_errmsg(**connection)).to_string());
            log::error!("{:#}", error);
            return Err(error);
        }
        let next = if tail.is_null() {
            total
        } else {
            tail.offset_from(base) as usize
        };
        if statement.is_null() {
            Ok((None, next))
        } else {
            Ok((Some(statement), next))
        }
    }
}

/// Binds the parameters of `statement` from `arguments[start..]`, returns the index of
/// the first argument left.
fn bind_arguments(
    statement: &CBox<*mut sqlite3_stmt>,
    arguments: &[quarry_core::Value],
    start: usize,
    sql: &str,
) -> Result<usize> {
    let count = unsafe {
        sqlite3_clear_bindings(**statement);
        sqlite3_bind_parameter_count(**statement)
    } as usize;
    let end = start + count;
    if end > arguments.len() {
        let error = Error::new(OrmError::NotEnoughArguments(truncate_long(sql).into_owned()));
        log::error!("{:#}", error);
        return Err(error);
    }
    for (i, value) in arguments[start..end].iter().enumerate() {
        bind_value(**statement, (i + 1) as c_int, value)?;
    }
    Ok(end)
}

fn column_labels(statement: &CBox<*mut sqlite3_stmt>) -> Result<RowNames> {
    let count = unsafe { sqlite3_column_count(**statement) };
    (0..count).map(|i| extract_name(**statement, i)).collect()
}

fn step(statement: &CBox<*mut sqlite3_stmt>, count: usize) -> Result<Option<Row>> {
    // Busy is reported once the engine gave up waiting (`BUSY_TIMEOUT`)
    match unsafe { sqlite3_step(**statement) } {
        SQLITE_DONE => Ok(None),
        SQLITE_ROW => (0..count as c_int)
            .map(|i| extract_value(**statement, i))
            .collect::<Result<Row>>()
            .map(Some),
        _ => {
            let message = unsafe {
                error_message_from_ptr(&sqlite3_errmsg(sqlite3_db_handle(**statement)))
                    .to_string()
            };
            Err(Error::msg(message))
        }
    }
}

fn rows_affected(connection: &CBox<*mut sqlite3>, insert: bool) -> RowsAffected {
    unsafe {
        RowsAffected {
            rows_affected: sqlite3_changes64(**connection).max(0) as u64,
            last_affected_id: insert.then(|| sqlite3_last_insert_rowid(**connection)),
        }
    }
}

/// Whether the statement text is an insert (`insert` or `replace`).
fn is_insert(sql: &[u8]) -> bool {
    let text = String::from_utf8_lossy(sql);
    let keyword = text
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    keyword.eq_ignore_ascii_case("insert") || keyword.eq_ignore_ascii_case("replace")
}

#[cfg(test)]
mod tests {
    use super::is_insert;

    #[test]
    fn insert_detection() {
        assert!(is_insert(b"insert into \"t\" (\"a\") values (?)"));
        assert!(is_insert(b"\n  REPLACE INTO t VALUES (1)"));
        assert!(!is_insert(b"update t set a = 1"));
        assert!(!is_insert(b"select * from inserts"));
        assert!(!is_insert(b""));
    }
}
