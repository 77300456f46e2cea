#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use quarry::{
        Connection, Executor, OrmError, QueryResult, RowsAffected, Statement, Value,
        stream::TryStreamExt,
    };
    use quarry_sqlite::SqliteConnection;
    use quarry_tests::{init_logs, silent_logs};
    use std::{env, pin::pin, time::Duration};
    use tokio::{fs, time::timeout};

    async fn memory() -> SqliteConnection {
        SqliteConnection::connect("sqlite://:memory:")
            .await
            .expect("Could not open the in memory database")
    }

    #[tokio::test]
    async fn create_database() {
        init_logs();
        let path = env::temp_dir().join("quarry_creation.sqlite");
        if path.exists() {
            fs::remove_file(&path)
                .await
                .expect("Failed to remove the test database file");
        }
        SqliteConnection::connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .expect("Could not create the database");
        assert!(path.exists(), "Database file should be created after connection");
        SqliteConnection::connect(&format!("sqlite://{}?mode=ro", path.display()))
            .await
            .expect("Could not open the database read only");
        fs::remove_file(&path)
            .await
            .expect("Failed to remove the test database file");
        silent_logs! {
            assert!(
                SqliteConnection::connect(&format!("sqlite://{}?mode=ro", path.display()))
                    .await
                    .is_err(),
                "Should not be able to open in read only a missing database"
            );
        };
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(SqliteConnection::connect("postgres://some_value").await.is_err());
        };
    }

    #[tokio::test]
    async fn multiple_statements() {
        init_logs();
        let mut connection = memory().await;
        let results: Vec<QueryResult> = connection
            .run(Statement::new(
                "
                create table pairs (a integer, b text);
                insert into pairs (a, b) values (?, ?), (?, ?);
                select a, b from pairs order by a;
                -- trailing comment
                ",
                vec![
                    Value::Int64(2),
                    Value::Varchar("two".into()),
                    Value::Int64(1),
                    Value::Null,
                ],
            ))
            .try_collect()
            .await
            .expect("Could not run the statements");
        assert_eq!(results.len(), 4);
        assert_matches!(
            results[0],
            QueryResult::Affected(RowsAffected {
                last_affected_id: None,
                ..
            })
        );
        assert_matches!(
            results[1],
            QueryResult::Affected(RowsAffected {
                rows_affected: 2,
                last_affected_id: Some(2),
            })
        );
        let QueryResult::Row(first) = &results[2] else {
            panic!("Expected a row, got {:?}", results[2]);
        };
        assert_eq!(first.names(), ["a", "b"]);
        assert_eq!(first.values(), [Value::Int64(1), Value::Null]);
        let QueryResult::Row(second) = &results[3] else {
            panic!("Expected a row, got {:?}", results[3]);
        };
        assert_eq!(second.get_column("b"), Some(&Value::Varchar("two".into())));
    }

    #[tokio::test]
    async fn value_kinds() {
        init_logs();
        let mut connection = memory().await;
        let row = pin!(connection.fetch(Statement::new(
                "select ? as flag, ? as big, ? as ratio, ? as bytes, ? as stamp, ? as precise",
                vec![
                    Value::Boolean(true),
                    Value::UInt64(i64::MAX as u64),
                    Value::Float64(0.5),
                    Value::Blob(vec![1, 2, 3]),
                    Value::Timestamp(time::macros::datetime!(2025-01-02 03:04:05)),
                    Value::Timestamp(time::macros::datetime!(2025-01-02 03:04:05.25)),
                ],
            )))
            .try_next()
            .await
            .expect("Could not select the values")
            .expect("Expected a row");
        assert_eq!(
            row.values(),
            [
                Value::Int64(1),
                Value::Int64(i64::MAX),
                Value::Float64(0.5),
                Value::Blob(vec![1, 2, 3]),
                Value::Varchar("2025-01-02 03:04:05".into()),
                Value::Varchar("2025-01-02 03:04:05.25".into()),
            ]
        );
        silent_logs! {
            let result = connection
                .execute(Statement::new("select ?", vec![Value::UInt64(u64::MAX)]))
                .await;
            assert!(result.is_err(), "An u64 above i64::MAX cannot be bound");
        };
    }

    #[tokio::test]
    async fn argument_count() {
        init_logs();
        let mut connection = memory().await;
        silent_logs! {
            let error = connection
                .execute(Statement::new("select ?, ?", vec![Value::Int64(1)]))
                .await
                .expect_err("A missing argument should be reported");
            assert_matches!(
                error.downcast_ref::<OrmError>(),
                Some(OrmError::NotEnoughArguments(..))
            );
            let error = connection
                .execute(Statement::new("select ?", vec![Value::Int64(1), Value::Int64(2)]))
                .await
                .expect_err("An extra argument should be reported");
            assert_matches!(
                error.downcast_ref::<OrmError>(),
                Some(OrmError::TooManyArguments(..))
            );
        };
    }

    #[tokio::test]
    async fn locked_database() {
        init_logs();
        let path = env::temp_dir().join("quarry_locked.sqlite");
        if path.exists() {
            fs::remove_file(&path)
                .await
                .expect("Failed to remove the test database file");
        }
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let mut holder = SqliteConnection::connect(&url)
            .await
            .expect("Could not create the database");
        let mut waiter = SqliteConnection::connect(&url)
            .await
            .expect("Could not open the database again");
        holder
            .execute(Statement::new(
                "create table counters (value integer); begin immediate; insert into counters values (1);",
                vec![],
            ))
            .await
            .expect("Could not lock the database");
        silent_logs! {
            let result = timeout(
                Duration::from_secs(30),
                waiter.execute(Statement::new("insert into counters values (2)", vec![])),
            )
            .await
            .expect("A locked database should fail instead of waiting forever");
            assert!(result.is_err(), "The insert should fail while the database is locked");
        };
        holder
            .execute(Statement::new("rollback", vec![]))
            .await
            .expect("Could not release the lock");
        waiter
            .execute(Statement::new("insert into counters values (2)", vec![]))
            .await
            .expect("The insert should succeed once the lock is released");
        drop(holder);
        drop(waiter);
        fs::remove_file(&path)
            .await
            .expect("Failed to remove the test database file");
    }
}
