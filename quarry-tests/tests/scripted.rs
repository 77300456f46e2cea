#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use indoc::indoc;
    use quarry::{
        Database, DatabaseOptions, OrmError, QueryResult, Record, RowsAffected, Session,
        TransactionStep, Value, Where, args,
    };
    use quarry_tests::{init_logs, scripted::ScriptedConnection, silent_logs};

    #[derive(Record, Default, Debug, Clone, PartialEq)]
    #[record(table = "users")]
    struct User {
        id: i64,
        name: String,
    }

    #[derive(Record, Default, Debug, Clone, PartialEq)]
    #[record(table = "tags", primary_key = "code")]
    struct Tag {
        code: String,
        label: String,
    }

    async fn open(driver: &str) -> Database<ScriptedConnection> {
        Database::open(&format!("scripted://{}", driver), DatabaseOptions::new())
            .await
            .expect("Could not open the scripted database")
    }

    fn alice() -> User {
        User {
            name: "Alice".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn postgres_returning_key() {
        init_logs();
        let mut database = open("postgres").await;
        database.connection().respond_row(&["id"], vec![Value::Int64(42)]);
        let mut user = alice();
        let affected = database.insert(&mut user, ()).await.unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(affected.rows_affected, 1);
        let statements = database.connection().statements();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].sql,
            r#"insert into "users" ("name") values ($1) returning "id""#
        );
        assert_eq!(statements[0].arguments, [Value::Varchar("Alice".into())]);
    }

    #[tokio::test]
    async fn sqlserver_trailing_select() {
        init_logs();
        let mut database = open("mssql").await;
        database.connection().respond(vec![
            QueryResult::Affected(RowsAffected {
                rows_affected: 1,
                last_affected_id: None,
            }),
            QueryResult::Row(quarry::RowLabeled::new(
                ["last_id".to_string()].into(),
                Box::new([Value::Int64(7)]),
            )),
        ]);
        let mut user = alice();
        let affected = database.insert(&mut user, ()).await.unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(affected.rows_affected, 1);
        assert_eq!(
            database.connection().sql(),
            ["insert into [users] ([name]) values (@p1); select last_id = convert(bigint, SCOPE_IDENTITY())"]
        );
    }

    #[tokio::test]
    async fn sqlserver_text_key_is_not_selected_back() {
        init_logs();
        let mut database = open("sqlserver").await;
        database.connection().respond_affected(1, None);
        let mut tag = Tag {
            label: "Rust".into(),
            ..Default::default()
        };
        database.insert(&mut tag, ()).await.unwrap();
        assert_eq!(tag.code, "");
        assert_eq!(
            database.connection().sql(),
            ["insert into [tags] ([label]) values (@p1)"]
        );
    }

    #[tokio::test]
    async fn mysql_last_insert_id() {
        init_logs();
        let mut database = open("mysql").await;
        database.connection().respond_affected(1, Some(9));
        let mut user = alice();
        database.insert(&mut user, ()).await.unwrap();
        assert_eq!(user.id, 9);
        assert_eq!(
            database.connection().sql(),
            ["insert into `users` (`name`) values (?)"]
        );

        // Keys already set are not read back
        database.connection().clear();
        database.connection().respond_affected(1, Some(100));
        let mut user = User {
            id: 3,
            name: "Bob".into(),
        };
        database.insert(&mut user, ()).await.unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(
            database.connection().sql(),
            ["insert into `users` (`id`, `name`) values (?, ?)"]
        );
    }

    #[tokio::test]
    async fn missing_key_is_not_an_error() {
        init_logs();
        let mut database = open("postgres").await;
        let mut user = alice();
        silent_logs! {
            let affected = database.insert(&mut user, ()).await;
            assert_matches!(affected, Ok(..));
        };
        assert_eq!(user.id, 0);
    }

    #[tokio::test]
    async fn empty_insert() {
        init_logs();
        let mut database = open("mysql").await;
        database.connection().respond_affected(1, Some(1));
        database.insert_only(&User::default(), ()).await.unwrap();
        let mut database = open("sqlite").await;
        database.connection().respond_affected(1, Some(1));
        database.insert_only(&User::default(), ()).await.unwrap();
        let mut database = open("postgres").await;
        database.connection().respond_row(&["id"], vec![Value::Int64(5)]);
        let mut user = User::default();
        database.insert(&mut user, ()).await.unwrap();
        assert_eq!(user.id, 5);
        assert_eq!(
            database.connection().sql(),
            [r#"insert into "users" default values returning "id""#]
        );
    }

    #[tokio::test]
    async fn update_without_columns_sends_nothing() {
        init_logs();
        let mut database = open("postgres").await;
        let affected = database
            .update(
                &User {
                    id: 4,
                    ..Default::default()
                },
                (),
            )
            .await
            .unwrap();
        assert_eq!(affected, RowsAffected::default());
        assert!(database.connection().statements().is_empty());
    }

    #[tokio::test]
    async fn query_and_delete_rendering() {
        init_logs();
        let mut database = open("postgres").await;
        database
            .connection()
            .respond_row(&["id", "name"], vec![Value::Int64(1), Value::Varchar("Alice".into())]);
        let mut user = User::default();
        let exists = database
            .query(&mut user, Where::new("name = ?", args!["Alice"]))
            .await
            .unwrap();
        assert!(exists);
        assert_eq!(
            user,
            User {
                id: 1,
                name: "Alice".into()
            }
        );
        database.delete_record(&user).await.unwrap();
        assert_eq!(
            database.connection().sql(),
            [
                r#"select "id", "name" from "users" where name = $1 limit $2"#,
                r#"delete from "users" where "id" = $1"#,
            ]
        );
        assert_eq!(
            database.connection().statements()[0].arguments,
            [Value::Varchar("Alice".into()), Value::Int64(1)]
        );
    }

    #[tokio::test]
    async fn oracle_naming_and_pagination() {
        init_logs();
        let mut database = open("oracle").await;
        let mut users: Vec<User> = Vec::new();
        database
            .query_multiple(
                &mut users,
                (
                    quarry::OrderBy::new(["NAME"]),
                    quarry::Limit(10),
                    quarry::Offset(20),
                ),
            )
            .await
            .unwrap();
        assert!(users.is_empty());
        assert_eq!(
            database.connection().sql(),
            [indoc! {r#"
                select "ID", "NAME" from "users" order by "NAME" offset :1 rows fetch next :2 rows only"#}]
        );
    }

    #[tokio::test]
    async fn transaction_steps() {
        init_logs();
        let mut database = open("mssql").await;

        let step = database
            .run_transaction(|tx| {
                Box::pin(async move {
                    tx.raw_execute("update users set name = 'x'", vec![]).await?;
                    Ok(true)
                })
            })
            .await
            .unwrap();
        assert_eq!(step, TransactionStep::End);
        assert_eq!(
            database.connection().sql(),
            ["BEGIN TRANSACTION", "update users set name = 'x'", "COMMIT"]
        );

        database.connection().clear();
        let step = database
            .run_transaction(|_| Box::pin(async move { Ok(false) }))
            .await
            .unwrap();
        assert_eq!(step, TransactionStep::End);
        assert_eq!(
            database.connection().sql(),
            ["BEGIN TRANSACTION", "ROLLBACK"]
        );

        database.connection().clear();
        database
            .connection()
            .respond(vec![])
            .fail("deadlock victim");
        silent_logs! {
            let error = database
                .run_transaction(|tx| {
                    Box::pin(async move {
                        tx.raw_execute("update users set name = 'y'", vec![]).await?;
                        Ok(true)
                    })
                })
                .await
                .unwrap_err();
            assert_eq!(error.step, TransactionStep::Run);
            assert!(format!("{:#}", error.error).contains("deadlock victim"));
        };
        assert_eq!(
            database.connection().sql(),
            ["BEGIN TRANSACTION", "update users set name = 'y'", "ROLLBACK"]
        );

        database.connection().clear();
        database.connection().fail("database is locked");
        silent_logs! {
            let error = database
                .run_transaction(|_| Box::pin(async move { Ok(true) }))
                .await
                .unwrap_err();
            assert_eq!(error.step, TransactionStep::Begin);
        };

        database.connection().clear();
        database
            .connection()
            .respond(vec![])
            .respond(vec![])
            .fail("serialization failure");
        silent_logs! {
            let error = database
                .run_transaction(|tx| {
                    Box::pin(async move {
                        tx.raw_execute("update users set name = 'z'", vec![]).await?;
                        Ok(true)
                    })
                })
                .await
                .unwrap_err();
            assert_eq!(error.step, TransactionStep::Commit);
        };
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            let result =
                Database::<ScriptedConnection>::open("scripted://nosuchdb", DatabaseOptions::new())
                    .await;
            assert!(result.is_err());
        };
    }

    #[tokio::test]
    async fn invalid_key_type() {
        #[derive(Record, Default)]
        #[record(table = "floats")]
        struct Floating {
            id: f64,
        }
        init_logs();
        let mut database = open("postgres").await;
        silent_logs! {
            let error = database
                .update(&Floating { id: 1.5 }, ())
                .await
                .unwrap_err();
            assert_matches!(
                error.downcast_ref::<OrmError>(),
                Some(OrmError::InvalidPrimaryKeyType(..))
            );
        };
    }
}
