#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use quarry::{
        Crud, Executor, IncludingZeros, OrmError, QueryResult, Record, Result, RowsAffected,
        Statement, Value, Where, WithColumns, args, dialect_for,
        stream::{self, Stream},
    };
    use std::mem;

    #[derive(Record, Default, Debug, Clone, PartialEq)]
    #[record(table = "users")]
    struct User {
        id: i64,
        name: String,
        age: u8,
        #[record(column = "mail")]
        email: Option<String>,
    }

    #[derive(Default)]
    struct Recorder {
        statements: Vec<Statement>,
        next: Vec<QueryResult>,
    }

    impl Executor for Recorder {
        fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
            self.statements.push(statement);
            stream::iter(mem::take(&mut self.next).into_iter().map(Ok))
        }
    }

    fn crud(driver: &str) -> Crud {
        Crud::with_dialect(driver, dialect_for(driver))
    }

    fn bob() -> User {
        User {
            id: 3,
            name: "Bob".into(),
            age: 0,
            email: None,
        }
    }

    #[test]
    fn update_skips_zero_fields() {
        let statement = crud("postgres")
            .render_update(&bob(), ())
            .unwrap()
            .expect("The name should be written");
        assert_eq!(
            statement,
            Statement::new(
                r#"update "users" set "name" = $1 where "id" = $2"#,
                vec![Value::Varchar("Bob".into()), Value::Int64(3)]
            )
        );
    }

    #[test]
    fn update_selected_columns() {
        let crud = crud("mssql");
        let statement = crud
            .render_update(&bob(), (WithColumns::new(["age", "mail"]), IncludingZeros))
            .unwrap()
            .expect("Zeros are included");
        assert_eq!(
            statement.sql,
            "update [users] set [age] = @p1, [mail] = @p2 where [id] = @p3"
        );
        assert_eq!(
            statement.arguments,
            [Value::Int64(0), Value::Null, Value::Int64(3)]
        );

        // Zero fields only, nothing left to write
        assert_eq!(
            crud.render_update(&bob(), WithColumns::new(["age"])).unwrap(),
            None
        );

        // The key is never written
        let statement = crud
            .render_update(&bob(), WithColumns::new(["id", "name"]))
            .unwrap()
            .expect("The name is written");
        assert_eq!(
            statement.sql,
            "update [users] set [name] = @p1 where [id] = @p2"
        );
    }

    #[test]
    fn update_errors() {
        let crud = crud("sqlite");
        let error = crud
            .render_update(&bob(), WithColumns::new(["email"]))
            .unwrap_err();
        assert_eq!(
            error.downcast_ref::<OrmError>(),
            Some(&OrmError::UnknownColumn("email".into()))
        );
        let error = crud.render_update(&User::default(), ()).unwrap_err();
        assert_matches!(
            error.downcast_ref::<OrmError>(),
            Some(OrmError::EmptyPrimaryKey(column)) if column == "id"
        );
    }

    #[test]
    fn default_query() {
        let crud = crud("oracle");
        let metadata = crud.metadata::<User>().unwrap();
        let statement = crud.render(&crud.default_query(&metadata)).unwrap();
        assert_eq!(
            statement.sql,
            r#"select "ID", "NAME", "AGE", "mail" from "users""#
        );
        assert!(statement.arguments.is_empty());
    }

    #[tokio::test]
    async fn save_inserts_or_updates() {
        let crud = crud("sqlite");
        let mut executor = Recorder::default();
        executor.next = vec![QueryResult::Affected(RowsAffected {
            rows_affected: 1,
            last_affected_id: Some(11),
        })];
        let mut user = User {
            name: "Carol".into(),
            age: 41,
            ..Default::default()
        };
        crud.save(&mut executor, &mut user, ()).await.unwrap();
        assert_eq!(user.id, 11);
        user.email = Some("carol@example.com".into());
        crud.save(&mut executor, &mut user, ()).await.unwrap();
        assert_eq!(
            executor
                .statements
                .iter()
                .map(|v| v.sql.as_str())
                .collect::<Vec<_>>(),
            [
                "insert into `users` (`name`, `age`) values (?, ?)",
                "update `users` set `name` = ?, `age` = ?, `mail` = ? where `id` = ?",
            ]
        );
        assert_eq!(
            executor.statements[1].arguments,
            [
                Value::Varchar("Carol".into()),
                Value::Int64(41),
                Value::Varchar("carol@example.com".into()),
                Value::Int64(11),
            ]
        );
    }

    #[tokio::test]
    async fn delete_statements() {
        let crud = crud("postgres");
        let mut executor = Recorder::default();
        crud.delete(&mut executor, "public.users", Where::new("age < ?", args![18]))
            .await
            .unwrap();
        crud.delete(&mut executor, "users", ()).await.unwrap();
        crud.delete_record(&mut executor, &bob()).await.unwrap();
        let error = crud
            .delete_record(&mut executor, &User::default())
            .await
            .unwrap_err();
        assert_matches!(
            error.downcast_ref::<OrmError>(),
            Some(OrmError::EmptyPrimaryKey(..))
        );
        assert_eq!(
            executor
                .statements
                .iter()
                .map(|v| v.sql.as_str())
                .collect::<Vec<_>>(),
            [
                r#"delete from "public"."users" where age < $1"#,
                r#"delete from "users""#,
                r#"delete from "users" where "id" = $1"#,
            ]
        );
    }
}
