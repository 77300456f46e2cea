#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use quarry_core::{
        GeneratedKey, MYSQL_UNLIMITED, Naming, OrmError, Placeholder, PostgresDialect, Quoter,
        SqlContext, Value, dialect_for, register_dialect,
    };
    use std::sync::Arc;

    fn paginate(driver: &str, order_by: &[&str], limit: u64, offset: u64) -> (String, Vec<Value>) {
        let order_by: Vec<String> = order_by.iter().map(|v| v.to_string()).collect();
        let mut context = SqlContext::new(driver, dialect_for(driver));
        context.write_pagination(&order_by, limit, offset);
        (context.sql().to_string(), context.arguments().to_vec())
    }

    #[test]
    fn naming_conventions() {
        let cases = [
            ("UserName", "user_name", "USER_NAME", "userName"),
            ("APIResponse", "api_response", "API_RESPONSE", "apiResponse"),
            ("userID", "user_id", "USER_ID", "userId"),
            ("HTTPServer2", "http_server2", "HTTP_SERVER2", "httpServer2"),
            ("id", "id", "ID", "id"),
        ];
        for (name, snake, upper_snake, camel) in cases {
            assert_eq!(Naming::Snake.convert(name), snake, "snake of {name}");
            assert_eq!(Naming::UpperSnake.convert(name), upper_snake, "upper snake of {name}");
            assert_eq!(Naming::Camel.convert(name), camel, "camel of {name}");
        }
        assert_eq!(Naming::Snake.convert("LinuxMOTD"), "linux_motd");
        assert_eq!(Naming::Snake.convert("WWoof"), "w_woof");
        assert_eq!(Naming::Snake.convert("OMGWTFBBQ"), "omgwtfbbq");
        assert_eq!(Naming::Snake.convert("already_snake"), "already_snake");
        assert_eq!(Naming::default(), Naming::Snake);
    }

    #[test]
    fn quoting() {
        assert_eq!(Quoter::DOUBLE_QUOTES.quote("users"), r#""users""#);
        assert_eq!(
            Quoter::DOUBLE_QUOTES.quote("public.users"),
            r#""public"."users""#
        );
        assert_eq!(Quoter::BRACKETS.quote("dbo.users"), "[dbo].[users]");
        assert_eq!(Quoter::BACKTICKS.quote("u.name"), "`u`.`name`");
        assert_eq!(Quoter::NO_QUOTES.quote("u.name"), "u.name");
        assert_eq!(Quoter::NO_QUOTES.quote(""), "");

        // Already quoted segments are kept
        assert_eq!(Quoter::DOUBLE_QUOTES.quote(r#""users""#), r#""users""#);
        assert_eq!(Quoter::BRACKETS.quote("[dbo].users"), "[dbo].[users]");
        let once = Quoter::BACKTICKS.quote("main.items");
        assert_eq!(Quoter::BACKTICKS.quote(&once), once);
    }

    #[test]
    fn placeholders() {
        assert_eq!(Placeholder::QuestionMark.render(3), "?");
        assert_eq!(Placeholder::Dollar.render(3), "$3");
        assert_eq!(Placeholder::Colon.render(12), ":12");
        assert_eq!(Placeholder::AtP.render(1), "@p1");
    }

    #[test]
    fn registered_dialects() {
        for (driver, name) in [
            ("sqlite", "sqlite"),
            ("sqlite3", "sqlite"),
            ("mysql", "mysql"),
            ("pgx", "postgres"),
            ("postgres", "postgres"),
            ("mssql", "sqlserver"),
            ("sqlserver", "sqlserver"),
            ("oracle", "oracle"),
            ("oci8", "oracle"),
            ("nosuchdriver", "generic"),
        ] {
            assert_eq!(dialect_for(driver).name(), name, "dialect of {driver}");
        }
        let oracle = dialect_for("oracle");
        assert_eq!(oracle.naming(), Naming::UpperSnake);
        assert_eq!(oracle.placeholder(), Placeholder::Colon);
        assert_eq!(dialect_for("postgres").generated_key(), GeneratedKey::Returning);
        assert_eq!(
            dialect_for("mssql").generated_key(),
            GeneratedKey::TrailingSelect
        );
        assert_eq!(dialect_for("mysql").generated_key(), GeneratedKey::LastInsertId);
        assert_eq!(dialect_for("nosuchdriver").quote("a.b"), "a.b");
    }

    #[test]
    fn register_dialect_once() {
        register_dialect("cockroach", Arc::new(PostgresDialect)).unwrap();
        assert_eq!(dialect_for("cockroach").placeholder(), Placeholder::Dollar);
        let error = register_dialect("cockroach", Arc::new(PostgresDialect)).unwrap_err();
        assert_matches!(
            error.downcast_ref::<OrmError>(),
            Some(OrmError::AlreadyRegistered(name)) if name == "cockroach"
        );
        // Built-in names cannot be rebound either
        assert!(register_dialect("sqlite", Arc::new(PostgresDialect)).is_err());
        assert_eq!(dialect_for("sqlite").name(), "sqlite");
    }

    #[test]
    fn transaction_statements() {
        let mut out = String::new();
        dialect_for("mssql").write_transaction_begin(&mut out);
        assert_eq!(out, "BEGIN TRANSACTION");
        let mut out = String::new();
        dialect_for("postgres").write_transaction_begin(&mut out);
        assert_eq!(out, "BEGIN");
        let mut out = String::new();
        dialect_for("oracle").write_transaction_rollback(&mut out);
        assert_eq!(out, "ROLLBACK");
    }

    #[test]
    fn limit_and_offset() {
        assert_eq!(
            paginate("postgres", &["id"], 10, 20),
            (
                r#" order by "id" limit $1 offset $2"#.to_string(),
                vec![Value::Int64(10), Value::Int64(20)]
            )
        );
        assert_eq!(
            paginate("sqlite", &["name desc"], 10, 0),
            (
                " order by `name` desc limit ?".to_string(),
                vec![Value::Int64(10)]
            )
        );
        assert_eq!(paginate("postgres", &[], 0, 0), (String::new(), vec![]));
    }

    #[test]
    fn offset_without_limit() {
        assert_eq!(
            paginate("sqlite", &[], 0, 5),
            (
                " limit ? offset ?".to_string(),
                vec![Value::Int64(-1), Value::Int64(5)]
            )
        );
        assert_eq!(
            paginate("mysql", &[], 0, 5),
            (
                " limit ? offset ?".to_string(),
                vec![Value::UInt64(MYSQL_UNLIMITED), Value::Int64(5)]
            )
        );
        assert_eq!(
            paginate("postgres", &[], 0, 5),
            (" offset $1".to_string(), vec![Value::Int64(5)])
        );
    }

    #[test]
    fn sqlserver_pagination() {
        assert_eq!(
            paginate("mssql", &[], 10, 0),
            (
                " order by 1 offset @p1 rows fetch next @p2 rows only".to_string(),
                vec![Value::Int64(0), Value::Int64(10)]
            )
        );
        assert_eq!(
            paginate("mssql", &["name desc"], 0, 4),
            (
                " order by [name] desc offset @p1 rows".to_string(),
                vec![Value::Int64(4)]
            )
        );
        assert_eq!(
            paginate("mssql", &["name"], 0, 0),
            (" order by [name]".to_string(), vec![])
        );
        assert_eq!(paginate("mssql", &[], 0, 0), (String::new(), vec![]));
    }

    #[test]
    fn oracle_pagination() {
        assert_eq!(
            paginate("oracle", &["NAME"], 5, 10),
            (
                r#" order by "NAME" offset :1 rows fetch next :2 rows only"#.to_string(),
                vec![Value::Int64(10), Value::Int64(5)]
            )
        );
        assert_eq!(
            paginate("oracle", &[], 3, 0),
            (
                " fetch next :1 rows only".to_string(),
                vec![Value::Int64(3)]
            )
        );
    }
}
