#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use indoc::indoc;
    use quarry_core::{
        Alias, ContextPool, FromTable, GroupBy, Having, Join, JoinCondition, Limit,
        MultiQueryOption, On, OrderBy, OrmError, QuerySpec, Select, SqlContext, SubQuery, Table,
        Using, Value, ValueGroup, Where, args, dialect_for, value_group,
    };

    fn context(driver: &str) -> SqlContext {
        SqlContext::new(driver, dialect_for(driver))
    }

    fn render(driver: &str, options: impl MultiQueryOption) -> (String, Vec<Value>) {
        let mut query = QuerySpec::default();
        options.apply_multi(&mut query);
        let mut context = context(driver);
        context.append(&query).expect("Failed to render the query");
        assert_eq!(context.placeholders(), context.arguments().len() as u64);
        (context.sql().to_string(), context.arguments().to_vec())
    }

    #[test]
    fn clause_arguments() {
        let mut context = context("postgres");
        context
            .write_clause("age > ? and id in ?", &args![18, value_group![1, 2, 3]])
            .unwrap();
        assert_eq!(context.sql(), "age > $1 and id in ($2, $3, $4)");
        assert_eq!(
            context.arguments(),
            [18, 1, 2, 3].map(Value::Int64)
        );
    }

    #[test]
    fn nested_value_groups() {
        let mut context = context("sqlite");
        context
            .write_clause(
                "(id, name) in ?",
                &args![value_group![value_group![1, "a"], value_group![2, "b"]]],
            )
            .unwrap();
        assert_eq!(context.sql(), "(id, name) in ((?, ?), (?, ?))");
        assert_eq!(
            context.arguments(),
            [
                Value::Int64(1),
                Value::Varchar("a".into()),
                Value::Int64(2),
                Value::Varchar("b".into()),
            ]
        );

        let mut context = self::context("oracle");
        let group: ValueGroup = ["x", "y"].into_iter().collect();
        assert_eq!(group.len(), 2);
        context.write_clause("code in ?", &args![group]).unwrap();
        assert_eq!(context.sql(), "code in (:1, :2)");

        let mut context = self::context("sqlite");
        context
            .append(&ValueGroup::default())
            .expect("An empty group renders nothing");
        assert_eq!(context.sql(), "");
    }

    #[test]
    fn argument_count_mismatch() {
        let mut context = context("sqlite");
        let error = context
            .write_clause("a = ? and b = ?", &args![1])
            .unwrap_err();
        assert_matches!(
            error.downcast_ref::<OrmError>(),
            Some(OrmError::NotEnoughArguments(clause)) if clause == "a = ? and b = ?"
        );
        let mut context = self::context("sqlite");
        let error = context.write_clause("a = ?", &args![1, 2]).unwrap_err();
        assert_matches!(
            error.downcast_ref::<OrmError>(),
            Some(OrmError::TooManyArguments(..))
        );
        let mut context = self::context("sqlite");
        assert!(context.write_clause("a is null", &[]).is_ok());
        assert_eq!(context.sql(), "a is null");
    }

    #[test]
    fn join_condition_keyword() {
        assert_eq!(
            JoinCondition::parse("using", ["id"]).unwrap(),
            JoinCondition::Using(vec!["id".into()])
        );
        assert_eq!(
            JoinCondition::parse("on", ["a.id = b.id", "a.kind = b.kind"]).unwrap(),
            JoinCondition::On(vec!["a.id = b.id".into(), "a.kind = b.kind".into()])
        );
        let error = JoinCondition::parse("natural", Vec::<String>::new()).unwrap_err();
        assert_matches!(
            error.downcast_ref::<OrmError>(),
            Some(OrmError::InvalidJoinConditionType(keyword)) if keyword == "natural"
        );
    }

    #[test]
    fn select_with_joins() {
        let (sql, arguments) = render(
            "postgres",
            (
                Select::new(["u.name", "count(o.id) as orders"]),
                FromTable::new((
                    Table::new("users"),
                    Alias::new("u"),
                    Join::left((
                        Table::new("orders"),
                        Alias::new("o"),
                        On::new(["o.user_id = u.id"]),
                    )),
                )),
                Where::new("u.age > ?", args![18]),
                GroupBy::new(["u.name"]),
                Having::new("count(o.id) > ?", args![2]),
                OrderBy::new(["orders desc"]),
                Limit(5),
            ),
        );
        assert_eq!(
            sql,
            indoc! {r#"
                select u.name, count(o.id) as orders from "users" as "u" left join "orders" as "o" on o.user_id = u.id where u.age > $1 group by "u"."name" having count(o.id) > $2 order by "orders" desc limit $3"#}
        );
        assert_eq!(
            arguments,
            [Value::Int64(18), Value::Int64(2), Value::Int64(5)]
        );

        let (sql, _) = render(
            "sqlite",
            (
                Select::new(["*"]),
                FromTable::new((
                    Table::new("users"),
                    Join::inner((Table::new("profiles"), Using::new(["user_id"]))),
                    Join::full((
                        Table::new("badges"),
                        JoinCondition::parse("on", ["badges.owner = users.id"]).unwrap(),
                    )),
                )),
            ),
        );
        assert_eq!(
            sql,
            "select * from `users` inner join `profiles` using (user_id) full join `badges` on badges.owner = users.id"
        );
    }

    #[test]
    fn sub_query_as_table() {
        let spent = SubQuery::new((
            Select::new(["user_id", "sum(total) as spent"]),
            FromTable::new(Table::new("orders")),
            GroupBy::new(["user_id"]),
        ));
        let (sql, arguments) = render(
            "sqlite",
            (
                Select::new(["s.user_id"]),
                FromTable::new((spent, Alias::new("s"))),
                Where::new("s.spent > ?", args![100]),
            ),
        );
        assert_eq!(
            sql,
            "select s.user_id from (select user_id, sum(total) as spent from `orders` group by `user_id`) as `s` where s.spent > ?"
        );
        assert_eq!(arguments, [Value::Int64(100)]);
    }

    #[test]
    fn sub_query_as_argument() {
        let buyers = SubQuery::new((
            Select::new(["user_id"]),
            FromTable::new(Table::new("orders")),
            Where::new("total > ?", args![50]),
        ));
        let (sql, arguments) = render(
            "postgres",
            (
                FromTable::new(Table::new("users")),
                Where::new("id in ? and active = ?", args![buyers, true]),
            ),
        );
        assert_eq!(
            sql,
            r#"select * from "users" where id in (select user_id from "orders" where total > $1) and active = $2"#
        );
        assert_eq!(arguments, [Value::Int64(50), Value::Boolean(true)]);
    }

    #[test]
    fn pooled_contexts_are_reused() {
        let pool = ContextPool::new("sqlite", dialect_for("sqlite"));
        assert_eq!(pool.idle(), 0);
        {
            let mut context = pool.acquire();
            context.write_str("select ").next_placeholder(Value::Int64(1));
            assert_eq!(context.sql(), "select ?");
        }
        assert_eq!(pool.idle(), 1);
        {
            let first = pool.acquire();
            assert_eq!(pool.idle(), 0);
            assert_eq!(first.sql(), "");
            assert!(first.arguments().is_empty());
            assert_eq!(first.placeholders(), 0);
            let second = pool.acquire();
            assert_eq!(second.driver(), "sqlite");
        }
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn pooled_buffers_are_kept() {
        let pool = ContextPool::new("postgres", dialect_for("postgres"));
        let (sql, arguments) = {
            let mut context = pool.acquire();
            context.write_str(&"x".repeat(500));
            for i in 0..40 {
                context.next_placeholder(Value::Int64(i));
            }
            (context.sql().as_ptr(), context.arguments().as_ptr())
        };
        let context = pool.acquire();
        assert_eq!(context.sql(), "");
        assert!(context.arguments().is_empty());
        assert_eq!(context.sql().as_ptr(), sql);
        assert_eq!(context.arguments().as_ptr(), arguments);
    }
}
