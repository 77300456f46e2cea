use quarry::{Connection, Database, Limit, Offset, OrderBy, Record, Session, Value, Where, args};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Record, Default, Debug, Clone, PartialEq)]
#[record(table = "limits_numbers", primary_key = "value")]
struct Number {
    value: i64,
    square: i64,
}

pub async fn limits<C: Connection>(database: &mut Database<C>) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    database
        .raw_execute(
            "create table if not exists limits_numbers (value integer primary key, square integer not null)",
            vec![],
        )
        .await
        .expect("Failed to create the limits_numbers table");
    database
        .delete("limits_numbers", ())
        .await
        .expect("Failed to clear the limits_numbers table");
    for value in 1..=10 {
        database
            .insert_only(
                &Number {
                    value,
                    square: value * value,
                },
                (),
            )
            .await
            .expect("Failed to insert a number");
    }

    let values = |numbers: &[Number]| numbers.iter().map(|v| v.value).collect::<Vec<_>>();

    let mut numbers: Vec<Number> = Vec::new();
    database
        .query_multiple(&mut numbers, (OrderBy::new(["value"]), Limit(3)))
        .await
        .expect("Failed to query with a limit");
    assert_eq!(values(&numbers), [1, 2, 3]);

    let mut numbers: Vec<Number> = Vec::new();
    database
        .query_multiple(&mut numbers, (OrderBy::new(["value"]), Limit(3), Offset(4)))
        .await
        .expect("Failed to query with a limit and an offset");
    assert_eq!(values(&numbers), [5, 6, 7]);

    // Offset alone
    let mut numbers: Vec<Number> = Vec::new();
    database
        .query_multiple(&mut numbers, (OrderBy::new(["value desc"]), Offset(7)))
        .await
        .expect("Failed to query with an offset only");
    assert_eq!(values(&numbers), [3, 2, 1]);

    // Single queries read the first row only
    let mut number = Number::default();
    let exists = database
        .query(
            &mut number,
            (
                Where::new("square > ?", args![20]),
                OrderBy::new(["square"]),
                Offset(1),
            ),
        )
        .await
        .expect("Failed to query a single number");
    assert!(exists);
    assert_eq!(
        number,
        Number {
            value: 6,
            square: 36
        }
    );

    let row = database
        .raw_query_row(
            "select max(square) as largest from limits_numbers where value < ?",
            vec![Value::Int64(4)],
        )
        .await
        .expect("Failed to query the largest square")
        .expect("An aggregate always returns a row");
    assert_eq!(row.values(), [Value::Int64(9)]);
}
