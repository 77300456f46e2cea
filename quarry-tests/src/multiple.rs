use crate::silent_logs;
use quarry::{
    Alias, Argument, Connection, Database, FromTable, GroupBy, Having, Join, Limit, On, OrderBy,
    Record, RetrieveUnused, Select, Session, SubQuery, Table, Value, ValueGroup, Where, args,
    value_group,
};
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};
use tokio::sync::Mutex;

#[derive(Record, Default, Debug, Clone, PartialEq)]
#[record(table = "multiple_items")]
pub struct Item {
    pub id: i64,
    pub label: String,
    pub price: f64,
    pub category: String,
}

#[derive(Record, Default, Debug, Clone, PartialEq)]
#[record(table = "multiple_items")]
struct CategoryTotal {
    category: String,
    total: f64,
}

#[derive(Record, Default, Debug, Clone, PartialEq)]
#[record(table = "multiple_items")]
struct Tagged {
    label: String,
    tag: String,
}

const CREATE_ITEMS: &str = "
    create table if not exists multiple_items (
        id integer primary key,
        label text not null,
        price real not null default 0,
        category text not null default ''
    )";

const CREATE_TAGS: &str = "
    create table if not exists multiple_tags (
        item_id integer not null,
        tag text not null
    )";

fn labels<'a>(items: impl IntoIterator<Item = &'a Item>) -> Vec<&'a str> {
    items.into_iter().map(|v| v.label.as_str()).collect()
}

pub async fn multiple<C: Connection>(database: &mut Database<C>) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    // Setup
    database
        .raw_execute(CREATE_ITEMS, vec![])
        .await
        .expect("Failed to create the multiple_items table");
    database
        .raw_execute(CREATE_TAGS, vec![])
        .await
        .expect("Failed to create the multiple_tags table");
    database
        .delete("multiple_items", ())
        .await
        .expect("Failed to clear the multiple_items table");
    database
        .delete("multiple_tags", ())
        .await
        .expect("Failed to clear the multiple_tags table");
    let mut inserted = Vec::new();
    for (label, price, category) in [
        ("hammer", 12.5, "tools"),
        ("wrench", 8.0, "tools"),
        ("saw", 21.0, "tools"),
        ("apple", 0.5, "food"),
        ("bread", 2.5, "food"),
        ("lamp", 30.0, "home"),
    ] {
        let mut item = Item {
            label: label.into(),
            price,
            category: category.into(),
            ..Default::default()
        };
        database
            .insert(&mut item, ())
            .await
            .expect("Failed to insert an item");
        inserted.push(item);
    }
    database
        .raw_execute(
            "insert into multiple_tags (item_id, tag) values (?, ?), (?, ?)",
            vec![
                Value::Int64(inserted[0].id),
                Value::Varchar("heavy".into()),
                Value::Int64(inserted[5].id),
                Value::Varchar("bright".into()),
            ],
        )
        .await
        .expect("Failed to insert the tags");

    // Everything
    let mut items: Vec<Item> = Vec::new();
    database
        .query_multiple(&mut items, OrderBy::new(["id"]))
        .await
        .expect("Failed to query all the items");
    assert_eq!(items, inserted);

    // Results are appended
    database
        .query_multiple(&mut items, Where::new("category = ?", args!["home"]))
        .await
        .expect("Failed to query the home items");
    assert_eq!(items.len(), 7);
    assert_eq!(items[6].label, "lamp");

    // Filter, order and limit
    let mut items: Vec<Item> = Vec::new();
    database
        .query_multiple(
            &mut items,
            (
                Where::new("category = ?", args!["tools"]),
                OrderBy::new(["price desc"]),
                Limit(2),
            ),
        )
        .await
        .expect("Failed to query the most expensive tools");
    assert_eq!(labels(&items), ["saw", "hammer"]);

    // Value groups
    let ids: ValueGroup = inserted[1..4].iter().map(|v| v.id).collect();
    let mut items: Vec<Arc<Item>> = Vec::new();
    database
        .query_multiple(
            &mut items,
            (
                Where::new("id in ? and price < ?", vec![ids.into(), 20.into()]),
                OrderBy::new(["id"]),
            ),
        )
        .await
        .expect("Failed to query by a group of ids");
    assert_eq!(labels(items.iter().map(|v| &**v)), ["wrench", "apple"]);

    // Tuple comparison
    let mut items: Vec<Item> = Vec::new();
    database
        .query_multiple(
            &mut items,
            Where::new(
                "(category, label) in (values ?, ?)",
                args![value_group!["food", "bread"], value_group!["home", "lamp"]],
            ),
        )
        .await
        .expect("Failed to query by tuples");
    items.sort_by_key(|v| v.id);
    assert_eq!(labels(&items), ["bread", "lamp"]);

    // Aggregates
    let mut totals: Vec<CategoryTotal> = Vec::new();
    database
        .query_multiple(
            &mut totals,
            (
                Select::new(["category", "sum(price) as total"]),
                GroupBy::new(["category"]),
                Having::new("count(*) > ?", args![1]),
                OrderBy::new(["category"]),
            ),
        )
        .await
        .expect("Failed to query the totals");
    assert_eq!(
        totals,
        [
            CategoryTotal {
                category: "food".into(),
                total: 3.0,
            },
            CategoryTotal {
                category: "tools".into(),
                total: 41.5,
            },
        ]
    );

    // Joins
    let mut tagged: Vec<Tagged> = Vec::new();
    database
        .query_multiple(
            &mut tagged,
            (
                Select::new(["i.label as label", "t.tag as tag"]),
                FromTable::new((
                    Table::new("multiple_items"),
                    Alias::new("i"),
                    Join::inner((
                        Table::new("multiple_tags"),
                        Alias::new("t"),
                        On::new(["t.item_id = i.id"]),
                    )),
                )),
                OrderBy::new(["label"]),
            ),
        )
        .await
        .expect("Failed to query the tagged items");
    assert_eq!(
        tagged,
        [
            Tagged {
                label: "hammer".into(),
                tag: "heavy".into(),
            },
            Tagged {
                label: "lamp".into(),
                tag: "bright".into(),
            },
        ]
    );

    // Sub-queries, as table and as argument
    let mut items: Vec<Item> = Vec::new();
    database
        .query_multiple(
            &mut items,
            (
                FromTable::new((
                    SubQuery::new((
                        Select::new(["*"]),
                        FromTable::new(Table::new("multiple_items")),
                        Where::new("price > ?", args![10]),
                    )),
                    Alias::new("expensive"),
                )),
                Where::new(
                    "category in ?",
                    vec![Argument::from(SubQuery::new((
                        Select::new(["category"]),
                        FromTable::new(Table::new("multiple_items")),
                        Where::new("label = ?", args!["lamp"]),
                    )))],
                ),
            ),
        )
        .await
        .expect("Failed to query through sub-queries");
    assert_eq!(labels(&items), ["lamp"]);

    // Unmapped columns
    let mut item = Item::default();
    let mut unused = HashMap::new();
    let exists = database
        .query(
            &mut item,
            (
                Select::new(["id", "label", "price", "category", "price * 2 as double_price"]),
                Where::new("label = ?", args!["saw"]),
                RetrieveUnused(&mut unused),
            ),
        )
        .await
        .expect("Failed to query the saw");
    assert!(exists);
    assert_eq!(item, inserted[2]);
    assert_eq!(unused.len(), 1);
    assert_eq!(unused.get("double_price"), Some(&Value::Float64(42.0)));

    // A failing query appends nothing
    let mut items = vec![inserted[0].clone()];
    silent_logs! {
        database
            .query_multiple(&mut items, Where::new("no_such_column = ?", args![1]))
            .await
            .expect_err("The query should fail");
    };
    assert_eq!(items.len(), 1);
    let mut items: Vec<Item> = Vec::new();
    silent_logs! {
        database
            .query_multiple(&mut items, Where::new("label = ? and price = ?", args!["saw"]))
            .await
            .expect_err("A missing argument should be rejected");
    };
    assert!(items.is_empty());
}
