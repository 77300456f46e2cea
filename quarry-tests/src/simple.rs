use crate::silent_logs;
use quarry::{
    Connection, Database, IncludingZeros, OrmError, Record, Session, Where, WithColumns,
    ZERO_TIMESTAMP, args,
};
use std::sync::LazyLock;
use time::{PrimitiveDateTime, macros::datetime};
use tokio::sync::Mutex;

#[derive(Record, Debug, Clone, PartialEq)]
#[record(table = "simple_users")]
pub struct SimpleUser {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub age: u8,
    pub active: bool,
    pub score: f64,
    pub joined: PrimitiveDateTime,
}

impl Default for SimpleUser {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            email: None,
            age: 0,
            active: false,
            score: 0.0,
            joined: ZERO_TIMESTAMP,
        }
    }
}

const CREATE: &str = "
    create table if not exists simple_users (
        id integer primary key,
        name text not null default '',
        email text,
        age integer not null default 0,
        active integer not null default 0,
        score real not null default 0,
        joined text not null default '0001-01-01 00:00:00'
    )";

pub async fn simple<C: Connection>(database: &mut Database<C>) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    // Setup
    database
        .raw_execute(CREATE, vec![])
        .await
        .expect("Failed to create the simple_users table");
    database
        .delete("simple_users", ())
        .await
        .expect("Failed to clear the simple_users table");

    // Insert reads back the generated key
    let mut alice = SimpleUser {
        name: "Alice".into(),
        email: Some("alice@example.com".into()),
        age: 31,
        active: true,
        score: 4.5,
        joined: datetime!(2024-03-01 10:30:00),
        ..Default::default()
    };
    let affected = database
        .insert(&mut alice, ())
        .await
        .expect("Failed to insert Alice");
    assert_eq!(affected.rows_affected, 1);
    assert_ne!(alice.id, 0, "The generated key should be assigned");

    // Query by key
    let mut found = SimpleUser::default();
    let exists = database
        .query(&mut found, Where::new("id = ?", args![alice.id]))
        .await
        .expect("Failed to query Alice");
    assert!(exists);
    assert_eq!(found, alice);

    // No row leaves the record untouched
    let mut missing = SimpleUser {
        name: "untouched".into(),
        ..Default::default()
    };
    let exists = database
        .query(&mut missing, Where::new("name = ?", args!["Nobody"]))
        .await
        .expect("Failed to query a missing user");
    assert!(!exists);
    assert_eq!(missing.name, "untouched");

    // Zero fields are not written by an update
    alice.name = "Alice B.".into();
    alice.email = None;
    let affected = database
        .update(&alice, ())
        .await
        .expect("Failed to update Alice");
    assert_eq!(affected.rows_affected, 1);
    let mut found = SimpleUser::default();
    database
        .query(&mut found, Where::new("id = ?", args![alice.id]))
        .await
        .expect("Failed to query Alice after the update");
    assert_eq!(found.name, "Alice B.");
    assert_eq!(found.email.as_deref(), Some("alice@example.com"));

    // Unless requested
    database
        .update(&alice, (WithColumns::new(["email"]), IncludingZeros))
        .await
        .expect("Failed to clear the email of Alice");
    let mut found = SimpleUser::default();
    database
        .query(&mut found, Where::new("id = ?", args![alice.id]))
        .await
        .expect("Failed to query Alice after clearing the email");
    assert_eq!(found, alice);

    // Nothing to write, nothing sent
    let only_key = SimpleUser {
        id: alice.id,
        ..Default::default()
    };
    let affected = database
        .update(&only_key, ())
        .await
        .expect("An update without columns should succeed");
    assert_eq!(affected.rows_affected, 0);

    // Save inserts new records and updates stored ones
    let mut bob = SimpleUser {
        name: "Bob".into(),
        age: 45,
        ..Default::default()
    };
    database.save(&mut bob, ()).await.expect("Failed to save Bob");
    assert_ne!(bob.id, 0);
    assert_ne!(bob.id, alice.id);
    bob.score = 2.25;
    let affected = database
        .save(&mut bob, ())
        .await
        .expect("Failed to save Bob again");
    assert_eq!(affected.rows_affected, 1);
    let mut found = SimpleUser::default();
    database
        .query(&mut found, Where::new("id = ?", args![bob.id]))
        .await
        .expect("Failed to query Bob");
    assert_eq!(found, bob);
    assert!(!found.active);
    assert_eq!(found.joined, ZERO_TIMESTAMP);

    // Fractions of second are kept
    let mut carol = SimpleUser {
        name: "Carol".into(),
        joined: datetime!(2024-03-05 10:20:30.456),
        ..Default::default()
    };
    database
        .insert(&mut carol, ())
        .await
        .expect("Failed to insert Carol");
    let mut found = SimpleUser::default();
    database
        .query(&mut found, Where::new("id = ?", args![carol.id]))
        .await
        .expect("Failed to query Carol");
    assert_eq!(found, carol);
    database
        .raw_execute(
            "update simple_users set joined = strftime('%Y-%m-%d %H:%M:%f', '2024-03-05 10:20:31.789') where id = ?",
            vec![quarry::Value::Int64(carol.id)],
        )
        .await
        .expect("Failed to update the joined time of Carol");
    database
        .query(&mut found, Where::new("id = ?", args![carol.id]))
        .await
        .expect("Failed to query Carol after the update");
    assert_eq!(found.joined, datetime!(2024-03-05 10:20:31.789));
    database
        .delete_record(&carol)
        .await
        .expect("Failed to delete Carol");

    // Unknown columns are rejected before anything is sent
    silent_logs! {
        let error = database
            .update(&bob, WithColumns::new(["nickname"]))
            .await
            .expect_err("An unknown column should be rejected");
        assert!(matches!(
            error.downcast_ref::<OrmError>(),
            Some(OrmError::UnknownColumn(column)) if column == "nickname"
        ));
    };

    // Zero key
    silent_logs! {
        let error = database
            .update(&SimpleUser::default(), ())
            .await
            .expect_err("A zero key should be rejected");
        assert!(matches!(
            error.downcast_ref::<OrmError>(),
            Some(OrmError::EmptyPrimaryKey(..))
        ));
    };

    // Delete
    let affected = database
        .delete_record(&bob)
        .await
        .expect("Failed to delete Bob");
    assert_eq!(affected.rows_affected, 1);
    let mut found = SimpleUser::default();
    let exists = database
        .query(&mut found, Where::new("id = ?", args![bob.id]))
        .await
        .expect("Failed to query Bob after the delete");
    assert!(!exists);
    let affected = database
        .delete("simple_users", Where::new("age > ?", args![30]))
        .await
        .expect("Failed to delete by filter");
    assert_eq!(affected.rows_affected, 1);
    let row = database
        .raw_query_row("select count(*) as total from simple_users", vec![])
        .await
        .expect("Failed to count the users")
        .expect("A count always returns a row");
    assert_eq!(row.get_column("total"), Some(&quarry::Value::Int64(0)));
}
