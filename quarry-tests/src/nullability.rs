use crate::silent_logs;
use quarry::{
    Connection, Crud, Database, DefaultConverter, Destination, NullStrategy, OrmError, Record,
    Result, Session, Slot, ValueConverter, Where, args,
};
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;

#[derive(Record, Default, Debug, Clone, PartialEq)]
#[record(table = "nullability_rows")]
struct Strict {
    id: i64,
    amount: i64,
    note: String,
}

#[derive(Record, Default, Debug, Clone, PartialEq)]
#[record(table = "nullability_rows")]
struct Loose {
    id: i64,
    amount: Option<i64>,
    note: Option<String>,
    ratio: Option<Box<f64>>,
}

/// Nulls become `-1` in integer fields.
struct MinusOne;

impl ValueConverter for MinusOne {
    fn convert_null(&self, dest: &mut dyn Destination) -> Result<()> {
        match dest.slot() {
            Slot::I64(v) => {
                *v = -1;
                Ok(())
            }
            _ => DefaultConverter.convert_null(dest),
        }
    }
}

fn crud_with<C: Connection>(
    database: &mut Database<C>,
    converter: Arc<dyn ValueConverter>,
    on_null: NullStrategy,
) -> Crud {
    let driver = database.connection().driver_name();
    Crud::new(driver, database.dialect().clone(), converter, on_null)
}

pub async fn nullability<C: Connection>(database: &mut Database<C>) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    database
        .raw_execute(
            "create table if not exists nullability_rows (id integer primary key, amount integer, note text, ratio real)",
            vec![],
        )
        .await
        .expect("Failed to create the nullability_rows table");
    database
        .delete("nullability_rows", ())
        .await
        .expect("Failed to clear the nullability_rows table");
    let mut empty = Loose::default();
    database
        .insert(&mut empty, ())
        .await
        .expect("Failed to insert a row of nulls");
    assert_ne!(empty.id, 0);
    let mut full = Loose {
        amount: Some(12),
        note: Some("twelve".into()),
        ratio: Some(Box::new(0.25)),
        ..Default::default()
    };
    database
        .insert(&mut full, ())
        .await
        .expect("Failed to insert a full row");
    let by_id = |id: i64| Where::new("id = ?", args![id]);

    // Leave untouched (default)
    let mut strict = Strict {
        amount: 7,
        note: "keep".into(),
        ..Default::default()
    };
    database
        .query(&mut strict, by_id(empty.id))
        .await
        .expect("Failed to query the nulls leaving the fields untouched");
    assert_eq!(strict.id, empty.id);
    assert_eq!(strict.amount, 7);
    assert_eq!(strict.note, "keep");

    // Set zero
    let crud = crud_with(database, Arc::new(DefaultConverter), NullStrategy::SetZero);
    let mut strict = Strict {
        amount: 7,
        note: "keep".into(),
        ..Default::default()
    };
    crud.query(database.connection(), &mut strict, by_id(empty.id))
        .await
        .expect("Failed to query the nulls setting the fields to zero");
    assert_eq!(
        strict,
        Strict {
            id: empty.id,
            ..Default::default()
        }
    );
    let mut loose = full.clone();
    crud.query(database.connection(), &mut loose, by_id(empty.id))
        .await
        .expect("Failed to query the nulls into options");
    assert_eq!(loose, empty);

    // Delegate to the converter
    let crud = crud_with(database, Arc::new(DefaultConverter), NullStrategy::Delegate);
    let mut loose = full.clone();
    crud.query(database.connection(), &mut loose, by_id(empty.id))
        .await
        .expect("Failed to query the nulls delegating to the converter");
    assert_eq!(loose, empty);
    silent_logs! {
        let mut strict = Strict::default();
        let error = crud
            .query(database.connection(), &mut strict, by_id(empty.id))
            .await
            .expect_err("A null into a plain integer should fail");
        assert!(matches!(
            error.downcast_ref::<OrmError>(),
            Some(OrmError::Conversion { .. })
        ));
    };

    // Custom converter
    let crud = crud_with(database, Arc::new(MinusOne), NullStrategy::Delegate);
    let mut loose = Loose::default();
    let mut strict = Strict::default();
    silent_logs! {
        // `note` is a plain string, the default rule still rejects it
        assert!(
            crud.query(database.connection(), &mut strict, by_id(empty.id))
                .await
                .is_err()
        );
    };
    assert_eq!(strict.amount, -1);
    crud.query(database.connection(), &mut loose, by_id(empty.id))
        .await
        .expect("Failed to query the nulls with the custom converter");
    assert_eq!(loose, empty);

    // Values into options
    let mut loose = Loose::default();
    database
        .query(&mut loose, by_id(full.id))
        .await
        .expect("Failed to query the full row");
    assert_eq!(loose, full);
}
