use crate::silent_logs;
use quarry::{
    AsValue, Connection, Database, Record, Session, TransactionOptions, TransactionStep, Where,
    args,
};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Record, Default, Debug, Clone, PartialEq)]
#[record(table = "transaction_accounts")]
struct Account {
    id: i64,
    owner: String,
    balance: i64,
}

async fn balance_of<C: Connection>(database: &mut Database<C>, owner: &str) -> i64 {
    let mut account = Account::default();
    let exists = database
        .query(&mut account, Where::new("owner = ?", args![owner.to_string()]))
        .await
        .expect("Failed to query the account");
    assert!(exists, "The account of {} should exist", owner);
    account.balance
}

async fn count<C: Connection>(database: &mut Database<C>) -> usize {
    let mut accounts: Vec<Account> = Vec::new();
    database
        .query_multiple(&mut accounts, ())
        .await
        .expect("Failed to query the accounts");
    accounts.len()
}

pub async fn transaction<C: Connection + 'static>(database: &mut Database<C>) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    database
        .raw_execute(
            "create table if not exists transaction_accounts (id integer primary key, owner text not null, balance integer not null default 0)",
            vec![],
        )
        .await
        .expect("Failed to create the transaction_accounts table");
    database
        .delete("transaction_accounts", ())
        .await
        .expect("Failed to clear the transaction_accounts table");

    // Committed
    let step = database
        .run_transaction(|tx| {
            Box::pin(async move {
                let mut alice = Account {
                    owner: "alice".into(),
                    balance: 100,
                    ..Default::default()
                };
                tx.insert(&mut alice, ()).await?;
                let mut bob = Account {
                    owner: "bob".into(),
                    balance: 50,
                    ..Default::default()
                };
                tx.insert(&mut bob, ()).await?;
                Ok(true)
            })
        })
        .await
        .expect("The committed transaction should succeed");
    assert_eq!(step, TransactionStep::End);
    assert_eq!(count(database).await, 2);

    // Rolled back on request, still a success
    let step = database
        .run_transaction(|tx| {
            Box::pin(async move {
                let affected = tx.delete("transaction_accounts", ()).await?;
                assert_eq!(affected.rows_affected, 2);
                Ok(false)
            })
        })
        .await
        .expect("A requested rollback should succeed");
    assert_eq!(step, TransactionStep::End);
    assert_eq!(count(database).await, 2);

    // Inserts discarded by a rollback
    let step = database
        .run_transaction(|tx| {
            Box::pin(async move {
                for owner in ["carol", "dave"] {
                    let mut account = Account {
                        owner: owner.into(),
                        balance: 10,
                        ..Default::default()
                    };
                    tx.insert(&mut account, ()).await?;
                }
                Ok(false)
            })
        })
        .await
        .expect("A rollback after inserting should succeed");
    assert_eq!(step, TransactionStep::End);
    assert_eq!(count(database).await, 2);
    let mut carol = Account::default();
    let exists = database
        .query(&mut carol, Where::new("owner = ?", args!["carol"]))
        .await
        .expect("Failed to query the discarded account");
    assert!(!exists);

    // A failing unit of work is rolled back
    silent_logs! {
        let error = database
            .run_transaction(|tx| {
                Box::pin(async move {
                    tx.raw_execute(
                        "update transaction_accounts set balance = balance - 30 where owner = ?",
                        vec!["alice".as_value()],
                    )
                    .await?;
                    tx.raw_execute("update transaction_missing set balance = 0", vec![])
                        .await?;
                    Ok(true)
                })
            })
            .await
            .expect_err("The failing transaction should report an error");
        assert_eq!(error.step, TransactionStep::Run);
    };
    assert_eq!(balance_of(database, "alice").await, 100);

    // Dropped without a commit
    {
        let mut tx = database
            .begin(TransactionOptions::default())
            .await
            .expect("Failed to begin a transaction");
        tx.raw_execute(
            "update transaction_accounts set balance = 0 where owner = ?",
            vec!["bob".as_value()],
        )
        .await
        .expect("Failed to update inside the transaction");
    }
    assert_eq!(balance_of(database, "bob").await, 50);

    // Committed by hand
    let mut tx = database
        .begin(TransactionOptions::default())
        .await
        .expect("Failed to begin a transaction");
    tx.raw_execute(
        "update transaction_accounts set balance = balance + 25 where owner = ?",
        vec!["bob".as_value()],
    )
    .await
    .expect("Failed to update inside the transaction");
    tx.commit().await.expect("Failed to commit");
    assert_eq!(balance_of(database, "bob").await, 75);
}
