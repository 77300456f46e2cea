#[cfg(test)]
mod tests {
    use quarry::{Database, DatabaseOptions};
    use quarry_sqlite::SqliteConnection;
    use quarry_tests::{execute_tests, init_logs};
    use std::env;
    use tokio::{fs, sync::Mutex};

    static MUTEX: Mutex<()> = Mutex::const_new(());

    #[tokio::test]
    async fn sqlite_memory() {
        init_logs();
        let _guard = MUTEX.lock().await;
        let mut database: Database<SqliteConnection> =
            Database::open("sqlite://:memory:", DatabaseOptions::new())
                .await
                .expect("Could not open the in memory database");
        execute_tests(&mut database).await;
        database.close().await.expect("Could not close the database");
    }

    #[tokio::test]
    async fn sqlite_file() {
        init_logs();
        let _guard = MUTEX.lock().await;
        let path = env::temp_dir().join("quarry_suite.sqlite");
        if path.exists() {
            fs::remove_file(&path)
                .await
                .expect("Failed to remove the test database file");
        }
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let mut database: Database<SqliteConnection> =
            Database::open(&url, DatabaseOptions::new())
                .await
                .expect("Could not open the database file");
        execute_tests(&mut database).await;
        // The suites clear their tables first, running them twice must work
        execute_tests(&mut database).await;
    }
}
