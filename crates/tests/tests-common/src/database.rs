//! A throwaway SQLite database seeded with a small `users` table.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

const SCHEMA: &str = "CREATE TABLE users (id integer NOT NULL, name varchar(255) NOT NULL)";
const SEED: &str = "INSERT INTO users (id, name) VALUES (1, 'Jake'), (2, 'Sarah'), (3, 'Ted')";

/// The database file lives as long as this value does.
pub struct TestDatabase {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl TestDatabase {
    /// Create a database holding the users Jake, Sarah and Ted with ids 1, 2 and 3.
    pub async fn seeded() -> Self {
        let dir = tempfile::tempdir().expect("tempfile::tempdir");
        let path = dir.path().join("users.db");

        let options = SqliteConnectOptions::from_str(&uri_for(&path))
            .expect("SqliteConnectOptions::from_str")
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("connect to seed database");
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .expect("create users table");
        sqlx::query(SEED)
            .execute(&pool)
            .await
            .expect("seed users table");
        pool.close().await;

        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A data source descriptor for this database.
    pub fn connection_uri(&self) -> String {
        uri_for(&self.path)
    }

    /// A plain sqlx pool, for checking the database from outside the code under test.
    pub async fn pool(&self, max_connections: u32) -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&self.connection_uri())
            .await
            .expect("connect to test database")
    }

    /// Names in the users table, ordered by id.
    pub async fn user_names(&self) -> Vec<String> {
        let pool = self.pool(1).await;
        let rows = sqlx::query("SELECT name FROM users ORDER BY id")
            .fetch_all(&pool)
            .await
            .expect("select user names");
        pool.close().await;
        rows.iter().map(|row| row.get::<String, _>("name")).collect()
    }
}

fn uri_for(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}
