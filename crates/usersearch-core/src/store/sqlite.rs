//! SQLite-backed local store.
//!
//! One writer connection guarded by a mutex serializes all writes; every
//! read opens its own connection so reads run concurrently under WAL.
//! All database work happens on the blocking thread pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::models::{AvatarRecord, Page, UserRecord};

use super::{LocalStore, StorageError, StoreStats};

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
      id INTEGER PRIMARY KEY,
      display_name TEXT NOT NULL,
      user_name TEXT NOT NULL,
      avatar_url TEXT NOT NULL,
      display_name_lc TEXT NOT NULL,
      user_name_lc TEXT NOT NULL,
      updated_at_ms INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_users_order ON users(display_name, user_name, id);

    CREATE TABLE IF NOT EXISTS avatars (
      url TEXT PRIMARY KEY,
      image BLOB NOT NULL,
      updated_at_ms INTEGER NOT NULL
    );
"#;

const UPSERT_USER: &str = "INSERT INTO users(id, display_name, user_name, avatar_url, display_name_lc, user_name_lc, updated_at_ms)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(id) DO UPDATE SET
       display_name=excluded.display_name,
       user_name=excluded.user_name,
       avatar_url=excluded.avatar_url,
       display_name_lc=excluded.display_name_lc,
       user_name_lc=excluded.user_name_lc,
       updated_at_ms=excluded.updated_at_ms";

const UPSERT_AVATAR: &str = "INSERT INTO avatars(url, image, updated_at_ms) VALUES (?1, ?2, ?3)
     ON CONFLICT(url) DO UPDATE SET image=excluded.image, updated_at_ms=excluded.updated_at_ms";

#[derive(Clone)]
pub struct SqliteStore {
    path: PathBuf,
    writer: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Self::connect(&path)?;
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), journal_mode = %journal_mode, "Opened local store");

        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(conn)),
        })
    }

    fn connect(path: &Path) -> Result<Connection, StorageError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        Ok(conn)
    }

    /// Run `f` against a fresh read connection on the blocking pool.
    async fn read<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Self::connect(&path)?;
            f(&conn)
        })
        .await?
    }

    /// Run `f` against the shared writer connection on the blocking pool.
    async fn write<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let writer = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || {
            let mut conn = writer
                .lock()
                .map_err(|_| StorageError::Io("writer connection lock poisoned".to_string()))?;
            f(&mut *conn)
        })
        .await?
    }
}

fn map_user_row(r: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: r.get(0)?,
        display_name: r.get(1)?,
        user_name: r.get(2)?,
        avatar_url: r.get(3)?,
    })
}

fn to_sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn search_users_blocking(
    conn: &Connection,
    prefix: &str,
    page: Page,
) -> Result<Vec<UserRecord>, StorageError> {
    let limit = to_sql_int(page.fetch_limit());
    let offset = to_sql_int(page.fetch_offset());

    let users = if prefix.is_empty() {
        let mut stmt = conn.prepare_cached(
            "SELECT id, display_name, user_name, avatar_url FROM users
             ORDER BY display_name ASC, user_name ASC, id ASC
             LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], map_user_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    } else {
        let lowered = prefix.to_lowercase();
        let prefix_len = to_sql_int(lowered.chars().count());
        let mut stmt = conn.prepare_cached(
            "SELECT id, display_name, user_name, avatar_url FROM users
             WHERE substr(display_name_lc, 1, ?2) = ?1 OR substr(user_name_lc, 1, ?2) = ?1
             ORDER BY display_name ASC, user_name ASC, id ASC
             LIMIT ?3 OFFSET ?4",
        )?;
        let rows = stmt.query_map(params![lowered, prefix_len, limit, offset], map_user_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };
    Ok(users)
}

fn upsert_users_blocking(conn: &mut Connection, users: &[UserRecord]) -> Result<(), StorageError> {
    let now_ms = Utc::now().timestamp_millis();
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(UPSERT_USER)?;
        for user in users {
            stmt.execute(params![
                user.id,
                user.display_name,
                user.user_name,
                user.avatar_url,
                user.display_name.to_lowercase(),
                user.user_name.to_lowercase(),
                now_ms,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn max_updated_at(conn: &Connection, table: &str) -> Result<Option<i64>, StorageError> {
    let sql = format!("SELECT MAX(updated_at_ms) FROM {}", table);
    Ok(conn.query_row(&sql, [], |r| r.get::<_, Option<i64>>(0))?)
}

fn count_rows(conn: &Connection, table: &str) -> Result<u64, StorageError> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    let count: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
    Ok(u64::try_from(count).unwrap_or_default())
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn search_users(&self, prefix: &str, page: Page) -> Result<Vec<UserRecord>, StorageError> {
        let prefix = prefix.to_string();
        self.read(move |conn| search_users_blocking(conn, &prefix, page))
            .await
    }

    async fn upsert_users(&self, users: Vec<UserRecord>) -> Result<(), StorageError> {
        if users.is_empty() {
            return Ok(());
        }
        let count = users.len();
        self.write(move |conn| upsert_users_blocking(conn, &users))
            .await?;
        debug!(count = count, "Upserted users");
        Ok(())
    }

    async fn get_avatar(&self, url: &str) -> Result<Option<AvatarRecord>, StorageError> {
        let url = url.to_string();
        self.read(move |conn| {
            let image: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT image FROM avatars WHERE url = ?1",
                    params![url],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(image.map(|image| AvatarRecord { url, image }))
        })
        .await
    }

    async fn put_avatar(&self, avatar: AvatarRecord) -> Result<(), StorageError> {
        self.write(move |conn| {
            conn.execute(
                UPSERT_AVATAR,
                params![avatar.url, avatar.image, Utc::now().timestamp_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn stats(&self) -> Result<StoreStats, StorageError> {
        self.read(|conn| {
            let users = count_rows(conn, "users")?;
            let avatars = count_rows(conn, "avatars")?;
            let last_updated = max_updated_at(conn, "users")?
                .max(max_updated_at(conn, "avatars")?)
                .and_then(DateTime::<Utc>::from_timestamp_millis);
            Ok(StoreStats {
                users,
                avatars,
                last_updated,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn open_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = SqliteStore::open(dir.path().join("test.sqlite3")).expect("Failed to open store");
        (dir, store)
    }

    fn page(offset: usize, size: usize) -> Page {
        Page::new(offset, NonZeroUsize::new(size).unwrap())
    }

    fn ann_family() -> Vec<UserRecord> {
        vec![
            UserRecord::new(3, "Annie", "a3", "https://x/3.png"),
            UserRecord::new(1, "Ann", "a1", "https://x/1.png"),
            UserRecord::new(2, "Anna", "a2", "https://x/2.png"),
            UserRecord::new(4, "Bob", "bob", "https://x/4.png"),
        ]
    }

    fn names(users: &[UserRecord]) -> Vec<&str> {
        users.iter().map(|u| u.display_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_search_pages_in_name_order() {
        let (_dir, store) = open_store();
        store.upsert_users(ann_family()).await.unwrap();

        let page0 = store.search_users("ann", page(0, 2)).await.unwrap();
        let page1 = store.search_users("ann", page(1, 2)).await.unwrap();
        let page2 = store.search_users("ann", page(2, 2)).await.unwrap();

        assert_eq!(names(&page0), vec!["Ann", "Anna"]);
        assert_eq!(names(&page1), vec!["Annie"]);
        assert!(page2.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_on_both_names() {
        let (_dir, store) = open_store();
        store
            .upsert_users(vec![
                UserRecord::new(1, "Zed", "ANNx", ""),
                UserRecord::new(2, "ANNABEL", "z", ""),
                UserRecord::new(3, "Bob", "bob", ""),
            ])
            .await
            .unwrap();

        let found = store.search_users("aNn", page(0, 10)).await.unwrap();
        assert_eq!(names(&found), vec!["ANNABEL", "Zed"]);
    }

    #[tokio::test]
    async fn test_empty_prefix_returns_all() {
        let (_dir, store) = open_store();
        store.upsert_users(ann_family()).await.unwrap();

        let all = store.search_users("", page(0, 10)).await.unwrap();
        assert_eq!(names(&all), vec!["Ann", "Anna", "Annie", "Bob"]);
    }

    #[tokio::test]
    async fn test_ties_broken_by_user_name_then_id() {
        let (_dir, store) = open_store();
        store
            .upsert_users(vec![
                UserRecord::new(9, "Sam", "sam", ""),
                UserRecord::new(5, "Sam", "sam", ""),
                UserRecord::new(7, "Sam", "alpha", ""),
            ])
            .await
            .unwrap();

        let found = store.search_users("sam", page(0, 10)).await.unwrap();
        let ids: Vec<i64> = found.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![7, 5, 9]);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_last_write_wins() {
        let (_dir, store) = open_store();
        store.upsert_users(ann_family()).await.unwrap();
        store.upsert_users(ann_family()).await.unwrap();
        store
            .upsert_users(vec![UserRecord::new(1, "Ann", "ann-renamed", "https://x/new.png")])
            .await
            .unwrap();

        let all = store.search_users("", page(0, 10)).await.unwrap();
        assert_eq!(all.len(), 4);
        let ann = all.iter().find(|u| u.id == 1).unwrap();
        assert_eq!(ann.user_name, "ann-renamed");
        assert_eq!(ann.avatar_url, "https://x/new.png");
    }

    #[tokio::test]
    async fn test_batch_insert_twenty_thousand() {
        let (_dir, store) = open_store();
        let users: Vec<UserRecord> = (0..20_000)
            .map(|i| UserRecord::new(i, format!("Display{}", i), format!("display{}", i), "http://xyz"))
            .collect();
        store.upsert_users(users).await.unwrap();

        let fetched = store.search_users("display", page(0, 20_000)).await.unwrap();
        assert_eq!(fetched.len(), 20_000);
    }

    #[tokio::test]
    async fn test_avatar_round_trip_and_overwrite() {
        let (_dir, store) = open_store();
        assert!(store.get_avatar("http://xyz").await.unwrap().is_none());

        store
            .put_avatar(AvatarRecord::new("http://xyz", vec![1, 2, 3]))
            .await
            .unwrap();
        store
            .put_avatar(AvatarRecord::new("http://xyz", vec![4, 5]))
            .await
            .unwrap();

        let avatar = store.get_avatar("http://xyz").await.unwrap().unwrap();
        assert_eq!(avatar.url, "http://xyz");
        assert_eq!(avatar.image, vec![4, 5]);
        assert_eq!(store.stats().await.unwrap().avatars, 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let (_dir, store) = open_store();
        let empty = store.stats().await.unwrap();
        assert_eq!(empty, StoreStats::default());

        store.upsert_users(ann_family()).await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.users, 4);
        assert_eq!(stats.avatars, 0);
        assert!(stats.last_updated.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_and_readers() {
        let (_dir, store) = open_store();

        // Writers overlap on ids 0..2000; each batch is one transaction.
        let mut handles = Vec::new();
        for writer in 0..8i64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let users: Vec<UserRecord> = (0..2_000)
                    .map(|i| UserRecord::new(i, format!("User{:04}", i), format!("w{}u{}", writer, i), ""))
                    .collect();
                store.upsert_users(users).await.map(|_| 0)
            }));
        }
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.search_users("user", page(0, 50)).await.map(|users| users.len())
            }));
        }

        for handle in handles {
            let count = handle.await.unwrap().unwrap();
            assert!(count <= 50);
        }

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.users, 2_000);
        let all = store.search_users("user", page(0, 5_000)).await.unwrap();
        assert_eq!(all.len(), 2_000);
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.sqlite3");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert_users(ann_family()).await.unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.search_users("", page(0, 10)).await.unwrap().len(), 4);
    }
}
