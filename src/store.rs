//! The SQLite store: one connection, one transaction per batch.

use crate::records::ArchiveRecord;
use crate::schema::{PSEUDO_AUTHORS, SCHEMA, UPSERT_FAILED_USER, UPSERT_USER};
use ahash::AHashSet;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;

/// Tables `count_rows` is allowed to query.
pub const TABLES: [&str; 4] = ["submissions", "comments", "reddit_users", "reddit_users_failed"];

/// One row of `reddit_users`.
#[derive(Clone, Debug, PartialEq)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub created_utc: Option<i64>,
    pub comment_karma: Option<i64>,
    pub link_karma: Option<i64>,
    pub is_mod: Option<bool>,
    pub is_suspended: bool,
    pub profile_name: Option<String>,
    pub profile_description: Option<String>,
    pub retrieved_on: i64,
}

/// One row of `reddit_users_failed`: a tombstone that stops future lookups.
#[derive(Clone, Debug, PartialEq)]
pub struct FailedUserRow {
    pub username: String,
    pub reason: String,
    pub retrieved_on: i64,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open the database at `path`, creating it if needed, and make sure every
    /// table and index exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("Opening existing database: {}", path.display());
        } else {
            tracing::info!("Database not found. Creating new database: {}", path.display());
        }
        let conn = Connection::open(path).with_context(|| format!("open database {}", path.display()))?;
        Self::bootstrap(conn)
    }

    /// Like `open`, but a missing file is an error instead of a fresh database.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("database {} not found; run the archive import first", path.display());
        }
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("create schema")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert-or-replace every row of one batch inside a single transaction.
    pub fn upsert_batch<T: ArchiveRecord>(&mut self, rows: &[T]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(T::UPSERT_SQL)?;
            for row in rows {
                row.bind(&mut stmt).with_context(|| format!("upsert into {}", T::KIND))?;
            }
        }
        tx.commit().with_context(|| format!("commit {} batch", T::KIND))?;
        Ok(())
    }

    /// Write one enrichment batch. A username ends up in exactly one of the
    /// two user tables.
    pub fn write_user_batch(&mut self, resolved: &[UserRow], failed: &[FailedUserRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut clear_failed = tx.prepare_cached("DELETE FROM reddit_users_failed WHERE username = ?1")?;
            let mut upsert_user = tx.prepare_cached(UPSERT_USER)?;
            for u in resolved {
                clear_failed.execute(params![u.username])?;
                upsert_user
                    .execute(params![
                        u.id,
                        u.username,
                        u.created_utc,
                        u.comment_karma,
                        u.link_karma,
                        u.is_mod,
                        u.is_suspended,
                        u.profile_name,
                        u.profile_description,
                        u.retrieved_on,
                    ])
                    .with_context(|| format!("upsert user {}", u.username))?;
            }

            let mut clear_user = tx.prepare_cached("DELETE FROM reddit_users WHERE username = ?1")?;
            let mut upsert_failed = tx.prepare_cached(UPSERT_FAILED_USER)?;
            for f in failed {
                clear_user.execute(params![f.username])?;
                upsert_failed
                    .execute(params![f.username, f.reason, f.retrieved_on])
                    .with_context(|| format!("record failed user {}", f.username))?;
            }
        }
        tx.commit().context("commit user batch")?;
        Ok(())
    }

    pub fn count_rows(&self, table: &str) -> Result<u64> {
        if !TABLES.contains(&table) {
            bail!("unknown table {table}");
        }
        let n: i64 = self.conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
        Ok(n as u64)
    }

    /// Distinct real authors across submissions and comments, sorted by name.
    pub fn distinct_authors(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT author FROM submissions WHERE author IS NOT NULL AND author <> '' \
             UNION \
             SELECT author FROM comments WHERE author IS NOT NULL AND author <> '' \
             ORDER BY author",
        )?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for author in rows {
            let author = author?;
            if !PSEUDO_AUTHORS.contains(&author.as_str()) {
                out.push(author);
            }
        }
        Ok(out)
    }

    /// Usernames already in a terminal state: resolved or tombstoned.
    pub fn resolved_usernames(&self) -> Result<AHashSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT username FROM reddit_users UNION SELECT username FROM reddit_users_failed",
        )?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut set = AHashSet::new();
        for name in rows {
            set.insert(name?);
        }
        Ok(set)
    }
}
