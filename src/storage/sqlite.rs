use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;

use crate::error::Result;
use crate::models::CompleteUserData;

/// SQLite cache of past scrapes, one snapshot row per run.
pub struct Storage {
    conn: Connection,
}

/// Headline numbers of one stored snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSummary {
    pub scraped_at: DateTime<Utc>,
    pub scraper_version: String,
    pub total_repositories: u32,
    pub total_stars: u64,
    pub total_forks: u64,
    pub followers: u32,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self { conn };
        storage.init_db()?;
        Ok(storage)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                login TEXT UNIQUE NOT NULL,
                name TEXT,
                avatar_url TEXT,
                public_repos INTEGER NOT NULL,
                followers INTEGER NOT NULL,
                following INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                scraped_at TEXT NOT NULL,
                scraper_version TEXT NOT NULL,
                total_repositories INTEGER NOT NULL,
                total_stars INTEGER NOT NULL,
                total_forks INTEGER NOT NULL,
                followers INTEGER NOT NULL,
                data_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_snapshots_user_id ON snapshots(user_id, scraped_at);
            "#,
        )?;

        Ok(())
    }

    /// Stores a scrape and returns the snapshot id.
    pub fn save_snapshot(&self, data: &CompleteUserData) -> Result<i64> {
        let profile = &data.profile;
        self.conn.execute(
            r#"
            INSERT INTO users (login, name, avatar_url, public_repos, followers, following)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(login) DO UPDATE SET
                name = excluded.name,
                avatar_url = excluded.avatar_url,
                public_repos = excluded.public_repos,
                followers = excluded.followers,
                following = excluded.following
            "#,
            params![
                profile.login,
                profile.name,
                profile.avatar_url,
                profile.public_repos,
                profile.followers,
                profile.following,
            ],
        )?;

        let user_id: i64 = self.conn.query_row(
            "SELECT id FROM users WHERE login = ?1",
            params![profile.login],
            |row| row.get(0),
        )?;

        let data_json = serde_json::to_string(data)?;
        let stats = &data.statistics;
        self.conn.execute(
            r#"
            INSERT INTO snapshots (user_id, scraped_at, scraper_version, total_repositories,
                                   total_stars, total_forks, followers, data_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                user_id,
                data.metadata.scraped_at.to_rfc3339(),
                data.metadata.scraper_version,
                stats.total_repositories,
                stats.total_stars as i64,
                stats.total_forks as i64,
                profile.followers,
                data_json,
            ],
        )?;

        let snapshot_id = self.conn.last_insert_rowid();
        tracing::debug!("Stored snapshot {} for {}", snapshot_id, profile.login);
        Ok(snapshot_id)
    }

    pub fn latest_snapshot(&self, login: &str) -> Result<Option<CompleteUserData>> {
        let result = self.conn.query_row(
            r#"
            SELECT s.data_json
            FROM snapshots s
            JOIN users u ON s.user_id = u.id
            WHERE u.login = ?1
            ORDER BY s.scraped_at DESC, s.id DESC
            LIMIT 1
            "#,
            params![login],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(data_json) => {
                let data: CompleteUserData = serde_json::from_str(&data_json)?;
                data.validate()?;
                Ok(Some(data))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Snapshots for one user, oldest first.
    pub fn snapshot_history(&self, login: &str) -> Result<Vec<SnapshotSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.scraped_at, s.scraper_version, s.total_repositories,
                   s.total_stars, s.total_forks, s.followers
            FROM snapshots s
            JOIN users u ON s.user_id = u.id
            WHERE u.login = ?1
            ORDER BY s.scraped_at ASC, s.id ASC
            "#,
        )?;

        let rows = stmt.query_map(params![login], |row| {
            let scraped_at: String = row.get(0)?;
            Ok((
                scraped_at,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, u32>(5)?,
            ))
        })?;

        let mut history = Vec::new();
        for row in rows {
            let (scraped_at, scraper_version, total_repositories, stars, forks, followers) = row?;
            let scraped_at = match DateTime::parse_from_rfc3339(&scraped_at) {
                Ok(dt) => dt.with_timezone(&Utc),
                Err(e) => {
                    tracing::warn!("Skipping snapshot with bad timestamp {}: {}", scraped_at, e);
                    continue;
                }
            };
            history.push(SnapshotSummary {
                scraped_at,
                scraper_version,
                total_repositories,
                total_stars: stars.max(0) as u64,
                total_forks: forks.max(0) as u64,
                followers,
            });
        }

        Ok(history)
    }

    pub fn list_users(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.login FROM users u
            JOIN snapshots s ON s.user_id = u.id
            GROUP BY u.id
            ORDER BY MAX(s.scraped_at) DESC
            "#,
        )?;

        let logins = stmt.query_map([], |row| row.get(0))?;
        logins.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }
}
