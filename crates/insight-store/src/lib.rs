//! SQLite-backed document store for dashboard records, users and sessions.
//!
//! Records are kept verbatim as JSON text. SQLite's JSON functions narrow a
//! scan to documents that carry the filtered fields; the final comparison
//! and the catalog both use [`Record::text`], so a value the catalog hands
//! out always matches the records it came from.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use insight_protocol::{FilterCatalog, FilterField, Record, SelectedFilters, UserInfo};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

mod credentials;

pub use credentials::{hash_password, new_salt, verify_password};

const DB_FILE: &str = "dashboard.sqlite";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

// Only strings and numbers have a text value.
const HAS_SCALAR: &str = "json_type(doc, ?) IN ('text','integer','real')";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored document is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("join error: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub created: String,
}

impl UserRow {
    pub fn info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            created: self.created.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub token: String,
    pub user_id: i64,
    pub created: String,
    pub expires: String,
}

#[derive(Clone)]
pub struct Store {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl Store {
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_with_busy_timeout(dir, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_busy_timeout(dir: &Path, busy_timeout: Duration) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let store = Self {
            db_path: dir.join(DB_FILE),
            busy_timeout,
        };
        let conn = store.conn()?;
        // Pragmas tuned for async server usage
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        let _ = conn.pragma_update(None, "temp_store", "MEMORY");
        Self::init_schema(&conn)?;
        Ok(store)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- Analytics records: one JSON document per observation, insertion ordered
            CREATE TABLE IF NOT EXISTS records (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              doc TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              username TEXT NOT NULL UNIQUE,
              email TEXT NOT NULL UNIQUE,
              password_hash TEXT NOT NULL,
              salt TEXT NOT NULL,
              created TEXT NOT NULL
            );

            -- Sessions: opaque bearer tokens with an expiry
            CREATE TABLE IF NOT EXISTS sessions (
              token TEXT PRIMARY KEY,
              user_id INTEGER NOT NULL,
              created TEXT NOT NULL,
              expires TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ---------------- Records ----------------

    /// Replace the whole collection in one transaction. Returns the number inserted.
    pub fn replace_records(&self, records: &[Record]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let cleared = tx.execute("DELETE FROM records", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO records(doc) VALUES (?)")?;
            for record in records {
                stmt.execute([serde_json::to_string(record)?])?;
            }
        }
        tx.commit()?;
        debug!(cleared, inserted = records.len(), "replaced dashboard records");
        Ok(records.len())
    }

    pub fn count_records(&self) -> Result<i64> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(1) FROM records", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Records matching every selected field exactly, in insertion order.
    pub fn query_records(&self, filters: &SelectedFilters) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        let mut sql = String::from("SELECT doc FROM records");
        let mut args: Vec<String> = Vec::with_capacity(filters.len());
        for (idx, (field, _)) in filters.iter().enumerate() {
            sql.push_str(if idx == 0 { " WHERE " } else { " AND " });
            sql.push_str(HAS_SCALAR);
            args.push(field.json_path());
        }
        sql.push_str(" ORDER BY id ASC");

        let mut out = Vec::new();
        scan_docs(&conn, &sql, &args, |record| {
            if filters.matches(&record) {
                out.push(record);
            }
        })?;
        debug!(filters = filters.len(), matched = out.len(), "queried records");
        Ok(out)
    }

    /// Distinct non-empty text values of one field, ascending.
    pub fn distinct_values(&self, field: FilterField) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let sql = format!("SELECT doc FROM records WHERE {HAS_SCALAR}");
        let mut values = BTreeSet::new();
        scan_docs(&conn, &sql, &[field.json_path()], |record| {
            if let Some(text) = record.text(field.as_str()) {
                values.insert(text.into_owned());
            }
        })?;
        Ok(values.into_iter().collect())
    }

    /// Every catalog field's distinct values, gathered in one scan.
    pub fn filter_catalog(&self) -> Result<FilterCatalog> {
        let conn = self.conn()?;
        let mut seen: BTreeMap<FilterField, BTreeSet<String>> = FilterField::CATALOG
            .into_iter()
            .map(|field| (field, BTreeSet::new()))
            .collect();
        scan_docs(&conn, "SELECT doc FROM records", &[], |record| {
            for (field, values) in seen.iter_mut() {
                if let Some(text) = record.text(field.as_str()) {
                    values.insert(text.into_owned());
                }
            }
        })?;
        let mut catalog = FilterCatalog::new();
        for (field, values) in seen {
            catalog.insert(field, values.into_iter().collect());
        }
        Ok(catalog)
    }

    // ---------------- Users & sessions ----------------

    pub fn create_user(&self, username: &str, email: &str, password: &str) -> Result<UserRow> {
        let conn = self.conn()?;
        let salt = new_salt();
        let password_hash = hash_password(password, &salt);
        let created = now();
        let inserted = conn.execute(
            "INSERT INTO users(username,email,password_hash,salt,created) VALUES (?,?,?,?,?)",
            params![username, email, password_hash, salt, created],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::Conflict("username or email".into()));
            }
            Err(err) => return Err(err.into()),
        }
        Ok(UserRow {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            salt,
            created,
        })
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id,username,email,password_hash,salt,created FROM users WHERE username=? LIMIT 1",
        )?;
        Ok(stmt.query_row([username], user_from_row).optional()?)
    }

    /// The user when `password` matches, `None` for unknown users and wrong passwords alike.
    pub fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<UserRow>> {
        Ok(self
            .find_user_by_username(username)?
            .filter(|user| verify_password(password, &user.salt, &user.password_hash)))
    }

    pub fn create_session(&self, user_id: i64, ttl: chrono::Duration) -> Result<SessionRow> {
        let conn = self.conn()?;
        let issued = Utc::now();
        let session = SessionRow {
            token: format!(
                "{}{}",
                uuid::Uuid::new_v4().simple(),
                uuid::Uuid::new_v4().simple()
            ),
            user_id,
            created: issued.to_rfc3339_opts(SecondsFormat::Millis, true),
            expires: (issued + ttl).to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        conn.execute(
            "INSERT INTO sessions(token,user_id,created,expires) VALUES (?,?,?,?)",
            params![session.token, session.user_id, session.created, session.expires],
        )?;
        Ok(session)
    }

    /// Owner of an unexpired session.
    pub fn session_user(&self, token: &str) -> Result<Option<UserRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT u.id,u.username,u.email,u.password_hash,u.salt,u.created
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token=? AND s.expires>? LIMIT 1",
        )?;
        Ok(stmt
            .query_row(params![token, now()], user_from_row)
            .optional()?)
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute("DELETE FROM sessions WHERE token=?", [token])?;
        Ok(n > 0)
    }

    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM sessions WHERE expires<=?", [now()])?)
    }

    // ---------------- Async wrappers (spawn_blocking) ----------------
    // These helpers offload rusqlite work from async executors.

    pub async fn query_records_async(&self, filters: SelectedFilters) -> Result<Vec<Record>> {
        let s = self.clone();
        tokio::task::spawn_blocking(move || s.query_records(&filters))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }

    pub async fn filter_catalog_async(&self) -> Result<FilterCatalog> {
        let s = self.clone();
        tokio::task::spawn_blocking(move || s.filter_catalog())
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }

    pub async fn create_user_async(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> Result<UserRow> {
        let s = self.clone();
        tokio::task::spawn_blocking(move || s.create_user(&username, &email, &password))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }

    pub async fn verify_credentials_async(
        &self,
        username: String,
        password: String,
    ) -> Result<Option<UserRow>> {
        let s = self.clone();
        tokio::task::spawn_blocking(move || s.verify_credentials(&username, &password))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }

    pub async fn create_session_async(
        &self,
        user_id: i64,
        ttl: chrono::Duration,
    ) -> Result<SessionRow> {
        let s = self.clone();
        tokio::task::spawn_blocking(move || s.create_session(user_id, ttl))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }

    pub async fn session_user_async(&self, token: &str) -> Result<Option<UserRow>> {
        let s = self.clone();
        let token = token.to_string();
        tokio::task::spawn_blocking(move || s.session_user(&token))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }

    pub async fn delete_session_async(&self, token: &str) -> Result<bool> {
        let s = self.clone();
        let token = token.to_string();
        tokio::task::spawn_blocking(move || s.delete_session(&token))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }

    pub async fn purge_expired_sessions_async(&self) -> Result<usize> {
        let s = self.clone();
        tokio::task::spawn_blocking(move || s.purge_expired_sessions())
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

/// Decode each document selected by `sql` and hand it to `visit`.
fn scan_docs(
    conn: &Connection,
    sql: &str,
    args: &[String],
    mut visit: impl FnMut(Record),
) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(args.iter()))?;
    while let Some(row) = rows.next()? {
        let doc: String = row.get(0)?;
        visit(serde_json::from_str::<Record>(&doc)?);
    }
    Ok(())
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        salt: row.get(4)?,
        created: row.get(5)?,
    })
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
