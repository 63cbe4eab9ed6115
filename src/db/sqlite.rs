//! In-memory SQLite-backed test double for [`super::RpslDatabase`],
//! [`super::SuspendedDatabase`] and [`super::AuthSession`].
//!
//! Grounded on the teacher's `Arc<Mutex<Connection>>` + schema-version
//! store pattern (`memory::store::SqliteMemoryStore`,
//! `memory::schema::initialize_schema`). Gated behind the
//! `test-support` feature so downstream embedders can exercise the
//! validators against a real `async-trait` backend in their own tests
//! without standing up a live database.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use crate::credentials::Origin;
use crate::error::{Result, ValidatorError};

use super::query::{RpslObjectQuery, RpslRow};
use super::{AuthApiTokenRecord, AuthMntnerRecord, AuthSession, RpslDatabase, SuspendedDatabase};

/// Current schema version for the test database.
pub const SCHEMA_VERSION: i32 = 1;

fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current_version < 1 {
        apply_v1_schema(conn)?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

fn apply_v1_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS rpsl_objects (
            object_class TEXT NOT NULL,
            rpsl_pk TEXT NOT NULL,
            source TEXT NOT NULL,
            object_text TEXT NOT NULL,
            parsed_data TEXT NOT NULL,
            suspended INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS auth_mntner (
            rpsl_mntner_pk TEXT NOT NULL,
            rpsl_mntner_source TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS auth_api_token (
            token TEXT NOT NULL,
            mntner_pk TEXT NOT NULL,
            mntner_source TEXT NOT NULL,
            allowed_origins TEXT NOT NULL,
            allowed_ip_prefix TEXT
        )",
        [],
    )?;

    Ok(())
}

/// An in-memory RPSL object/auth-model database, standing in for the
/// live backend the validators embed against in production.
#[derive(Clone)]
pub struct SqliteTestDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTestDatabase {
    pub fn new() -> Self {
        let conn = Connection::open_in_memory().expect("open in-memory sqlite connection");
        initialize_schema(&conn).expect("initialize test database schema");
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ValidatorError::internal(format!("failed to lock connection: {e}")))?;
        f(&conn).map_err(|e| ValidatorError::database(e.to_string()))
    }

    /// Insert an object into the live table, for test setup.
    pub fn insert_object(&self, row: &RpslRow) -> Result<()> {
        self.insert_row(row, false)
    }

    /// Insert an object into the suspended-objects view, for test setup.
    pub fn insert_suspended_object(&self, row: &RpslRow) -> Result<()> {
        self.insert_row(row, true)
    }

    fn insert_row(&self, row: &RpslRow, suspended: bool) -> Result<()> {
        let parsed_data = serde_json::to_string(&row.parsed_data)
            .map_err(|e| ValidatorError::internal(format!("serialize parsed_data: {e}")))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO rpsl_objects (object_class, rpsl_pk, source, object_text, parsed_data, suspended)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.object_class,
                    row.rpsl_pk,
                    row.source,
                    row.object_text,
                    parsed_data,
                    suspended as i64,
                ],
            )?;
            Ok(())
        })
    }

    pub fn insert_auth_mntner(&self, pk: &str, source: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO auth_mntner (rpsl_mntner_pk, rpsl_mntner_source) VALUES (?1, ?2)",
                params![pk, source],
            )?;
            Ok(())
        })
    }

    pub fn insert_api_token(
        &self,
        token: &AuthApiTokenRecord,
        allowed_origins: &[Origin],
        allowed_ip_prefix: Option<&str>,
    ) -> Result<()> {
        let origins = serde_json::to_string(
            &allowed_origins
                .iter()
                .map(origin_tag)
                .collect::<Vec<_>>(),
        )
        .map_err(|e| ValidatorError::internal(format!("serialize allowed_origins: {e}")))?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO auth_api_token (token, mntner_pk, mntner_source, allowed_origins, allowed_ip_prefix)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    token.token,
                    token.mntner_pk,
                    token.mntner_source,
                    origins,
                    allowed_ip_prefix,
                ],
            )?;
            Ok(())
        })
    }

    fn fetch_rows(&self, suspended: bool) -> Result<Vec<RpslRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT object_class, rpsl_pk, source, object_text, parsed_data
                 FROM rpsl_objects WHERE suspended = ?1",
            )?;
            let rows = stmt
                .query_map(params![suspended as i64], |row| {
                    let parsed_data: String = row.get(4)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        parsed_data,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .map(|rows| {
            rows.into_iter()
                .map(|(object_class, rpsl_pk, source, object_text, parsed_data)| RpslRow {
                    object_class,
                    rpsl_pk,
                    source,
                    object_text,
                    parsed_data: serde_json::from_str::<HashMap<String, Vec<String>>>(&parsed_data)
                        .unwrap_or_default(),
                })
                .collect()
        })
    }

    async fn find(&self, query: RpslObjectQuery, suspended: bool) -> Result<Vec<RpslRow>> {
        let rows = self.fetch_rows(suspended)?;
        let mut matched: Vec<RpslRow> = rows.into_iter().filter(|row| query.matches(row)).collect();
        if query.is_first_only() {
            matched.truncate(1);
        }
        Ok(matched)
    }
}

impl Default for SqliteTestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

fn origin_tag(origin: &Origin) -> &'static str {
    match origin {
        Origin::Email => "email",
        Origin::WebSubmit => "web_submit",
        Origin::Api => "api",
        Origin::Other => "other",
    }
}

fn origin_from_tag(tag: &str) -> Option<Origin> {
    match tag {
        "email" => Some(Origin::Email),
        "web_submit" => Some(Origin::WebSubmit),
        "api" => Some(Origin::Api),
        "other" => Some(Origin::Other),
        _ => None,
    }
}

#[async_trait]
impl RpslDatabase for SqliteTestDatabase {
    async fn find_objects(&self, query: RpslObjectQuery) -> Result<Vec<RpslRow>> {
        self.find(query, false).await
    }
}

#[async_trait]
impl SuspendedDatabase for SqliteTestDatabase {
    async fn find_objects(&self, query: RpslObjectQuery) -> Result<Vec<RpslRow>> {
        self.find(query, true).await
    }
}

#[async_trait]
impl AuthSession for SqliteTestDatabase {
    async fn find_mntner_auth(&self, pk: &str, source: &str) -> Result<Option<AuthMntnerRecord>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT rpsl_mntner_pk, rpsl_mntner_source FROM auth_mntner
                 WHERE rpsl_mntner_pk = ?1 AND rpsl_mntner_source = ?2",
                params![pk, source],
                |row| {
                    Ok(AuthMntnerRecord {
                        rpsl_mntner_pk: row.get(0)?,
                        rpsl_mntner_source: row.get(1)?,
                    })
                },
            )
            .optional()
        })
    }

    async fn find_api_tokens(
        &self,
        candidates: &[String],
        mntner_pk: &str,
        mntner_source: &str,
    ) -> Result<Vec<AuthApiTokenRecord>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT token, mntner_pk, mntner_source, allowed_origins, allowed_ip_prefix
                 FROM auth_api_token WHERE mntner_pk = ?1 AND mntner_source = ?2",
            )?;
            let rows = stmt
                .query_map(params![mntner_pk, mntner_source], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        let mut matches = Vec::new();
        for (token, pk, source, origins_json, ip_prefix) in rows {
            if !candidates.iter().any(|c| c == &token) {
                continue;
            }
            let origins: Vec<String> = serde_json::from_str(&origins_json).unwrap_or_default();
            let mut record = AuthApiTokenRecord::new(token, pk, source).with_allowed_origins(
                origins.iter().filter_map(|tag| origin_from_tag(tag)).collect(),
            );
            if let Some(prefix) = ip_prefix.and_then(|p| p.parse::<ipnet::IpNet>().ok()) {
                record = record.with_allowed_ip_prefix(prefix);
            }
            matches.push(record);
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(class: &str, pk: &str, source: &str) -> RpslRow {
        RpslRow {
            object_class: class.to_string(),
            rpsl_pk: pk.to_string(),
            source: source.to_string(),
            object_text: String::new(),
            parsed_data: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn finds_inserted_object_by_class_and_pk() {
        let db = SqliteTestDatabase::new();
        db.insert_object(&row("mntner", "TEST-MNT", "TEST")).unwrap();

        let found = db
            .find_objects(
                RpslObjectQuery::new()
                    .object_classes(["mntner"])
                    .rpsl_pks(["TEST-MNT"]),
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn suspended_objects_are_not_visible_via_live_table() {
        let db = SqliteTestDatabase::new();
        db.insert_suspended_object(&row("mntner", "TEST-MNT", "TEST")).unwrap();

        let live = db
            .find_objects(RpslObjectQuery::new().rpsl_pks(["TEST-MNT"]))
            .await
            .unwrap();
        assert!(live.is_empty());

        let suspended = SuspendedDatabase::find_objects(
            &db,
            RpslObjectQuery::new().rpsl_pks(["TEST-MNT"]),
        )
        .await
        .unwrap();
        assert_eq!(suspended.len(), 1);
    }

    #[tokio::test]
    async fn find_mntner_auth_reports_migration_linkage() {
        let db = SqliteTestDatabase::new();
        db.insert_auth_mntner("MIG-MNT", "TEST").unwrap();

        assert!(db.find_mntner_auth("MIG-MNT", "TEST").await.unwrap().is_some());
        assert!(db.find_mntner_auth("OTHER-MNT", "TEST").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_api_tokens_matches_candidate_and_scope() {
        let db = SqliteTestDatabase::new();
        let record = AuthApiTokenRecord::new("tok-123", "TEST-MNT", "TEST");
        db.insert_api_token(&record, &[Origin::Api], None).unwrap();

        let found = db
            .find_api_tokens(&["tok-123".to_string()], "TEST-MNT", "TEST")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].valid_for(Some(Origin::Api), None));
        assert!(!found[0].valid_for(Some(Origin::Email), None));

        let missing = db
            .find_api_tokens(&["wrong".to_string()], "TEST-MNT", "TEST")
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn find_api_tokens_returns_every_matching_token() {
        let db = SqliteTestDatabase::new();
        db.insert_api_token(
            &AuthApiTokenRecord::new("tok-out-of-scope", "TEST-MNT", "TEST"),
            &[Origin::Email],
            None,
        )
        .unwrap();
        db.insert_api_token(
            &AuthApiTokenRecord::new("tok-in-scope", "TEST-MNT", "TEST"),
            &[Origin::Api],
            None,
        )
        .unwrap();

        let found = db
            .find_api_tokens(
                &["tok-out-of-scope".to_string(), "tok-in-scope".to_string()],
                "TEST-MNT",
                "TEST",
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|t| t.valid_for(Some(Origin::Api), None)));
    }
}
