//! SQLite model implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params_from_iter;
use serde_json::Value;
use tokio_rusqlite::Connection;

use depo_core::query::{is_identifier, QuerySpec, ScopeRegistry};
use depo_core::storage::{Attributes, Columns, Model, RecordId, RepositoryError, Result, Row};

use super::conversions::{format_attributes, parse_attributes, row_to_record};
use super::error::{map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id};
use super::query::SqliteQuery;
use super::schema::{self, Statement};

const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
pub(super) fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// SQLite storage backend for one model.
///
/// Rows live in a table named after the model (lowercased), one JSON
/// `attributes` column per row. Clones share the connection and the read
/// counter.
#[derive(Clone)]
pub struct SqliteModel {
    name: Arc<str>,
    table: Arc<str>,
    conn: Connection,
    scopes: ScopeRegistry,
    reads: Arc<AtomicUsize>,
}

impl SqliteModel {
    /// Opens a file-based database and ensures the model's table exists.
    ///
    /// The database file will be created if it doesn't exist.
    pub async fn open(path: &str, name: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;
        Self::connect(conn, name).await
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn open_in_memory(name: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;
        Self::connect(conn, name).await
    }

    /// Binds a model to an open connection, creating its table if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Configuration` if the model name cannot be
    /// used as a table name.
    pub async fn connect(conn: Connection, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let table = name.to_ascii_lowercase();
        if !is_identifier(&table) {
            return Err(RepositoryError::Configuration(format!(
                "model name {name:?} is not a valid table name"
            )));
        }

        let ddl = schema::create_table(&table);
        conn.call(move |conn| {
            conn.execute_batch(&ddl).map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| map_tokio_rusqlite_error(e, &name))?;

        tracing::debug!(model = %name, table = %table, "SQLite table ready");
        Ok(Self {
            name: Arc::from(name),
            table: Arc::from(table),
            conn,
            scopes: ScopeRegistry::new(),
            reads: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Replaces the named scopes of this model.
    pub fn with_scopes(mut self, scopes: ScopeRegistry) -> Self {
        self.scopes = scopes;
        self
    }

    pub(super) fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of SELECT statements executed for reads so far.
    ///
    /// A paginated read issues two: the total count and the page itself.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Runs a SELECT returning records.
    pub(super) async fn fetch(&self, statement: Statement) -> Result<Vec<Row>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&statement.sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(params_from_iter(statement.params.iter()), row_to_record)
                    .map_err(wrap_err)?;

                let mut records = Vec::new();
                for row_result in rows {
                    records.push(row_result.map_err(wrap_err)?);
                }
                Ok(records)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, &self.name))
    }

    /// Runs a SELECT returning a single count.
    pub(super) async fn fetch_count(&self, statement: Statement) -> Result<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let count: i64 = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    &statement.sql,
                    params_from_iter(statement.params.iter()),
                    |row| row.get(0),
                )
                .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, &self.name))?;
        Ok(count.max(0) as u64)
    }

    /// Rows matching `spec` within the given window.
    pub(super) async fn select(
        &self,
        spec: &QuerySpec,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Row>> {
        let statement = schema::select_rows(&self.table, spec, limit, offset)?;
        self.fetch(statement).await
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

#[async_trait]
impl Model for SqliteModel {
    type Record = Row;
    type Query = SqliteQuery;

    fn name(&self) -> &str {
        &self.name
    }

    fn new_query(&self) -> SqliteQuery {
        SqliteQuery::new(self.clone())
    }

    async fn all(&self, columns: &Columns) -> Result<Vec<Row>> {
        let rows = self
            .fetch(Statement {
                sql: schema::select_all(&self.table),
                params: Vec::new(),
            })
            .await?;
        Ok(rows.into_iter().map(|row| row.project(columns)).collect())
    }

    async fn find(&self, id: RecordId) -> Result<Option<Row>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let sql = schema::select_row_by_id(&self.table);

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                match stmt.query_row([id], row_to_record) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, &self.name, id.to_string()))
    }

    async fn create(&self, mut attributes: Attributes) -> Result<Row> {
        let timestamp = now();
        attributes
            .entry(CREATED_AT)
            .or_insert_with(|| timestamp.clone());
        attributes.entry(UPDATED_AT).or_insert(timestamp);

        let sql = schema::insert_row(&self.table);
        let stored = attributes.clone();
        let id = self
            .conn
            .call(move |conn| {
                let json = format_attributes(&stored).map_err(wrap_err)?;
                conn.execute(&sql, [json]).map_err(wrap_err)?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, &self.name))?;

        tracing::trace!(model = %self.name, id, "Row created");
        Ok(Row { id, attributes })
    }

    async fn update(&self, record: &Row, attributes: Attributes) -> Result<Row> {
        let id = record.id;
        let select_sql = schema::select_row_by_id(&self.table);
        let update_sql = schema::update_row(&self.table);

        let row = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;

                let stored: String = tx
                    .query_row(&select_sql, [id], |row| row.get(1))
                    .map_err(wrap_err)?;
                let mut merged = parse_attributes(&stored).map_err(wrap_err)?;

                let touched = !attributes.contains_key(UPDATED_AT);
                merged.extend(attributes);
                if touched {
                    merged.insert(UPDATED_AT.to_string(), now());
                }

                let json = format_attributes(&merged).map_err(wrap_err)?;
                tx.execute(&update_sql, rusqlite::params![id, json])
                    .map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;

                Ok(Row {
                    id,
                    attributes: merged,
                })
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, &self.name, id.to_string()))?;

        tracing::trace!(model = %self.name, id, "Row updated");
        Ok(row)
    }

    async fn delete(&self, record: &Row) -> Result<bool> {
        self.destroy(record.id).await
    }

    async fn destroy(&self, id: RecordId) -> Result<bool> {
        let sql = schema::delete_row(&self.table);

        let removed = self
            .conn
            .call(move |conn| {
                let rows = conn.execute(&sql, [id]).map_err(wrap_err)?;
                Ok(rows > 0)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, &self.name, id.to_string()))?;

        tracing::trace!(model = %self.name, id, removed, "Row destroyed");
        Ok(removed)
    }
}
