//! Embedded SQLite backend
//!
//! Mirrors the hosted schema (foreign keys, check constraints and the four
//! aggregation procedures) so the data layer can run offline and be tested
//! against a real relational store.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Number, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use super::procedures;
use crate::core::query::filter::{validate_column, validate_projection, Filter, Match, NullsOrder};
use crate::core::query::key::Collection;
use crate::core::services::backend::{Backend, Row, SelectRequest};
use crate::error::{BackendError, DatabaseError, HerdbookError, Result};

const CURRENT_DB_VERSION: u32 = 1;

/// Columns stored as 0/1 integers that read back as JSON booleans.
const BOOLEAN_COLUMNS: &[(&str, &str)] = &[("breeding_records", "success")];

const SCHEMA_V1: &str = r#"
    CREATE TABLE farms (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        location TEXT,
        size REAL CHECK (size IS NULL OR size >= 0),
        size_unit TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE animal_categories (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE animals (
        id TEXT PRIMARY KEY,
        farm_id TEXT NOT NULL REFERENCES farms(id) ON DELETE CASCADE,
        category_id TEXT REFERENCES animal_categories(id) ON DELETE SET NULL,
        tag_id TEXT NOT NULL,
        name TEXT,
        breed TEXT NOT NULL,
        gender TEXT NOT NULL CHECK (gender IN ('Male', 'Female')),
        date_of_birth TEXT,
        weight REAL CHECK (weight IS NULL OR weight >= 0),
        weight_unit TEXT NOT NULL DEFAULT 'kg',
        status TEXT NOT NULL DEFAULT 'Active' CHECK (status IN ('Active', 'Sold', 'Deceased')),
        parent_female_id TEXT REFERENCES animals(id) ON DELETE SET NULL,
        parent_male_id TEXT REFERENCES animals(id) ON DELETE SET NULL,
        acquisition_date TEXT,
        acquisition_cost REAL CHECK (acquisition_cost IS NULL OR acquisition_cost >= 0),
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (farm_id, tag_id)
    );

    CREATE TABLE health_records (
        id TEXT PRIMARY KEY,
        animal_id TEXT NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
        record_date TEXT NOT NULL,
        record_type TEXT NOT NULL
            CHECK (record_type IN ('Vaccination', 'Treatment', 'Checkup', 'Disease', 'Other')),
        description TEXT NOT NULL,
        medicine TEXT,
        dosage TEXT,
        administered_by TEXT,
        cost REAL CHECK (cost IS NULL OR cost >= 0),
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE breeding_records (
        id TEXT PRIMARY KEY,
        female_id TEXT NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
        male_id TEXT REFERENCES animals(id) ON DELETE SET NULL,
        breeding_date TEXT NOT NULL,
        breeding_type TEXT NOT NULL,
        expected_delivery_date TEXT,
        actual_delivery_date TEXT,
        success INTEGER CHECK (success IS NULL OR success IN (0, 1)),
        offspring_count INTEGER CHECK (offspring_count IS NULL OR offspring_count >= 0),
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE feeding_records (
        id TEXT PRIMARY KEY,
        animal_id TEXT NOT NULL REFERENCES animals(id) ON DELETE CASCADE,
        feed_type TEXT NOT NULL,
        quantity REAL CHECK (quantity IS NULL OR quantity >= 0),
        quantity_unit TEXT NOT NULL DEFAULT 'kg',
        feeding_date TEXT NOT NULL,
        cost REAL CHECK (cost IS NULL OR cost >= 0),
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE financial_records (
        id TEXT PRIMARY KEY,
        farm_id TEXT NOT NULL REFERENCES farms(id) ON DELETE CASCADE,
        animal_id TEXT REFERENCES animals(id) ON DELETE SET NULL,
        transaction_date TEXT NOT NULL,
        transaction_type TEXT NOT NULL CHECK (transaction_type IN ('Income', 'Expense')),
        category TEXT NOT NULL,
        amount REAL NOT NULL CHECK (amount >= 0),
        description TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE tasks (
        id TEXT PRIMARY KEY,
        farm_id TEXT NOT NULL REFERENCES farms(id) ON DELETE CASCADE,
        animal_id TEXT REFERENCES animals(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        due_date TEXT,
        priority TEXT NOT NULL DEFAULT 'Medium' CHECK (priority IN ('High', 'Medium', 'Low')),
        status TEXT NOT NULL DEFAULT 'Pending' CHECK (status IN ('Pending', 'In Progress', 'Completed')),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX idx_farms_user ON farms(user_id);
    CREATE INDEX idx_animals_farm ON animals(farm_id);
    CREATE INDEX idx_health_animal ON health_records(animal_id);
    CREATE INDEX idx_breeding_female ON breeding_records(female_id);
    CREATE INDEX idx_breeding_male ON breeding_records(male_id);
    CREATE INDEX idx_feeding_animal ON feeding_records(animal_id);
    CREATE INDEX idx_financial_farm ON financial_records(farm_id);
    CREATE INDEX idx_tasks_farm ON tasks(farm_id);
"#;

/// One connection shared behind a mutex. Statements run on the blocking
/// pool so the async runtime keeps serving other tasks.
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("Opening database at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HerdbookError::Internal(anyhow::Error::new(e).context(format!(
                    "Cannot create database directory {}",
                    parent.display()
                )))
            })?;
        }

        let mut conn = Connection::open(db_path).map_err(DatabaseError::Connection)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::prepare(&mut conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(DatabaseError::Connection)?;
        Self::prepare(&mut conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn prepare(conn: &mut Connection) -> Result<()> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate(conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned.into())
    }

    async fn run<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| HerdbookError::from(DatabaseError::Poisoned))?;
            work(&mut guard)
        })
        .await
        .map_err(|e| HerdbookError::Internal(anyhow::Error::new(e).context("SQLite task failed")))?
    }

    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.conn()?;
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Row counts per collection, for the `init` summary.
    pub fn table_counts(&self) -> Result<Vec<(Collection, i64)>> {
        let conn = self.conn()?;
        Collection::ALL
            .iter()
            .map(|collection| {
                let sql = format!("SELECT COUNT(*) FROM {}", collection.table_name());
                let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
                Ok((*collection, count))
            })
            .collect()
    }
}

/// Bring the schema up to [`CURRENT_DB_VERSION`].
pub(crate) fn migrate(conn: &mut Connection) -> Result<()> {
    let existing_version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if existing_version >= CURRENT_DB_VERSION {
        return Ok(());
    }

    debug!("Upgrading database from version {} to {}", existing_version, CURRENT_DB_VERSION);
    if existing_version == 0 {
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA_V1)
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        tx.pragma_update(None, "user_version", CURRENT_DB_VERSION)?;
        tx.commit()?;
    }

    info!("Database upgraded successfully");
    Ok(())
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn quote(column: &str) -> Result<String> {
    validate_column(column)?;
    Ok(format!("\"{}\"", column))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn render_filter(filter: &Filter, params: &mut Vec<SqlValue>) -> Result<String> {
    let sql = match filter {
        Filter::Eq { column, value } if value.is_null() => format!("{} IS NULL", quote(column)?),
        Filter::Eq { column, value } => {
            params.push(to_sql(value));
            format!("{} = ?", quote(column)?)
        }
        Filter::Neq { column, value } if value.is_null() => format!("{} IS NOT NULL", quote(column)?),
        Filter::Neq { column, value } => {
            params.push(to_sql(value));
            format!("{} <> ?", quote(column)?)
        }
        Filter::In { column, values } => {
            if values.is_empty() {
                // Nothing can match an empty set.
                "0".to_string()
            } else {
                params.extend(values.iter().map(to_sql));
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{} IN ({})", quote(column)?, placeholders)
            }
        }
        Filter::Range { column, lower, upper } => {
            let column = quote(column)?;
            let mut parts = Vec::new();
            if let Some(bound) = lower {
                params.push(to_sql(&bound.value));
                parts.push(format!("{} {} ?", column, if bound.inclusive { ">=" } else { ">" }));
            }
            if let Some(bound) = upper {
                params.push(to_sql(&bound.value));
                parts.push(format!("{} {} ?", column, if bound.inclusive { "<=" } else { "<" }));
            }
            if parts.is_empty() {
                "1".to_string()
            } else {
                parts.join(" AND ")
            }
        }
        Filter::IsNull { column, null: true } => format!("{} IS NULL", quote(column)?),
        Filter::IsNull { column, null: false } => format!("{} IS NOT NULL", quote(column)?),
        Filter::Or(filters) => {
            if filters.is_empty() {
                return Err(HerdbookError::Validation("Empty OR filter".to_string()));
            }
            let parts = filters
                .iter()
                .map(|f| render_filter(f, params))
                .collect::<Result<Vec<_>>>()?;
            format!("({})", parts.join(" OR "))
        }
    };
    Ok(sql)
}

fn where_clause(filters: &[Filter], params: &mut Vec<SqlValue>) -> Result<String> {
    if filters.is_empty() {
        return Ok(String::new());
    }
    let parts = filters
        .iter()
        .map(|f| render_filter(f, params))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(" WHERE {}", parts.join(" AND ")))
}

fn projection(columns: &str) -> Result<String> {
    validate_projection(columns)?;
    let rendered = columns
        .split(',')
        .map(str::trim)
        .map(|column| if column == "*" { Ok("*".to_string()) } else { quote(column) })
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join(", "))
}

fn read_row(row: &rusqlite::Row<'_>, table: &str, names: &[String]) -> rusqlite::Result<Row> {
    let mut out = Row::new();
    for (index, name) in names.iter().enumerate() {
        let value = match row.get_ref(index)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) if BOOLEAN_COLUMNS.contains(&(table, name.as_str())) => Value::Bool(i != 0),
            ValueRef::Integer(i) => Value::from(i),
            ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
            ValueRef::Blob(blob) => Value::String(String::from_utf8_lossy(blob).into_owned()),
        };
        out.insert(name.clone(), value);
    }
    Ok(out)
}

fn query_rows(conn: &Connection, table: &str, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>> {
    debug!("SQL: {}", sql);
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let rows = stmt
        .query_map(params_from_iter(params), |row| read_row(row, table, &names))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Rows from a SELECT, shaped the way the hosted backend returns them.
fn select_rows(conn: &Connection, request: &SelectRequest) -> Result<Value> {
    let table = request.collection.table_name();
    let mut params = Vec::new();
    let mut sql = format!("SELECT {} FROM {}", projection(&request.columns)?, table);
    sql.push_str(&where_clause(&request.filters, &mut params)?);

    if let Some(order) = &request.order {
        sql.push_str(&format!(
            " ORDER BY {} {} {}",
            quote(&order.column)?,
            if order.ascending { "ASC" } else { "DESC" },
            match order.nulls {
                NullsOrder::First => "NULLS FIRST",
                NullsOrder::Last => "NULLS LAST",
            }
        ));
    }
    if let Some(limit) = request.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let rows = query_rows(conn, table, &sql, params)?;

    if request.single {
        return match rows.len() {
            0 => Err(HerdbookError::NotFound {
                collection: table.to_string(),
            }),
            1 => Ok(rows.into_iter().next().map(Value::Object).unwrap_or(Value::Null)),
            n => Err(BackendError::Api {
                status: 406,
                code: Some("PGRST116".to_string()),
                message: "JSON object requested, multiple (or no) rows returned".to_string(),
                details: Some(format!("The result contains {} rows", n)),
                hint: None,
            }
            .into()),
        };
    }
    Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
}

fn insert_rows(conn: &mut Connection, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>> {
    let table = collection.table_name();
    let tx = conn.transaction()?;
    let mut inserted = Vec::with_capacity(rows.len());

    for mut row in rows {
        let now = now_timestamp();
        row.entry("id").or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at").or_insert_with(|| Value::String(now.clone()));
        row.entry("updated_at").or_insert_with(|| Value::String(now));

        let columns = row.keys().map(|c| quote(c)).collect::<Result<Vec<_>>>()?;
        let params: Vec<SqlValue> = row.values().map(to_sql).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            table,
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );
        inserted.extend(query_rows(&tx, table, &sql, params)?);
    }

    tx.commit()?;
    debug!("Inserted {} rows into {}", inserted.len(), table);
    Ok(inserted)
}

fn update_rows(conn: &Connection, collection: Collection, mut patch: Row, matcher: &Match) -> Result<Vec<Row>> {
    let table = collection.table_name();
    patch
        .entry("updated_at")
        .or_insert_with(|| Value::String(now_timestamp()));

    let mut params: Vec<SqlValue> = Vec::new();
    let assignments = patch
        .iter()
        .map(|(column, value)| {
            params.push(to_sql(value));
            Ok(format!("{} = ?", quote(column)?))
        })
        .collect::<Result<Vec<_>>>()?;
    let filter = where_clause(&matcher.to_filters(), &mut params)?;
    let sql = format!("UPDATE {} SET {}{} RETURNING *", table, assignments.join(", "), filter);

    query_rows(conn, table, &sql, params)
}

fn delete_rows(conn: &Connection, collection: Collection, matcher: &Match) -> Result<Vec<Row>> {
    let table = collection.table_name();
    let mut params = Vec::new();
    let filter = where_clause(&matcher.to_filters(), &mut params)?;
    let sql = format!("DELETE FROM {}{} RETURNING *", table, filter);

    query_rows(conn, table, &sql, params)
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn select(&self, request: &SelectRequest) -> Result<Value> {
        let request = request.clone();
        self.run(move |conn| select_rows(conn, &request)).await
    }

    async fn insert(&self, collection: Collection, rows: Vec<Row>) -> Result<Vec<Row>> {
        self.run(move |conn| insert_rows(conn, collection, rows)).await
    }

    async fn update(&self, collection: Collection, patch: Row, matcher: &Match) -> Result<Vec<Row>> {
        let matcher = matcher.clone();
        self.run(move |conn| update_rows(conn, collection, patch, &matcher)).await
    }

    async fn delete(&self, collection: Collection, matcher: &Match) -> Result<Vec<Row>> {
        let matcher = matcher.clone();
        self.run(move |conn| delete_rows(conn, collection, &matcher)).await
    }

    async fn call(&self, procedure: &str, params: Value, caller: Option<&str>) -> Result<Value> {
        let procedure = procedure.to_string();
        let caller = caller.map(str::to_string);
        self.run(move |conn| procedures::call(conn, &procedure, &params, caller.as_deref()))
            .await
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
