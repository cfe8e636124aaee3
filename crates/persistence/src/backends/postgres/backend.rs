//! PostgreSQL backend implementation.

use std::error::Error as StdError;
use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use deadpool_postgres::{Config, Pool, Runtime};
use postgres_types::{FromSql, IsNull, ToSql, Type, to_sql_checked};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_postgres::NoTls;

use crate::config::EndpointConfig;
use crate::core::{BackendKind, PoolStats, SqlBackend, SqlConnection};
use crate::error::{BackendError, BackendResult};
use crate::sql::number_placeholders;
use crate::types::{MutationResult, QueryResult, Row, SqlValue, StatementKind};

use super::schema;

const BACKEND_NAME: &str = "postgres";

/// PostgreSQL backend for one endpoint.
pub struct PostgresBackend {
    pool: Pool,
    config: PostgresConfig,
}

impl Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Configuration for the PostgreSQL backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// PostgreSQL host.
    #[serde(default = "default_host")]
    pub host: String,

    /// PostgreSQL port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    #[serde(default = "default_dbname")]
    pub dbname: String,

    /// Database user.
    #[serde(default = "default_user")]
    pub user: String,

    /// Database password.
    #[serde(default)]
    pub password: Option<String>,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Connection timeout in milliseconds. Also bounds waiting for a free
    /// pooled connection.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish_non_exhaustive()
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_dbname() -> String {
    "hytt".to_string()
}

fn default_user() -> String {
    "HYTT".to_string()
}

fn default_max_connections() -> usize {
    10
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dbname: default_dbname(),
            user: default_user(),
            password: None,
            max_connections: default_max_connections(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl PostgresConfig {
    /// Pool settings for an endpoint.
    pub fn for_endpoint(endpoint: &EndpointConfig) -> Self {
        Self {
            host: endpoint.host.clone(),
            port: endpoint.port,
            dbname: endpoint.database.clone(),
            user: endpoint.user.clone(),
            password: Some(endpoint.password.clone()).filter(|p| !p.is_empty()),
            max_connections: endpoint.pool_size.max(1) as usize,
            connect_timeout_ms: endpoint.connect_timeout.as_millis() as u64,
        }
    }
}

impl PostgresBackend {
    /// Creates a backend with the given configuration.
    ///
    /// Connections are established lazily, so an unreachable server does not
    /// fail construction.
    pub fn new(config: PostgresConfig) -> BackendResult<Self> {
        let pool = Self::create_pool(&config)?;
        Ok(Self { pool, config })
    }

    /// Creates a backend for an endpoint.
    pub fn from_endpoint(endpoint: &EndpointConfig) -> BackendResult<Self> {
        Self::new(PostgresConfig::for_endpoint(endpoint))
    }

    fn create_pool(config: &PostgresConfig) -> BackendResult<Pool> {
        let timeout = Duration::from_millis(config.connect_timeout_ms.max(1));

        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.dbname = Some(config.dbname.clone());
        cfg.user = Some(config.user.clone());
        cfg.password = config.password.clone();
        cfg.connect_timeout = Some(timeout);

        let pool = cfg
            .builder(NoTls)
            .map_err(|e| BackendError::Internal {
                backend_name: BACKEND_NAME.to_string(),
                message: format!("Failed to create pool builder: {}", e),
                source: None,
            })?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .build()
            .map_err(|e| BackendError::connection(BACKEND_NAME, e))?;

        Ok(pool)
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    async fn get_client(&self) -> BackendResult<deadpool_postgres::Client> {
        self.pool
            .get()
            .await
            .map_err(|e| BackendError::connection(BACKEND_NAME, e))
    }
}

#[async_trait]
impl SqlBackend for PostgresBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn endpoint(&self) -> String {
        format!(
            "postgres://{}:{}/{}",
            self.config.host, self.config.port, self.config.dbname
        )
    }

    fn pool_stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            max_size: status.max_size as u32,
            size: status.size as u32,
            idle: status.available as u32,
        }
    }

    async fn acquire(&self) -> Result<Box<dyn SqlConnection>, BackendError> {
        let client = self.get_client().await?;
        Ok(Box::new(PostgresConnection(client)))
    }

    async fn init_schema(&self) -> Result<(), BackendError> {
        let client = self.get_client().await?;
        schema::initialize_schema(&client).await
    }
}

/// Connection wrapper for PostgreSQL. Returned to the pool on drop.
pub struct PostgresConnection(deadpool_postgres::Client);

impl Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection").finish()
    }
}

#[async_trait]
impl SqlConnection for PostgresConnection {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, BackendError> {
        run_statement(&self.0, sql, params)
            .await
            .map_err(|e| BackendError::query(BACKEND_NAME, e))
    }

    async fn query(&mut self, sql: &str) -> Result<QueryResult, BackendError> {
        run_statement(&self.0, sql, &[])
            .await
            .map_err(|e| BackendError::query(BACKEND_NAME, e))
    }
}

/// Rewrites a `?` template for PostgreSQL. Inserts without a `RETURNING`
/// clause get `RETURNING id` so the generated key can be reported; the flag
/// says the statement returns rows whose first column is that key.
fn prepare_statement(sql: &str) -> (String, bool) {
    let mut statement = number_placeholders(sql.trim().trim_end_matches(';'));
    let lowered = statement.to_ascii_lowercase();
    let insert = lowered.trim_start().starts_with("insert");
    if insert && !lowered.split_whitespace().any(|word| word == "returning") {
        statement.push_str(" RETURNING id");
    }
    (statement, insert)
}

async fn run_statement(
    client: &deadpool_postgres::Client,
    sql: &str,
    params: &[SqlValue],
) -> Result<QueryResult, tokio_postgres::Error> {
    let (statement, returning) = prepare_statement(sql);
    let bound: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

    if StatementKind::classify(sql) == StatementKind::Select {
        let rows = client.query(statement.as_str(), &bound).await?;
        return Ok(QueryResult::Rows(rows.iter().map(row_to_json).collect()));
    }

    if returning {
        let rows = client.query(statement.as_str(), &bound).await?;
        let insert_id = rows
            .first()
            .and_then(|row| row.try_get::<_, i64>(0).ok())
            .unwrap_or(0);
        return Ok(QueryResult::Mutation(MutationResult::new(
            rows.len() as u64,
            insert_id,
        )));
    }

    let affected = client.execute(statement.as_str(), &bound).await?;
    Ok(QueryResult::Mutation(MutationResult::new(affected, 0)))
}

fn get<'a, T: FromSql<'a>>(row: &'a tokio_postgres::Row, idx: usize) -> Option<T> {
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

/// Maps each column to JSON by its declared type.
fn row_to_json(row: &tokio_postgres::Row) -> Row {
    let mut map = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = match *column.type_() {
            Type::BOOL => get::<bool>(row, idx).map(Value::from),
            Type::INT2 => get::<i16>(row, idx).map(Value::from),
            Type::INT4 => get::<i32>(row, idx).map(Value::from),
            Type::INT8 => get::<i64>(row, idx).map(Value::from),
            Type::FLOAT4 => get::<f32>(row, idx).map(|f| Value::from(f as f64)),
            Type::FLOAT8 => get::<f64>(row, idx).map(Value::from),
            Type::TIMESTAMP => get::<chrono::NaiveDateTime>(row, idx)
                .map(|t| Value::String(t.format("%Y-%m-%d %H:%M:%S").to_string())),
            Type::TIMESTAMPTZ => get::<chrono::DateTime<chrono::Utc>>(row, idx)
                .map(|t| Value::String(t.format("%Y-%m-%d %H:%M:%S").to_string())),
            Type::DATE => get::<chrono::NaiveDate>(row, idx)
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
            Type::JSON | Type::JSONB => get::<Value>(row, idx),
            _ => get::<String>(row, idx).map(Value::String),
        };
        map.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    map
}

impl ToSql for SqlValue {
    /// Binds leniently: numbers bound to text columns are written as text and
    /// numeric text bound to number columns is parsed.
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Integer(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::BOOL => (*i != 0).to_sql(ty, out),
                _ => i.to_string().to_sql(ty, out),
            },
            SqlValue::Real(f) => match *ty {
                Type::INT2 | Type::INT4 | Type::INT8 => SqlValue::Integer(*f as i64).to_sql(ty, out),
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::BOOL => (*f != 0.0).to_sql(ty, out),
                _ => f.to_string().to_sql(ty, out),
            },
            SqlValue::Text(s) => match *ty {
                Type::INT2 | Type::INT4 | Type::INT8 => {
                    SqlValue::Integer(s.trim().parse::<i64>()?).to_sql(ty, out)
                }
                Type::FLOAT4 | Type::FLOAT8 => SqlValue::Real(s.trim().parse::<f64>()?).to_sql(ty, out),
                Type::BOOL => matches!(s.as_str(), "1" | "true" | "t").to_sql(ty, out),
                _ => s.as_str().to_sql(ty, out),
            },
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::BOOL
                | Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::UNKNOWN
        )
    }

    to_sql_checked!();
}
