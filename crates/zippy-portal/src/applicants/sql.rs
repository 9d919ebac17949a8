use std::collections::BTreeMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::mysql::{MySql, MySqlPool};
use sqlx::pool::PoolOptions;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::{Column, ColumnIndex, Database, Decode, Executor, Pool, Row, Statement, Type, ValueRef};
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use super::domain::{missing_columns, ApplicantRecord, Dataset};
use super::store::{ApplicantSource, LoadError};
use crate::config::{ConnectionParts, DatabaseConfig, DatabaseConnection};

/// Reads the applicant table through the driver named by the connection URL.
///
/// The pool is created on first use so a missing or broken connection setting
/// shows up as a load failure instead of stopping the service from starting.
pub struct SqlApplicantSource {
    config: DatabaseConfig,
    pool: OnceCell<ApplicantPool>,
}

enum ApplicantPool {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl SqlApplicantSource {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    pub fn query(&self) -> String {
        format!("SELECT * FROM {}", self.config.table)
    }

    async fn pool(&self) -> Result<&ApplicantPool, LoadError> {
        self.pool
            .get_or_try_init(|| async {
                let connection = self
                    .config
                    .connection
                    .as_ref()
                    .ok_or(LoadError::MissingCredentials)?;
                let url = connection_url(connection)?;
                open_pool(url.expose_secret(), self.config.acquire_timeout)
            })
            .await
    }
}

impl ApplicantSource for SqlApplicantSource {
    fn describe(&self) -> String {
        format!("table {}", self.config.table)
    }

    // The statement is prepared first so the schema is checked even when the
    // table is empty. Rows are then fetched as plain text queries, which makes
    // postgres and mysql send every value in its text form.
    async fn load(&self) -> Result<Dataset, LoadError> {
        let query = self.query();
        debug!(%query, "fetching applicant table");
        match self.pool().await? {
            ApplicantPool::Postgres(pool) => {
                let statement = pool.prepare(query.as_str()).await.map_err(classify_error)?;
                let columns = checked_columns(statement.columns())?;
                let rows = pool.fetch_all(query.as_str()).await.map_err(classify_error)?;
                decode_rows(columns, &rows)
            }
            ApplicantPool::MySql(pool) => {
                let statement = pool.prepare(query.as_str()).await.map_err(classify_error)?;
                let columns = checked_columns(statement.columns())?;
                let rows = pool.fetch_all(query.as_str()).await.map_err(classify_error)?;
                decode_rows(columns, &rows)
            }
            ApplicantPool::Sqlite(pool) => {
                let statement = pool.prepare(query.as_str()).await.map_err(classify_error)?;
                let columns = checked_columns(statement.columns())?;
                let rows = pool.fetch_all(query.as_str()).await.map_err(classify_error)?;
                decode_rows(columns, &rows)
            }
        }
    }
}

fn open_pool(url: &str, acquire_timeout: Duration) -> Result<ApplicantPool, LoadError> {
    let scheme = url.split_once(':').map_or(url, |(scheme, _)| scheme);
    match scheme.to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => {
            lazy_pool::<Postgres>(url, acquire_timeout).map(ApplicantPool::Postgres)
        }
        "mysql" => lazy_pool::<MySql>(url, acquire_timeout).map(ApplicantPool::MySql),
        "sqlite" => lazy_pool::<Sqlite>(url, acquire_timeout).map(ApplicantPool::Sqlite),
        _ => Err(LoadError::UnsupportedDriver(scheme.to_string())),
    }
}

fn lazy_pool<DB: Database>(url: &str, acquire_timeout: Duration) -> Result<Pool<DB>, LoadError> {
    PoolOptions::<DB>::new()
        .max_connections(4)
        .acquire_timeout(acquire_timeout)
        .connect_lazy(url)
        .map_err(|err| LoadError::InvalidConnection(err.to_string()))
}

/// Builds the sqlx connection URL. Network drivers always require verified TLS.
pub fn connection_url(connection: &DatabaseConnection) -> Result<SecretString, LoadError> {
    match connection {
        DatabaseConnection::Url(url) => Ok(url.clone()),
        DatabaseConnection::Parts(parts) => url_from_parts(parts),
    }
}

fn url_from_parts(parts: &ConnectionParts) -> Result<SecretString, LoadError> {
    let (scheme, tls) = match parts.driver.trim().to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" => ("postgres", Some(("sslmode", "verify-full"))),
        "mysql" | "mariadb" => ("mysql", Some(("ssl-mode", "VERIFY_IDENTITY"))),
        "sqlite" => return Ok(SecretString::from(format!("sqlite:{}", parts.database))),
        _ => return Err(LoadError::UnsupportedDriver(parts.driver.clone())),
    };

    if parts.server.is_empty() {
        return Err(LoadError::InvalidConnection(
            "a server host is required for network drivers".to_string(),
        ));
    }

    let invalid = |what: &str| LoadError::InvalidConnection(format!("invalid {what}"));
    let mut url = Url::parse(&format!("{scheme}://localhost")).map_err(|_| invalid("driver"))?;
    url.set_host(Some(&parts.server)).map_err(|_| invalid("server host"))?;
    url.set_port(parts.port).map_err(|_| invalid("port"))?;
    url.set_path(&parts.database);
    if let Some(user) = &parts.user {
        url.set_username(user).map_err(|_| invalid("user"))?;
    }
    if let Some(password) = &parts.password {
        url.set_password(Some(password.expose_secret()))
            .map_err(|_| invalid("password"))?;
    }
    if let Some((key, value)) = tls {
        url.query_pairs_mut().append_pair(key, value);
    }

    Ok(SecretString::from(String::from(url)))
}

fn classify_error(err: sqlx::Error) -> LoadError {
    match err {
        // Protocol failures are wire-level, including TLS and auth negotiation.
        sqlx::Error::Configuration(_)
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => LoadError::Connection(err),
        sqlx::Error::Database(ref db) if is_auth_failure(db.code().as_deref()) => {
            LoadError::Connection(err)
        }
        other => LoadError::Query(other),
    }
}

/// Postgres class 28 (invalid authorization) and MySQL 1045 (access denied).
fn is_auth_failure(code: Option<&str>) -> bool {
    matches!(code, Some(code) if code.starts_with("28") || code == "1045")
}

fn checked_columns<C: Column>(columns: &[C]) -> Result<Vec<String>, LoadError> {
    let names: Vec<String> = columns.iter().map(|column| column.name().to_string()).collect();
    let missing = missing_columns(names.iter().map(String::as_str));
    if !missing.is_empty() {
        return Err(LoadError::SchemaMismatch { missing });
    }
    Ok(names)
}

fn decode_rows<R: TextRow>(columns: Vec<String>, rows: &[R]) -> Result<Dataset, LoadError> {
    let records = rows
        .iter()
        .enumerate()
        .map(|(index, row)| decode_row(row, &columns, index + 1))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Dataset::new(columns, records))
}

fn decode_row<R: TextRow>(
    row: &R,
    columns: &[String],
    row_number: usize,
) -> Result<ApplicantRecord, LoadError> {
    let mut cells: BTreeMap<String, Cell> = columns
        .iter()
        .enumerate()
        .map(|(index, name)| (name.clone(), row.cell(index)))
        .collect();

    let mut take = |column: &'static str| match cells.remove(column) {
        Some(Cell::Text(value)) => Ok(Some(value)),
        Some(Cell::Null) | None => Ok(None),
        Some(Cell::Unreadable) => Err(LoadError::UnsupportedValue {
            column: column.to_string(),
            row: row_number,
        }),
    };
    let required = |value: Option<String>, column: &'static str| {
        value.ok_or(LoadError::NullValue { column, row: row_number })
    };
    let state = required(take("state")?, "state")?;
    let naics_code = required(take("naics_code")?, "naics_code")?;
    let zone_result = required(take("zone_result")?, "zone_result")?;
    let city = take("city")?;
    let zipcode = take("zipcode")?;

    let extra = cells
        .into_iter()
        .map(|(name, cell)| {
            let value = match cell {
                Cell::Text(value) => Some(value),
                Cell::Null => None,
                Cell::Unreadable => {
                    debug!(column = %name, row = row_number, "unreadable value shown as empty");
                    None
                }
            };
            (name, value)
        })
        .collect();

    Ok(ApplicantRecord {
        state,
        city,
        zipcode,
        naics_code,
        zone_result,
        extra,
    })
}

enum Cell {
    Null,
    Text(String),
    Unreadable,
}

/// Rows whose cells can be rendered as display text.
trait TextRow: Row {
    fn cell(&self, index: usize) -> Cell;
}

impl<R> TextRow for R
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> bool: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database>,
{
    /// Typed reads come first. Anything else (dates, decimals, uuids) is read
    /// as its text form, and binary values that are not UTF-8 show their size.
    fn cell(&self, index: usize) -> Cell {
        match self.try_get_raw(index) {
            Ok(value) if value.is_null() => return Cell::Null,
            Ok(_) => {}
            Err(_) => return Cell::Unreadable,
        }
        if let Ok(value) = self.try_get::<String, _>(index) {
            return Cell::Text(value);
        }
        if let Ok(value) = self.try_get::<i64, _>(index) {
            return Cell::Text(value.to_string());
        }
        if let Ok(value) = self.try_get::<f64, _>(index) {
            return Cell::Text(value.to_string());
        }
        if let Ok(value) = self.try_get::<bool, _>(index) {
            return Cell::Text(value.to_string());
        }
        if let Ok(value) = self.try_get_unchecked::<String, _>(index) {
            return Cell::Text(value);
        }
        match self.try_get_unchecked::<Vec<u8>, _>(index) {
            Ok(bytes) => Cell::Text(format!("<{} bytes>", bytes.len())),
            Err(_) => Cell::Unreadable,
        }
    }
}
