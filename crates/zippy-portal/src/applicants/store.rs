use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::domain::{ApplicantRecord, Dataset, REQUIRED_COLUMNS};
use super::filter::FilterCriteria;
use super::summary::GroupKey;
use super::view::PortalView;
use crate::config::CacheConfig;

/// Backing store the applicant table is read from, always as a whole.
pub trait ApplicantSource: Send + Sync {
    /// Short human readable origin, used in logs.
    fn describe(&self) -> String;

    fn load(&self) -> impl Future<Output = Result<Dataset, LoadError>> + Send;
}

/// Any failure while fetching or validating the applicant table.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("database credentials are not configured")]
    MissingCredentials,
    #[error("unsupported database driver '{0}'")]
    UnsupportedDriver(String),
    #[error("invalid connection settings: {0}")]
    InvalidConnection(String),
    #[error("could not connect to the applicant database: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("applicant query failed: {0}")]
    Query(#[source] sqlx::Error),
    #[error("applicant table is missing required columns: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },
    #[error("row {row}: required column '{column}' is null")]
    NullValue { column: &'static str, row: usize },
    #[error("row {row}: column '{column}' holds a value that cannot be shown as text")]
    UnsupportedValue { column: String, row: usize },
    #[error("failed to read applicant export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid applicant CSV data: {0}")]
    Csv(#[from] csv::Error),
}

impl LoadError {
    /// Store unreachable or not configured, as opposed to bad data.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials
                | Self::UnsupportedDriver(_)
                | Self::InvalidConnection(_)
                | Self::Connection(_)
                | Self::Io(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_connection() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::BAD_GATEWAY
        }
    }
}

struct CachedDataset {
    dataset: Arc<Dataset>,
    expires_at: Instant,
}

/// Time-bounded cache in front of an [`ApplicantSource`].
///
/// The lock is held while a refresh runs, so concurrent callers wait for a
/// single fetch and then share the same snapshot. Failed loads are not cached.
pub struct DataStore<S> {
    source: S,
    ttl: Duration,
    cached: Mutex<Option<CachedDataset>>,
}

impl<S: ApplicantSource> DataStore<S> {
    pub fn new(source: S, cache: CacheConfig) -> Self {
        Self {
            source,
            ttl: cache.ttl,
            cached: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn snapshot(&self) -> Result<Arc<Dataset>, LoadError> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if Instant::now() < entry.expires_at {
                return Ok(Arc::clone(&entry.dataset));
            }
            debug!("applicant dataset expired");
        }

        let dataset = match self.source.load().await {
            Ok(dataset) => Arc::new(dataset),
            Err(err) => {
                warn!(source = %self.source.describe(), error = %err, "applicant load failed");
                return Err(err);
            }
        };
        info!(
            source = %self.source.describe(),
            records = dataset.len(),
            ttl_secs = self.ttl.as_secs(),
            "applicant dataset loaded"
        );

        *cached = Some(CachedDataset {
            dataset: Arc::clone(&dataset),
            expires_at: Instant::now() + self.ttl,
        });
        Ok(dataset)
    }

    /// Drops the cached snapshot; the next call to [`Self::snapshot`] refetches.
    pub async fn invalidate(&self) {
        if self.cached.lock().await.take().is_some() {
            info!("applicant dataset cache cleared");
        }
    }

    pub async fn expires_at(&self) -> Option<Instant> {
        self.cached.lock().await.as_ref().map(|entry| entry.expires_at)
    }

    /// Loads (or reuses) the dataset and runs the full filter/summary pipeline.
    pub async fn view(
        &self,
        criteria: FilterCriteria,
        group_by: GroupKey,
    ) -> Result<PortalView, LoadError> {
        let dataset = self.snapshot().await?;
        Ok(PortalView::build(&dataset, criteria, group_by))
    }
}

/// Fixed in-memory table, handy for demos and tests.
#[derive(Debug, Clone)]
pub struct MemoryApplicantSource {
    columns: Vec<String>,
    records: Vec<ApplicantRecord>,
}

impl MemoryApplicantSource {
    pub fn new(records: Vec<ApplicantRecord>) -> Self {
        let columns = REQUIRED_COLUMNS.iter().map(|column| column.to_string()).collect();
        Self { columns, records }
    }

    pub fn with_columns(columns: Vec<String>, records: Vec<ApplicantRecord>) -> Self {
        Self { columns, records }
    }
}

impl ApplicantSource for MemoryApplicantSource {
    fn describe(&self) -> String {
        "in-memory applicants".to_string()
    }

    async fn load(&self) -> Result<Dataset, LoadError> {
        Ok(Dataset::new(self.columns.clone(), self.records.clone()))
    }
}
