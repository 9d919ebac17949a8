use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use zippy_portal::applicants::{DataStore, SqlApplicantSource};
use zippy_portal::config::AppConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared, cached handle on the configured applicant table.
pub(crate) fn applicant_store(config: &AppConfig) -> Arc<DataStore<SqlApplicantSource>> {
    let source = SqlApplicantSource::new(config.database.clone());
    Arc::new(DataStore::new(source, config.cache))
}
