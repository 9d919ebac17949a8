use crate::cli::ServeArgs;
use crate::infra::{applicant_store, AppState};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use zippy_portal::config::AppConfig;
use zippy_portal::error::AppError;
use zippy_portal::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    if config.database.connection.is_none() {
        info!("no database credentials configured; the dashboard will report a load failure");
    }
    let store = applicant_store(&config);

    let app = with_portal_routes(store)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        table = %config.database.table,
        cache_ttl_secs = config.cache.ttl.as_secs(),
        "zippy sales portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
