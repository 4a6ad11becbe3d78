use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use apply_portal::config::AppConfig;
use apply_portal::error::AppError;
use apply_portal::telemetry;
use apply_portal::workflows::applications::{ApplicationChoiceService, ApplicationPolicy};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{AppState, Fixture};
use crate::routes::with_application_routes;

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let fixture = match args.fixture.take() {
        Some(path) => {
            info!(path = %path.display(), "seeding stores from fixture");
            Fixture::from_path(&path)?
        }
        None => Fixture::default(),
    };
    let (repository, catalog) = fixture.into_stores();
    let application_service = Arc::new(ApplicationChoiceService::new(
        Arc::new(repository),
        Arc::new(catalog),
        ApplicationPolicy::from_cycle(&config.cycle),
    ));

    let app = with_application_routes(application_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cycle = config.cycle.current_year,
        "apply portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
