use crate::cli::ServeArgs;
use crate::infra::{load_mapper, AppState, InMemoryCertificateRepository, InMemoryDocumentStore};
use crate::routes::with_certificate_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use resale_cert::certificate::{ResaleCertificateService, ServiceSettings};
use resale_cert::config::AppConfig;
use resale_cert::error::AppError;
use resale_cert::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let documents = &config.documents;
    let mapper = load_mapper(documents.manifest_path.as_deref())?;
    let template = std::fs::read(&documents.template_path)?;
    info!(
        template = %documents.template_path.display(),
        manifest_version = mapper.manifest().version().unwrap_or("unversioned"),
        fields = mapper.manifest().len(),
        "loaded certificate template"
    );

    let certificate_service = Arc::new(ResaleCertificateService::new(
        Arc::new(mapper),
        template,
        Arc::new(InMemoryDocumentStore::default()),
        Arc::new(InMemoryCertificateRepository::default()),
        ServiceSettings::from(documents),
    ));

    let app = with_certificate_routes(certificate_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "resale certificate service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
