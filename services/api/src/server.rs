use crate::cli::ServeArgs;
use crate::infra::{
    load_directory, AppState, InMemoryEmployeeStore, InMemoryOutbox, Mailer, ResetService,
    RosterDirectory, UploadService,
};
use crate::routes::app_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use opum::config::AppConfig;
use opum::error::AppError;
use opum::reset::{PasswordResetService, SmtpMailTransport};
use opum::telemetry;
use opum::upload::{AdminEmployeeValidator, EmployeeUploadService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

/// Wires the upload service to the reset service, which doubles as its notifier.
pub(crate) fn assemble(
    config: &AppConfig,
    directory: RosterDirectory,
    store: Arc<InMemoryEmployeeStore>,
    mailer: Mailer,
) -> (Arc<UploadService>, Arc<ResetService>) {
    let reset = Arc::new(PasswordResetService::new(
        store.clone(),
        Arc::new(mailer),
        &config.reset,
    ));
    let validator = Arc::new(AdminEmployeeValidator::with_date_format(
        Arc::new(directory),
        config.upload.date_format.clone(),
    ));
    let upload = Arc::new(EmployeeUploadService::with_policy(
        validator,
        store,
        reset.clone(),
        config.upload.notification_policy,
    ));
    (upload, reset)
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = load_directory(config.directory.roster_path.as_deref())
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    let mailer = match &config.smtp {
        Some(smtp) => Mailer::Smtp(
            SmtpMailTransport::new(smtp).map_err(|err| AppError::Io(std::io::Error::other(err)))?,
        ),
        None => {
            info!("SMTP_HOST not set; reset emails are kept in the in-memory outbox");
            Mailer::Outbox(InMemoryOutbox::default())
        }
    };
    let store = Arc::new(InMemoryEmployeeStore::default());
    let (upload, reset) = assemble(&config, directory, store, mailer);

    let app = app_router(upload, reset)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        policy = ?config.upload.notification_policy,
        "opum administration backend ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
