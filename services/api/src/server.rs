use crate::cli::ServeArgs;
use crate::routes::with_service_routes;
use crate::seed::seed_demo_data;
use crate::state::AppState;
use axum::http::{header, Method};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use polling::config::AppConfig;
use polling::error::AppError;
use polling::polls::{InMemoryPollStore, PollService};
use polling::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if args.seed {
        config.seed_demo_data = true;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryPollStore::new());
    let poll_service = Arc::new(PollService::new(store));
    if config.seed_demo_data {
        if let Some(summary) = seed_demo_data(poll_service.as_ref(), Utc::now())? {
            info!(
                users = summary.users,
                polls = summary.polls.len(),
                votes = summary.votes,
                "demo data seeded"
            );
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(config.server.cors_origin_header()?)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = with_service_routes(poll_service)
        .layer(Extension(app_state))
        .layer(cors)
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "polling service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("polling service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
