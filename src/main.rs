use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use hnsscreener::business_logic::config::ScreenerConfig;
use hnsscreener::services::hyperliquid::HyperliquidClient;
use hnsscreener::state::AppState;
use hnsscreener::{errors, handlers, models};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::pattern::detect_pattern,
        handlers::screener::get_screen,
        handlers::screener::get_screen_csv,
        handlers::screener::post_screen_log,
        handlers::screener::get_screen_stream
    ),
    components(schemas(
        models::health::HealthResponse,
        models::pattern::DetectRequest,
        models::pattern::PatternResponse,
        models::pattern::LandmarkPoint,
        models::pattern::ScoreView,
        models::screener::PatternKind,
        models::screener::ScreenRow,
        models::screener::ScreenReport,
        models::screener::MatchLogResponse,
        errors::ErrorResponse
    ))
)]
struct ApiDoc;

/// Console logging plus an optional daily-rolling file; the guard must outlive the server
fn init_tracing(log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hnsscreener=info,tower_http=debug".into());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "hnsscreener.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/patterns/detect", post(handlers::pattern::detect_pattern))
        .route("/patterns/screen", get(handlers::screener::get_screen))
        .route("/patterns/screen.csv", get(handlers::screener::get_screen_csv))
        .route("/patterns/screen/log", post(handlers::screener::post_screen_log))
        .route(
            "/patterns/screen/stream",
            get(handlers::screener::get_screen_stream),
        )
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ScreenerConfig::from_env().context("invalid configuration")?;
    let _guard = init_tracing(config.log_dir.as_deref());

    tracing::info!(
        "Screening {} symbols over {} daily closes (min confidence {:.0}%)",
        config.symbols.len(),
        config.window,
        config.min_confidence
    );

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, Arc::new(HyperliquidClient::new()));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("Server running on http://{}", bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app(state))
        .await
        .context("server error")
}
