use std::convert::Infallible;
use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use validator::Validate;

use crate::errors::AppError;
use crate::models::screener::{MatchLogResponse, ScreenQuery, ScreenReport};
use crate::services::export::{append_log, to_csv, CSV_FILE_NAME};
use crate::services::screener::{ReportBuilder, ScreenRequest};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/patterns/screen",
    params(ScreenQuery),
    responses(
        (status = 200, description = "Symbols matching the requested pattern", body = ScreenReport),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "No symbol could be fetched", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_screen(
    State(state): State<AppState>,
    Query(query): Query<ScreenQuery>,
) -> Result<Json<ScreenReport>, AppError> {
    let request = build_request(&state, &query)?;
    let report = state.screener.screen(&request).await;
    ensure_scanned(&report)?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/patterns/screen.csv",
    params(ScreenQuery),
    responses(
        (status = 200, description = "Matches as a CSV download", content_type = "text/csv"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "No symbol could be fetched", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_screen_csv(
    State(state): State<AppState>,
    Query(query): Query<ScreenQuery>,
) -> Result<impl IntoResponse, AppError> {
    let request = build_request(&state, &query)?;
    let report = state.screener.screen(&request).await;
    ensure_scanned(&report)?;
    let body = to_csv(&report.matches)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILE_NAME}\""),
            ),
        ],
        body,
    ))
}

#[utoipa::path(
    post,
    path = "/patterns/screen/log",
    params(ScreenQuery),
    responses(
        (status = 200, description = "Matches appended to the local match log", body = MatchLogResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 502, description = "No symbol could be fetched", body = crate::errors::ErrorResponse)
    )
)]
pub async fn post_screen_log(
    State(state): State<AppState>,
    Query(query): Query<ScreenQuery>,
) -> Result<Json<MatchLogResponse>, AppError> {
    let request = build_request(&state, &query)?;
    let report = state.screener.screen(&request).await;
    ensure_scanned(&report)?;

    let path = PathBuf::from(&state.config.match_log);
    let rows = report.matches.clone();
    let now = chrono::Utc::now();
    let logged = tokio::task::spawn_blocking({
        let path = path.clone();
        move || append_log(&path, &rows, now)
    })
    .await
    .map_err(|err| AppError::Internal(format!("match log task failed: {err}")))??;

    tracing::info!("Logged {} matches to {}", logged, path.display());

    Ok(Json(MatchLogResponse {
        log_path: path.display().to_string(),
        logged,
        report,
    }))
}

#[utoipa::path(
    get,
    path = "/patterns/screen/stream",
    params(ScreenQuery),
    responses(
        (status = 200, description = "SSE stream of matches as symbols finish, then the full report", content_type = "text/event-stream"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    )
)]
pub async fn get_screen_stream(
    State(state): State<AppState>,
    Query(query): Query<ScreenQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let request = build_request(&state, &query)?;

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(run_screen_stream(state, request, tx));

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

async fn run_screen_stream(
    state: AppState,
    request: ScreenRequest,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) {
    let mut outcomes = state.screener.spawn_scan(&request);
    let mut report = ReportBuilder::new(&request);

    while let Some(outcome) = outcomes.recv().await {
        let Some(row) = report.push(outcome) else {
            continue;
        };
        if send_event(&tx, "row", &row.symbol, &row).await.is_err() {
            tracing::debug!("screen stream closed by client");
            return;
        }
    }

    let report = report.finish();
    let id = report.as_of_ms.to_string();
    if send_event(&tx, "report", &id, &report).await.is_err() {
        tracing::debug!("screen stream closed before final report");
    }
}

async fn send_event<T: Serialize>(
    tx: &mpsc::Sender<Result<Event, Infallible>>,
    name: &str,
    id: &str,
    payload: &T,
) -> Result<(), AppError> {
    let data = serde_json::to_string(payload).map_err(|err| AppError::Internal(err.to_string()))?;
    let event = Event::default().event(name).id(id).data(data);

    tx.send(Ok(event))
        .await
        .map_err(|_| AppError::Internal("screen stream closed".to_string()))
}

/// A run where every symbol failed to fetch or was too short is an upstream failure
fn ensure_scanned(report: &ScreenReport) -> Result<(), AppError> {
    if report.scanned == 0 && report.skipped > 0 {
        return Err(AppError::Upstream(format!(
            "no usable price history for any of {} symbols",
            report.skipped
        )));
    }
    Ok(())
}

fn build_request(state: &AppState, query: &ScreenQuery) -> Result<ScreenRequest, AppError> {
    query.validate()?;

    Ok(ScreenRequest {
        pattern: query.pattern,
        min_confidence: query.min_confidence.unwrap_or(state.config.min_confidence),
        symbols: query
            .symbol_list()
            .unwrap_or_else(|| state.config.symbols.clone()),
    })
}
