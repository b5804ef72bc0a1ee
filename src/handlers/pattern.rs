use axum::{extract::State, Json};
use validator::Validate;

use crate::errors::AppError;
use crate::models::pattern::{DetectRequest, PatternResponse};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/patterns/detect",
    request_body = DetectRequest,
    responses(
        (status = 200, description = "Head and shoulders detection over the given closes", body = PatternResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    )
)]
pub async fn detect_pattern(
    State(state): State<AppState>,
    Json(request): Json<DetectRequest>,
) -> Result<Json<PatternResponse>, AppError> {
    request.validate()?;

    let result = state.detector.detect(&request.closes, request.inverse);
    Ok(Json(PatternResponse::from_result(&result, &request.closes)))
}
