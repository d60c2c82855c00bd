//! Liveness, login hint and status suggestion.

use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};
use tasksteer_proto::api::{MessageResponse, SuggestStatusRequest, SuggestStatusResponse};

use super::present;
use crate::ai;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::server::AppState;

/// `GET /`
pub async fn index() -> Json<MessageResponse> {
    Json(MessageResponse::new("TaskSteer backend is running."))
}

/// `POST /login`. Sign-in happens on the client against the identity
/// provider; the server only verifies the resulting tokens.
pub async fn login() -> Json<MessageResponse> {
    Json(MessageResponse::new(
        "Login is handled by the identity provider on the client. \
         Send the ID token as 'Authorization: Bearer <token>'.",
    ))
}

/// `POST /suggest-status`
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Identity>,
    Json(body): Json<SuggestStatusRequest>,
) -> Result<Json<SuggestStatusResponse>, ApiError> {
    let title = present(body.title)
        .ok_or_else(|| ApiError::BadRequest("Task title is required.".into()))?;
    let description = body.description.unwrap_or_default();
    let model = state.model()?;

    let status = ai::suggest_status(model, &title, &description).await?;
    tracing::info!(user_id = %user.uid, status = %status, "status suggested");

    Ok(Json(SuggestStatusResponse {
        suggested_status: status.label().to_string(),
    }))
}
