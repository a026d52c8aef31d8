use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Json},
};

use crate::{
    dto::auth_dto::{LoginPayload, RegisterPayload, ResetPasswordParams},
    error::{Error, Result},
    middleware::auth::bearer_token,
    AppState,
};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse> {
    let res = state
        .auth_service
        .register(&payload.email, &payload.password, payload.full_name)
        .await?;
    Ok(Json(res))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    let res = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(res))
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let res = state.auth_service.logout(bearer_token(&headers)).await?;
    Ok(Json(res))
}

/// Accepts `?email=` or a JSON body; the query wins when both are sent.
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Query(query): Query<ResetPasswordParams>,
    body: Option<Json<ResetPasswordParams>>,
) -> Result<impl IntoResponse> {
    let email = query
        .email
        .or_else(|| body.and_then(|Json(b)| b.email))
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| Error::BadRequest("email is required".to_string()))?;

    let res = state.auth_service.reset_password(&email).await?;
    Ok(Json(res))
}
