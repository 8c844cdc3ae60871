use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::auth_dto::{LoginRequest, RegisterRequest, RegisterResponse},
    error::Result,
    middleware::auth::AuthUser,
    models::profile::NewProfile,
    AppState,
};

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let tokens = state
        .identity
        .sign_in(payload.email.trim(), &payload.password)
        .await?;
    Ok(Json(tokens))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let sign_up = state.identity.sign_up(&payload).await?;

    state
        .profiles
        .create(NewProfile {
            id: sign_up.user_id,
            full_name: payload.full_name.trim().to_string(),
            preferred_name: payload.preferred_name.trim().to_string(),
            whatsapp_no: payload.whatsapp_no.clone(),
            school: payload.school.clone(),
            al_year: payload.al_year.clone(),
            plan: payload.plan,
            subject_stream: payload.subject_stream,
            email: payload.email.trim().to_string(),
            medium: payload.medium,
        })
        .await?;
    tracing::info!(user_id = %sign_up.user_id, plan = payload.plan.as_str(), "User registered");

    let response = RegisterResponse {
        id: sign_up.user_id,
        email: payload.email,
        session: sign_up.tokens,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Local session state is cleared before the provider is told. A failed remote
/// sign-out is logged and not rolled back.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let closed = state.sessions.dispose_owned_by(user.id).await;

    let remote = state.identity.sign_out(&user.access_token).await;
    if let Err(e) = &remote {
        tracing::warn!(user_id = %user.id, error = %e, "Remote sign-out failed");
    }

    Ok(Json(json!({
        "signed_out": true,
        "sessions_closed": closed,
        "remote_revoked": remote.is_ok(),
    })))
}
