use axum::{extract::State, response::IntoResponse, Extension, Json};
use chrono::Utc;

use crate::{
    dto::dashboard_dto::{DashboardResponse, UpdateProfileRequest},
    error::Result,
    middleware::auth::AuthUser,
    services::quota_service,
    AppState,
};

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let profile =
        quota_service::load_profile_for_month(state.profiles.as_ref(), user.id, Utc::now()).await?;
    let usage = quota_service::usage_summary(profile.plan, &profile.usage);
    let subjects = profile
        .subject_stream
        .subjects()
        .iter()
        .map(|s| s.to_string())
        .collect();

    Ok(Json(DashboardResponse {
        profile,
        usage,
        subjects,
    }))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse> {
    state.profiles.set_medium(user.id, payload.medium).await?;
    let profile = state.profiles.fetch(user.id).await?;
    Ok(Json(profile))
}
