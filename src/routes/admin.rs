use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    dto::admin_dto::{RoleChangeResponse, UserListQuery},
    error::Result,
    services::admin_service,
    AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse> {
    let profiles = state.profiles.list().await?;
    Ok(Json(admin_service::filter_profiles(
        profiles,
        query.filter.as_deref(),
    )))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.profiles.delete(id).await?;
    let closed = state.sessions.dispose_owned_by(id).await;
    tracing::info!(user_id = %id, sessions_closed = closed, "User profile deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let profile = state.profiles.fetch(id).await?;
    let role = profile.role.toggled();
    state.profiles.set_role(id, role).await?;
    tracing::info!(user_id = %id, role = role.as_str(), "User role changed");
    Ok(Json(RoleChangeResponse { id, role }))
}

pub async fn analytics(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let profiles = state.profiles.list().await?;
    Ok(Json(admin_service::analytics(&profiles)))
}
