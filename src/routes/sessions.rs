use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use validator::Validate;

use crate::{
    dto::session_dto::{CreateSessionRequest, SelectAnswerRequest},
    error::Result,
    middleware::auth::AuthUser,
    models::exam::SessionId,
    services::session_service::Action,
    AppState,
};

#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let view = state.sessions.create(user.id, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.view(user.id, id).await?))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse> {
    state.sessions.dispose(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn retry_session(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.retry(user.id, id).await?))
}

#[axum::debug_handler]
pub async fn select_answer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<SessionId>,
    Json(payload): Json<SelectAnswerRequest>,
) -> Result<impl IntoResponse> {
    let action = Action::SelectAnswer {
        index: payload.index,
        choice: payload.choice,
    };
    Ok(Json(state.sessions.apply(user.id, id, action).await?))
}

pub async fn advance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.apply(user.id, id, Action::Advance).await?))
}

pub async fn back(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.apply(user.id, id, Action::Back).await?))
}

pub async fn open_review(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse> {
    state.sessions.apply(user.id, id, Action::OpenReview).await?;
    Ok(Json(state.sessions.review(user.id, id).await?))
}

pub async fn get_review(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<SessionId>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.review(user.id, id).await?))
}

pub async fn simplify(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, index)): Path<(SessionId, usize)>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.simplify(user.id, id, index).await?))
}
