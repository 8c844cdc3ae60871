pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod sessions;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::{require_admin, require_auth},
    cors::api_cors,
    rate_limit::{new_rps_state, rps_middleware},
};
use crate::AppState;

#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    /// Unauthenticated auth endpoints, shared by all callers.
    pub public_rps: u32,
    /// Routes that call the generative model, per user.
    pub generation_rps: u32,
}

pub fn build_router(state: AppState, limits: RateLimits) -> Router {
    let public_api = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .layer(from_fn_with_state(
            new_rps_state(limits.public_rps),
            rps_middleware,
        ));

    let generation_api = Router::new()
        .route("/api/sessions", post(sessions::create_session))
        .route("/api/sessions/:id/retry", post(sessions::retry_session))
        .route(
            "/api/sessions/:id/review/:index/simplify",
            post(sessions::simplify),
        )
        .layer(from_fn_with_state(
            new_rps_state(limits.generation_rps),
            rps_middleware,
        ))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let student_api = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/dashboard", get(dashboard::get_dashboard))
        .route("/api/profile", patch(dashboard::update_profile))
        .route(
            "/api/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/sessions/:id/answers", put(sessions::select_answer))
        .route("/api/sessions/:id/advance", post(sessions::advance))
        .route("/api/sessions/:id/back", post(sessions::back))
        .route(
            "/api/sessions/:id/review",
            get(sessions::get_review).post(sessions::open_review),
        )
        .layer(from_fn_with_state(state.clone(), require_auth));

    let admin_api = Router::new()
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/:id", delete(admin::delete_user))
        .route("/api/admin/users/:id/role", post(admin::toggle_role))
        .route("/api/admin/analytics", get(admin::analytics))
        .layer(from_fn_with_state(state.clone(), require_admin))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health))
        .merge(public_api)
        .merge(generation_api)
        .merge(student_api)
        .merge(admin_api)
        .with_state(state)
        .layer(api_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(64 * 1024))
}
