use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::AppState;

/// Audience the identity provider stamps on signed-in user tokens.
pub const TOKEN_AUDIENCE: &str = "authenticated";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
}

/// The caller of a request, attached by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    /// Raw bearer token, forwarded on sign-out.
    pub access_token: String,
}

#[derive(Clone)]
pub struct AuthKeys {
    decoding: DecodingKey,
    validation: Validation,
}

impl AuthKeys {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&[TOKEN_AUDIENCE]);
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn authenticate(&self, token: &str) -> Option<AuthUser> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).ok()?;
        let id = Uuid::parse_str(&data.claims.sub).ok()?;
        Some(AuthUser {
            id,
            email: data.claims.email,
            access_token: token.to_string(),
        })
    }
}

fn unauthorized(code: &str) -> Response {
    Error::Unauthorized(code.to_string()).into_response()
}

fn forbidden() -> Response {
    Error::Forbidden("forbidden".to_string()).into_response()
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("unsupported_scheme");
    };

    match state.auth.authenticate(token.trim()) {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => unauthorized("invalid_token"),
    }
}

/// Must run after [`require_auth`]. Admin rights come from the stored profile,
/// not from token claims.
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(user_id) = req.extensions().get::<AuthUser>().map(|u| u.id) else {
        return unauthorized("missing_authorization");
    };

    match state.profiles.fetch(user_id).await {
        Ok(profile) if profile.is_admin() => next.run(req).await,
        Ok(_) => forbidden(),
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Admin check failed");
            forbidden()
        }
    }
}
