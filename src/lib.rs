pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::PgPool;

use crate::error::Result;
use crate::middleware::auth::AuthKeys;
use crate::services::{
    ai_service::{ExplanationSource, GeminiService, QuestionSource},
    identity_service::{IdentityProvider, SupabaseAuthService},
    profile_service::{PgProfileStore, ProfileStore},
    session_service::SessionService,
};

#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<dyn ProfileStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: SessionService,
    pub auth: AuthKeys,
}

impl AppState {
    pub fn new(pool: PgPool) -> Result<Self> {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        let gemini = Arc::new(GeminiService::new(
            http_client.clone(),
            config.gemini_api_key.clone(),
            config.question_model.clone(),
            config.explanation_model.clone(),
        ));
        let identity = SupabaseAuthService::new(
            http_client,
            &config.supabase_url,
            config.supabase_anon_key.clone(),
        )?;

        Ok(Self::from_parts(
            Arc::new(PgProfileStore::new(pool)),
            Arc::new(identity),
            gemini.clone(),
            gemini,
            &config.jwt_secret,
            Duration::from_secs(config.session_settle_seconds),
        ))
    }

    /// Wires the state from already-built collaborators.
    pub fn from_parts(
        profiles: Arc<dyn ProfileStore>,
        identity: Arc<dyn IdentityProvider>,
        questions: Arc<dyn QuestionSource>,
        tutor: Arc<dyn ExplanationSource>,
        jwt_secret: &str,
        settle_timeout: Duration,
    ) -> Self {
        let sessions = SessionService::new(questions, tutor, Arc::clone(&profiles), settle_timeout);
        Self {
            profiles,
            identity,
            sessions,
            auth: AuthKeys::new(jwt_secret),
        }
    }
}
