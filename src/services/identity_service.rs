use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use url::Url;
use uuid::Uuid;

use crate::dto::auth_dto::{AuthTokens, RegisterRequest};
use crate::error::{Error, Result};

/// Result of a successful sign-up.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub user_id: Uuid,
    /// Present only when the provider signs the user in immediately.
    pub tokens: Option<AuthTokens>,
}

/// Hosted identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens>;

    async fn sign_up(&self, request: &RegisterRequest) -> Result<SignUp>;

    /// Revokes the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

/// GoTrue REST client for a Supabase project.
#[derive(Clone)]
pub struct SupabaseAuthService {
    client: Client,
    base: Url,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct SignUpBody {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    user: Option<UserBody>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: Uuid,
}

impl SupabaseAuthService {
    pub fn new(client: Client, base_url: &str, anon_key: String) -> Result<Self> {
        Ok(Self {
            client,
            base: Url::parse(base_url)?,
            anon_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthService {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let res = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .timeout(Duration::from_secs(15))
            .send()
            .await?;

        match res.status() {
            s if s.is_success() => Ok(res.json::<AuthTokens>().await?),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                let text = res.text().await.unwrap_or_default();
                Err(Error::Unauthorized(provider_message(&text)))
            }
            status => {
                let text = res.text().await.unwrap_or_default();
                Err(anyhow::anyhow!("Identity provider error {}: {}", status, provider_message(&text)).into())
            }
        }
    }

    async fn sign_up(&self, request: &RegisterRequest) -> Result<SignUp> {
        let payload = json!({
            "email": request.email,
            "password": request.password,
            "data": {
                "fullName": request.full_name,
                "preferredName": request.preferred_name,
                "whatsappNo": request.whatsapp_no,
                "school": request.school,
                "alYear": request.al_year,
                "plan": request.plan,
                "subjectStream": request.subject_stream,
                "medium": request.medium,
                "role": "student"
            }
        });

        let res = self
            .client
            .post(self.endpoint("auth/v1/signup")?)
            .header("apikey", &self.anon_key)
            .json(&payload)
            .timeout(Duration::from_secs(15))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    Error::BadRequest(provider_message(&text))
                }
                StatusCode::CONFLICT => Error::Conflict(provider_message(&text)),
                _ => anyhow::anyhow!("Identity provider error {}: {}", status, provider_message(&text)).into(),
            });
        }

        let body: SignUpBody = res.json().await?;
        let user_id = body
            .user
            .map(|u| u.id)
            .or(body.id)
            .ok_or_else(|| anyhow::anyhow!("Identity provider returned no user id"))?;
        let tokens = body.access_token.map(|access_token| AuthTokens {
            access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in,
            token_type: "bearer".to_string(),
        });

        Ok(SignUp { user_id, tokens })
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let res = self
            .client
            .post(self.endpoint("auth/v1/logout")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .timeout(Duration::from_secs(15))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Sign-out failed {}: {}", status, provider_message(&text)).into());
        }
        Ok(())
    }
}

/// GoTrue reports errors under several keys depending on the endpoint.
fn provider_message(body: &str) -> String {
    let parsed: Option<JsonValue> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
