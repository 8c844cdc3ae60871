use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::profile::{Medium, PlanType, SubjectStream};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(length(min = 1, max = 100))]
    pub preferred_name: String,
    #[validate(email)]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(max = 20))]
    pub whatsapp_no: Option<String>,
    #[validate(length(max = 200))]
    pub school: Option<String>,
    #[validate(length(max = 10))]
    pub al_year: Option<String>,
    #[serde(default = "default_plan")]
    pub plan: PlanType,
    pub subject_stream: SubjectStream,
    pub medium: Medium,
}

fn default_plan() -> PlanType {
    PlanType::Free
}

/// Session tokens issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: uuid::Uuid,
    pub email: String,
    /// `None` while the provider still requires email confirmation.
    pub session: Option<AuthTokens>,
}
