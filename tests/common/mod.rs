#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use lumina_backend::{
    dto::auth_dto::{AuthTokens, RegisterRequest},
    error::{Error, Result},
    middleware::auth::{Claims, TOKEN_AUDIENCE},
    models::exam::{ExplanationRequest, QuestionRequest, UsageDelta},
    models::profile::{
        Medium, NewProfile, PlanType, Profile, Role, SubjectStream, UsageCounters,
    },
    models::question::Question,
    routes::{build_router, RateLimits},
    services::{
        ai_service::{ExplanationSource, QuestionSource},
        identity_service::{IdentityProvider, SignUp},
        profile_service::ProfileStore,
    },
    AppState,
};
use serde_json::Value as JsonValue;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key";

#[derive(Default)]
pub struct MemoryProfiles {
    pub rows: Mutex<HashMap<Uuid, Profile>>,
}

impl MemoryProfiles {
    pub fn insert(&self, profile: Profile) {
        self.rows.lock().unwrap().insert(profile.id, profile);
    }

    pub fn get(&self, id: Uuid) -> Option<Profile> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    fn update(&self, id: Uuid, f: impl FnOnce(&mut Profile)) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let profile = rows
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Profile not found".into()))?;
        f(profile);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfiles {
    async fn fetch(&self, id: Uuid) -> Result<Profile> {
        self.get(id)
            .ok_or_else(|| Error::NotFound("Profile not found".into()))
    }

    async fn list(&self) -> Result<Vec<Profile>> {
        let mut all: Vec<Profile> = self.rows.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(all)
    }

    async fn create(&self, p: NewProfile) -> Result<()> {
        self.rows.lock().unwrap().entry(p.id).or_insert(Profile {
            id: p.id,
            full_name: p.full_name,
            preferred_name: p.preferred_name,
            whatsapp_no: p.whatsapp_no,
            school: p.school,
            al_year: p.al_year,
            plan: p.plan,
            subject_stream: p.subject_stream,
            email: p.email,
            role: Role::Student,
            medium: p.medium,
            usage: UsageCounters {
                questions_answered_this_month: 0,
                papers_answered_this_month: 0,
                last_reset_date: Utc::now(),
            },
        });
        Ok(())
    }

    async fn reset_month(
        &self,
        id: Uuid,
        previous: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut applied = false;
        self.update(id, |p| {
            if p.usage.last_reset_date == previous {
                p.usage = UsageCounters {
                    questions_answered_this_month: 0,
                    papers_answered_this_month: 0,
                    last_reset_date: now,
                };
                applied = true;
            }
        })?;
        Ok(applied)
    }

    async fn record_usage(&self, id: Uuid, usage: UsageDelta) -> Result<()> {
        self.update(id, |p| {
            p.usage.questions_answered_this_month += usage.questions;
            p.usage.papers_answered_this_month += usage.papers;
        })
    }

    async fn set_medium(&self, id: Uuid, medium: Medium) -> Result<()> {
        self.update(id, |p| p.medium = medium)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<()> {
        self.update(id, |p| p.role = role)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound("Profile not found".into()))
    }
}

/// Serves canned question sets in order, then full sets of valid questions.
#[derive(Default)]
pub struct ScriptedQuestions {
    pub calls: AtomicUsize,
    pub script: Mutex<Vec<Result<Vec<Question>>>>,
}

impl ScriptedQuestions {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionSource for ScriptedQuestions {
    async fn generate(&self, request: &QuestionRequest) -> Result<Vec<Question>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            Ok(question_set(request.count))
        } else {
            script.remove(0)
        }
    }
}

pub struct StubTutor;

#[async_trait]
impl ExplanationSource for StubTutor {
    async fn simplify(&self, request: &ExplanationRequest) -> Result<String> {
        Ok(format!("Like a water tank ({})", request.medium))
    }
}

#[derive(Default)]
pub struct StubIdentity {
    pub sign_outs: AtomicUsize,
    pub fail_sign_out: bool,
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens> {
        if password != "correct horse" {
            return Err(Error::Unauthorized("Invalid login credentials".into()));
        }
        Ok(AuthTokens {
            access_token: format!("token-for-{}", email),
            refresh_token: Some("refresh".into()),
            expires_in: Some(3600),
            token_type: "bearer".into(),
        })
    }

    async fn sign_up(&self, _request: &RegisterRequest) -> Result<SignUp> {
        Ok(SignUp {
            user_id: Uuid::new_v4(),
            tokens: None,
        })
    }

    async fn sign_out(&self, _access_token: &str) -> Result<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out {
            return Err(Error::Anyhow(anyhow::anyhow!("provider unreachable")));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub profiles: Arc<MemoryProfiles>,
    pub questions: Arc<ScriptedQuestions>,
    pub identity: Arc<StubIdentity>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_identity(StubIdentity::default())
    }

    pub fn with_identity(identity: StubIdentity) -> Self {
        let profiles = Arc::new(MemoryProfiles::default());
        let questions = Arc::new(ScriptedQuestions::default());
        let identity = Arc::new(identity);
        let state = AppState::from_parts(
            profiles.clone(),
            identity.clone(),
            questions.clone(),
            Arc::new(StubTutor),
            JWT_SECRET,
            Duration::from_secs(5),
        );
        let router = build_router(
            state,
            RateLimits {
                public_rps: 100,
                generation_rps: 100,
            },
        );
        Self {
            router,
            profiles,
            questions,
            identity,
        }
    }

    pub fn add_user(&self, plan: PlanType, questions_used: u32) -> Uuid {
        let profile = profile(plan, questions_used);
        let id = profile.id;
        self.profiles.insert(profile);
        id
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        user: Option<Uuid>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(id) = user {
            req = req.header("authorization", format!("Bearer {}", bearer(id)));
        }
        let req = match body {
            Some(json) => req
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
        (status, json)
    }
}

pub fn bearer(id: Uuid) -> String {
    let claims = Claims {
        sub: id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        email: Some(format!("{}@example.com", id)),
        role: Some("authenticated".into()),
        aud: Some(TOKEN_AUDIENCE.into()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn profile(plan: PlanType, questions_used: u32) -> Profile {
    let id = Uuid::new_v4();
    Profile {
        id,
        full_name: "Sanduni Wickramasinghe".into(),
        preferred_name: "Sanduni".into(),
        whatsapp_no: Some("+94771234567".into()),
        school: Some("Visakha Vidyalaya".into()),
        al_year: Some("2026".into()),
        plan,
        subject_stream: SubjectStream::PhysicalScience,
        email: format!("{}@example.com", id),
        role: Role::Student,
        medium: Medium::English,
        usage: UsageCounters {
            questions_answered_this_month: questions_used,
            papers_answered_this_month: 0,
            last_reset_date: Utc::now(),
        },
    }
}

/// Question `i` has its correct answer at option `i % 5`.
pub fn question_set(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| Question {
            question: format!("Which statement about item {} is true?", i + 1),
            options: (0..5).map(|o| format!("Statement {}", o)).collect(),
            correct_answer: i % 5,
            explanation: format!("Statement {} follows from the definition.", i % 5),
        })
        .collect()
}
