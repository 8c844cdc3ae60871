use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::{Medium, PlanType, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Quick,
    Topic,
    Past,
    Model,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Quick => "quick",
            ExamType::Topic => "topic",
            ExamType::Past => "past",
            ExamType::Model => "model",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExamType::Quick => "Quick Revision",
            ExamType::Topic => "Unit Focus",
            ExamType::Past => "Past Paper",
            ExamType::Model => "Model Exam",
        }
    }

    /// Question count before any plan clamping.
    pub fn default_question_count(&self) -> usize {
        match self {
            ExamType::Quick | ExamType::Topic => 5,
            ExamType::Past | ExamType::Model => 10,
        }
    }

    pub fn requires_paid_plan(&self) -> bool {
        !matches!(self, ExamType::Quick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamPhase {
    Loading,
    Testing,
    Summary,
    Review,
    Error,
}

impl ExamPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamPhase::Loading => "loading",
            ExamPhase::Testing => "testing",
            ExamPhase::Summary => "summary",
            ExamPhase::Review => "review",
            ExamPhase::Error => "error",
        }
    }
}

impl fmt::Display for ExamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    QuotaExceeded,
    PlanRequired,
    GenerationFailed,
    NetworkFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::QuotaExceeded => "quota-exceeded",
            FailureKind::PlanRequired => "plan-required",
            FailureKind::GenerationFailed => "generation-failed",
            FailureKind::NetworkFailure => "network-failure",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::GenerationFailed | FailureKind::NetworkFailure
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFailure {
    pub kind: FailureKind,
    pub message: String,
    pub retryable: bool,
}

impl SessionFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }
}

/// What the learner asked for when opening a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSetup {
    pub subject: String,
    pub topic: Option<String>,
    pub exam_type: ExamType,
    pub timed: bool,
}

/// Fixed configuration of a session once its question count is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    pub subject: String,
    pub topic: Option<String>,
    pub exam_type: ExamType,
    pub timed: bool,
    pub question_count: usize,
}

/// Profile values a session needs, captured once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnerSnapshot {
    pub medium: Medium,
    pub plan: PlanType,
    pub questions_answered_this_month: u32,
    pub papers_answered_this_month: u32,
}

impl From<&Profile> for LearnerSnapshot {
    fn from(profile: &Profile) -> Self {
        Self {
            medium: profile.medium,
            plan: profile.plan,
            questions_answered_this_month: profile.usage.questions_answered_this_month,
            papers_answered_this_month: profile.usage.papers_answered_this_month,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRequest {
    pub subject: String,
    pub medium: Medium,
    pub count: usize,
    pub topic: String,
    pub exam_type: ExamType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationRequest {
    pub subject: String,
    pub question: String,
    pub explanation: String,
    pub medium: Medium,
}

/// Increment applied to the monthly counters after a session is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageDelta {
    pub questions: u32,
    pub papers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
