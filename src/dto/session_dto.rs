use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::exam::{ExamPhase, ExamType, SessionFailure, SessionId, SessionSetup};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 120))]
    pub subject: String,
    #[validate(length(max = 200))]
    pub topic: Option<String>,
    pub exam_type: ExamType,
    #[serde(default)]
    pub timed: bool,
}

impl From<CreateSessionRequest> for SessionSetup {
    fn from(req: CreateSessionRequest) -> Self {
        let topic = req
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self {
            subject: req.subject.trim().to_string(),
            topic,
            exam_type: req.exam_type,
            timed: req.timed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectAnswerRequest {
    pub index: usize,
    pub choice: usize,
}

/// The question currently on screen. The correct option is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPrompt {
    pub index: usize,
    pub question: String,
    pub options: Vec<String>,
    pub selected: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryView {
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: SessionId,
    pub subject: String,
    pub topic: Option<String>,
    pub exam_type: ExamType,
    pub exam_label: String,
    pub timed: bool,
    pub phase: ExamPhase,
    pub question_count: usize,
    pub current_index: usize,
    pub current_question: Option<QuestionPrompt>,
    pub answered: usize,
    pub time_left_seconds: Option<u32>,
    pub timed_out: bool,
    pub summary: Option<SummaryView>,
    pub failure: Option<SessionFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub index: usize,
    pub question: String,
    pub options: Vec<String>,
    pub selected: Option<usize>,
    pub correct_answer: usize,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub session_id: SessionId,
    pub subject: String,
    pub summary: Option<SummaryView>,
    pub items: Vec<ReviewItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplifyResponse {
    pub index: usize,
    pub explanation: String,
    pub simplified: bool,
}
