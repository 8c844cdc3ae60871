//! Lifecycle of a single practice or exam attempt.
//!
//! `ExamSession` is a plain state machine: it performs no I/O and never sleeps.
//! The runtime in `session_service` feeds it question sets, user commands and
//! timer ticks one at a time and carries out the effects it returns.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::dto::session_dto::{QuestionPrompt, ReviewItem, SessionView, SummaryView};
use crate::models::exam::{
    ExamPhase, ExplanationRequest, FailureKind, LearnerSnapshot, QuestionRequest, SessionConfig,
    SessionFailure, SessionId, SessionSetup, UsageDelta,
};
use crate::models::question::Question;
use crate::services::quota_service;

/// Countdown budget per question in timed mode.
pub const SECONDS_PER_QUESTION: u32 = 72;
pub const GENERAL_TOPIC: &str = "general";

const QUOTA_EXCEEDED_MESSAGE: &str =
    "Monthly question limit reached. Upgrade to Plus for unlimited access.";
const GENERATION_FAILED_MESSAGE: &str = "Lumina failed to generate valid curriculum questions. \
     Please try a different topic or verify your connection.";
const NETWORK_FAILURE_MESSAGE: &str =
    "A secure connection error occurred. Please verify your internet and try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session is {actual}, expected {expected}")]
    WrongPhase {
        expected: ExamPhase,
        actual: ExamPhase,
    },
    #[error("question {0} does not exist in this session")]
    QuestionOutOfRange(usize),
    #[error("option {0} is not a valid choice")]
    OptionOutOfRange(usize),
    #[error("a {0} session cannot be retried")]
    NotRetryable(FailureKind),
}

#[derive(Debug, Clone)]
pub struct ExamSession {
    id: SessionId,
    owner: Uuid,
    config: SessionConfig,
    learner: LearnerSnapshot,
    phase: ExamPhase,
    questions: Vec<Question>,
    answers: BTreeMap<usize, usize>,
    current: usize,
    time_left: Option<u32>,
    timed_out: bool,
    score: Option<usize>,
    failure: Option<SessionFailure>,
    attempts: u32,
}

impl ExamSession {
    /// Builds a session and decides whether questions may be requested.
    ///
    /// Returns the request to issue, or `None` when the plan denies the attempt;
    /// in that case the session is already in `error`.
    pub fn open(
        id: SessionId,
        owner: Uuid,
        setup: SessionSetup,
        learner: LearnerSnapshot,
    ) -> (Self, Option<QuestionRequest>) {
        let question_count = quota_service::question_allowance(&learner, setup.exam_type);
        let denial = match quota_service::check_start(&learner, setup.exam_type) {
            Err(failure) => Some(failure),
            Ok(()) if question_count == 0 => Some(SessionFailure::new(
                FailureKind::QuotaExceeded,
                QUOTA_EXCEEDED_MESSAGE,
            )),
            Ok(()) => None,
        };

        let mut session = Self {
            id,
            owner,
            config: SessionConfig {
                subject: setup.subject,
                topic: setup.topic,
                exam_type: setup.exam_type,
                timed: setup.timed,
                question_count,
            },
            learner,
            phase: ExamPhase::Loading,
            questions: Vec::new(),
            answers: BTreeMap::new(),
            current: 0,
            time_left: None,
            timed_out: false,
            score: None,
            failure: None,
            attempts: 0,
        };

        if let Some(failure) = denial {
            session.fail(failure);
            return (session, None);
        }

        session.attempts = 1;
        let request = session.request();
        (session, Some(request))
    }

    /// The acquisition request. Identical for every attempt of this session.
    pub fn request(&self) -> QuestionRequest {
        QuestionRequest {
            subject: self.config.subject.clone(),
            medium: self.learner.medium,
            count: self.config.question_count,
            topic: self
                .config
                .topic
                .clone()
                .unwrap_or_else(|| GENERAL_TOPIC.to_string()),
            exam_type: self.config.exam_type,
        }
    }

    pub fn apply_questions(
        &mut self,
        outcome: crate::error::Result<Vec<Question>>,
    ) -> Result<(), SessionError> {
        self.expect_phase(ExamPhase::Loading)?;

        match outcome {
            Ok(mut questions) => {
                questions.retain(Question::is_well_formed);
                questions.truncate(self.config.question_count);
                if questions.is_empty() {
                    self.fail(SessionFailure::new(
                        FailureKind::GenerationFailed,
                        GENERATION_FAILED_MESSAGE,
                    ));
                    return Ok(());
                }
                if self.config.timed {
                    self.time_left = Some(SECONDS_PER_QUESTION * questions.len() as u32);
                }
                self.questions = questions;
                self.phase = ExamPhase::Testing;
            }
            Err(e) => {
                let message = e.to_string();
                let message = if message.trim().is_empty() {
                    NETWORK_FAILURE_MESSAGE.to_string()
                } else {
                    message
                };
                self.fail(SessionFailure::new(FailureKind::NetworkFailure, message));
            }
        }
        Ok(())
    }

    /// Starts a fresh acquisition after a retryable failure.
    pub fn retry(&mut self) -> Result<QuestionRequest, SessionError> {
        self.expect_phase(ExamPhase::Error)?;
        if let Some(failure) = self.failure.as_ref().filter(|f| !f.retryable) {
            return Err(SessionError::NotRetryable(failure.kind));
        }

        self.questions.clear();
        self.answers.clear();
        self.current = 0;
        self.time_left = None;
        self.timed_out = false;
        self.score = None;
        self.failure = None;
        self.phase = ExamPhase::Loading;
        self.attempts += 1;
        Ok(self.request())
    }

    pub fn select_answer(&mut self, index: usize, choice: usize) -> Result<(), SessionError> {
        self.expect_phase(ExamPhase::Testing)?;
        let question = self
            .questions
            .get(index)
            .ok_or(SessionError::QuestionOutOfRange(index))?;
        if choice >= question.options.len() {
            return Err(SessionError::OptionOutOfRange(choice));
        }
        self.answers.insert(index, choice);
        Ok(())
    }

    /// Moves to the next question, or completes the session from the last one.
    pub fn advance(&mut self) -> Result<Option<UsageDelta>, SessionError> {
        self.expect_phase(ExamPhase::Testing)?;
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            Ok(None)
        } else {
            Ok(self.complete())
        }
    }

    pub fn back(&mut self) -> Result<(), SessionError> {
        self.expect_phase(ExamPhase::Testing)?;
        self.current = self.current.saturating_sub(1);
        Ok(())
    }

    /// One second of countdown. Expiry completes the session.
    pub fn tick(&mut self) -> Option<UsageDelta> {
        if !self.timer_running() {
            return None;
        }
        let left = self.time_left.unwrap_or(0).saturating_sub(1);
        self.time_left = Some(left);
        if left == 0 {
            self.timed_out = true;
            return self.complete();
        }
        None
    }

    /// Scores the session and moves it to `summary`.
    ///
    /// Only the first call out of `testing` scores; later calls return `None`,
    /// so the usage delta is handed out at most once per session.
    pub fn complete(&mut self) -> Option<UsageDelta> {
        if self.phase != ExamPhase::Testing {
            return None;
        }
        let score = self
            .questions
            .iter()
            .enumerate()
            .filter(|(i, q)| q.is_correct(self.answers.get(i).copied()))
            .count();
        self.score = Some(score);
        self.phase = ExamPhase::Summary;
        Some(quota_service::usage_delta(self.questions.len()))
    }

    pub fn open_review(&mut self) -> Result<(), SessionError> {
        match self.phase {
            ExamPhase::Summary => {
                self.phase = ExamPhase::Review;
                Ok(())
            }
            ExamPhase::Review => Ok(()),
            actual => Err(SessionError::WrongPhase {
                expected: ExamPhase::Summary,
                actual,
            }),
        }
    }

    pub fn review_items(&self) -> Result<Vec<ReviewItem>, SessionError> {
        self.expect_phase(ExamPhase::Review)?;
        Ok(self
            .questions
            .iter()
            .enumerate()
            .map(|(index, q)| {
                let selected = self.answers.get(&index).copied();
                ReviewItem {
                    index,
                    question: q.question.clone(),
                    options: q.options.clone(),
                    selected,
                    correct_answer: q.correct_answer,
                    is_correct: q.is_correct(selected),
                    explanation: q.explanation.clone(),
                }
            })
            .collect())
    }

    pub fn explanation_request(&self, index: usize) -> Result<ExplanationRequest, SessionError> {
        self.expect_phase(ExamPhase::Review)?;
        let question = self
            .questions
            .get(index)
            .ok_or(SessionError::QuestionOutOfRange(index))?;
        Ok(ExplanationRequest {
            subject: self.config.subject.clone(),
            question: question.question.clone(),
            explanation: question.explanation.clone(),
            medium: self.learner.medium,
        })
    }

    pub fn timer_running(&self) -> bool {
        self.phase == ExamPhase::Testing
            && self.config.timed
            && self.time_left.is_some_and(|left| left > 0)
    }

    pub fn summary(&self) -> Option<SummaryView> {
        let score = self.score?;
        let total = self.questions.len();
        Some(SummaryView {
            score,
            total,
            percentage: percentage(score, total),
            timed_out: self.timed_out,
        })
    }

    pub fn view(&self) -> SessionView {
        let current_question = (self.phase == ExamPhase::Testing)
            .then(|| self.questions.get(self.current))
            .flatten()
            .map(|q| QuestionPrompt {
                index: self.current,
                question: q.question.clone(),
                options: q.options.clone(),
                selected: self.answers.get(&self.current).copied(),
            });

        SessionView {
            id: self.id,
            subject: self.config.subject.clone(),
            topic: self.config.topic.clone(),
            exam_type: self.config.exam_type,
            exam_label: self.config.exam_type.label().to_string(),
            timed: self.config.timed,
            phase: self.phase,
            question_count: if self.questions.is_empty() {
                self.config.question_count
            } else {
                self.questions.len()
            },
            current_index: self.current,
            current_question,
            answered: self.answers.len(),
            time_left_seconds: self.time_left,
            timed_out: self.timed_out,
            summary: self.summary(),
            failure: self.failure.clone(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn phase(&self) -> ExamPhase {
        self.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answer(&self, index: usize) -> Option<usize> {
        self.answers.get(&index).copied()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn time_left(&self) -> Option<u32> {
        self.time_left
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn score(&self) -> Option<usize> {
        self.score
    }

    pub fn failure(&self) -> Option<&SessionFailure> {
        self.failure.as_ref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn fail(&mut self, failure: SessionFailure) {
        self.phase = ExamPhase::Error;
        self.time_left = None;
        self.failure = Some(failure);
    }

    fn expect_phase(&self, expected: ExamPhase) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }
}

pub fn percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((score as f64 / total as f64) * 100.0).round() as u32
}
