//! Plan limits and the lazy monthly reset of usage counters.

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::dto::dashboard_dto::UsageSummary;
use crate::error::Result;
use crate::models::exam::{ExamType, FailureKind, LearnerSnapshot, SessionFailure, UsageDelta};
use crate::models::profile::{PlanType, Profile, UsageCounters};
use crate::services::profile_service::ProfileStore;

pub const FREE_MONTHLY_QUESTIONS: u32 = 20;
pub const PRO_MONTHLY_PAPERS: u32 = 10;
/// An attempt with at least this many questions counts as a paper.
pub const PAPER_MIN_QUESTIONS: usize = 10;

pub fn needs_monthly_reset(last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    last_reset.month() != now.month() || last_reset.year() != now.year()
}

/// Counters after applying a rollover at `now`, or `None` when still in the same month.
pub fn monthly_reset(usage: &UsageCounters, now: DateTime<Utc>) -> Option<UsageCounters> {
    if !needs_monthly_reset(usage.last_reset_date, now) {
        return None;
    }
    Some(UsageCounters {
        questions_answered_this_month: 0,
        papers_answered_this_month: 0,
        last_reset_date: now,
    })
}

pub fn limit_reached(plan: PlanType, questions_answered: u32, papers_answered: u32) -> bool {
    match plan {
        PlanType::Free => questions_answered >= FREE_MONTHLY_QUESTIONS,
        PlanType::Pro => papers_answered >= PRO_MONTHLY_PAPERS,
        PlanType::Plus => false,
    }
}

/// Gate applied before any question is requested. Limits are checked before
/// the plan requirement of the exam type.
pub fn check_start(
    learner: &LearnerSnapshot,
    exam_type: ExamType,
) -> std::result::Result<(), SessionFailure> {
    if limit_reached(
        learner.plan,
        learner.questions_answered_this_month,
        learner.papers_answered_this_month,
    ) {
        let message = match learner.plan {
            PlanType::Pro => "Monthly paper limit reached. Upgrade to Plus for unlimited access.",
            _ => "Monthly question limit reached. Upgrade to Plus for unlimited access.",
        };
        return Err(SessionFailure::new(FailureKind::QuotaExceeded, message));
    }

    if exam_type.requires_paid_plan() && !learner.plan.is_paid() {
        return Err(SessionFailure::new(
            FailureKind::PlanRequired,
            format!(
                "{} practice is exclusive to Pro & Plus members.",
                exam_type.label()
            ),
        ));
    }

    Ok(())
}

/// Number of questions to request, clamped by the free-tier allowance.
pub fn question_allowance(learner: &LearnerSnapshot, exam_type: ExamType) -> usize {
    let count = exam_type.default_question_count();
    match learner.plan {
        PlanType::Free => {
            let remaining =
                FREE_MONTHLY_QUESTIONS.saturating_sub(learner.questions_answered_this_month);
            count.min(remaining as usize)
        }
        PlanType::Pro | PlanType::Plus => count,
    }
}

pub fn usage_delta(question_count: usize) -> UsageDelta {
    UsageDelta {
        questions: question_count as u32,
        papers: u32::from(question_count >= PAPER_MIN_QUESTIONS),
    }
}

pub fn usage_summary(plan: PlanType, usage: &UsageCounters) -> UsageSummary {
    let questions = usage.questions_answered_this_month;
    let papers = usage.papers_answered_this_month;
    let (text, progress_percent) = match plan {
        PlanType::Free => (
            format!("{} / {} questions used", questions, FREE_MONTHLY_QUESTIONS),
            percent_of(questions, FREE_MONTHLY_QUESTIONS),
        ),
        PlanType::Pro => (
            format!("{} / {} papers used", papers, PRO_MONTHLY_PAPERS),
            percent_of(papers, PRO_MONTHLY_PAPERS),
        ),
        PlanType::Plus => ("Unlimited Plus Access".to_string(), 100),
    };

    UsageSummary {
        plan,
        questions_answered_this_month: questions,
        papers_answered_this_month: papers,
        last_reset_date: usage.last_reset_date,
        text,
        progress_percent,
        limit_reached: limit_reached(plan, questions, papers),
        is_pro_plus: plan.is_paid(),
    }
}

fn percent_of(used: u32, limit: u32) -> u32 {
    ((used as f64 / limit as f64) * 100.0).min(100.0).round() as u32
}

/// Loads a profile and applies the monthly rollover before anything reads its counters.
///
/// The reset is written as a compare-and-set on the previous reset date. A failed
/// write is logged and the locally reset counters are still returned.
pub async fn load_profile_for_month(
    store: &dyn ProfileStore,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<Profile> {
    let mut profile = store.fetch(id).await?;

    if let Some(reset) = monthly_reset(&profile.usage, now) {
        let previous = profile.usage.last_reset_date;
        profile.usage = reset;
        match store.reset_month(id, previous, now).await {
            Ok(true) => tracing::info!(profile_id = %id, "Monthly usage counters reset"),
            Ok(false) => {
                tracing::debug!(profile_id = %id, "Monthly reset already applied elsewhere")
            }
            Err(e) => {
                tracing::warn!(profile_id = %id, error = ?e, "usage-update-failed: monthly reset not persisted")
            }
        }
    }

    Ok(profile)
}
