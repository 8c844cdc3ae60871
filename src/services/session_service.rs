//! Registry and runtime for live exam sessions.
//!
//! Every session runs in its own task. The task owns the `ExamSession` and is
//! the only place it is mutated: user commands, the question request and the
//! countdown ticks are processed one at a time from a single `select!` loop.
//! Callers read the latest state through a `watch` channel and send commands
//! over `mpsc`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use uuid::Uuid;

use crate::dto::session_dto::{ReviewResponse, SessionView, SimplifyResponse};
use crate::error::{Error, Result};
use crate::models::exam::{
    ExamPhase, ExplanationRequest, LearnerSnapshot, QuestionRequest, SessionId, SessionSetup,
    UsageDelta,
};
use crate::models::question::Question;
use crate::services::ai_service::{ExplanationSource, QuestionSource};
use crate::services::exam_session::{ExamSession, SessionError};
use crate::services::profile_service::ProfileStore;
use crate::services::quota_service;

pub const SIMPLIFY_FALLBACK: &str = "Unable to generate simplified view.";

const COMMAND_BUFFER: usize = 32;
const TICK: Duration = Duration::from_secs(1);

type Acquisition = Pin<Box<dyn Future<Output = Result<Vec<Question>>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SelectAnswer { index: usize, choice: usize },
    Advance,
    Back,
    OpenReview,
    Retry,
}

enum Command {
    Apply {
        action: Action,
        reply: oneshot::Sender<std::result::Result<SessionView, SessionError>>,
    },
    Review {
        reply: oneshot::Sender<std::result::Result<ReviewResponse, SessionError>>,
    },
    Explain {
        index: usize,
        reply: oneshot::Sender<std::result::Result<ExplanationRequest, SessionError>>,
    },
    Dispose,
}

#[derive(Clone)]
struct SessionHandle {
    owner: Uuid,
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
    touched: Arc<Mutex<Instant>>,
}

impl SessionHandle {
    fn touch(&self) {
        *self.touched.lock().unwrap_or_else(|p| p.into_inner()) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.touched
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .elapsed()
    }

    fn dispose(&self) {
        // A full buffer means the actor is busy; dropping the last sender stops it anyway.
        let _ = self.commands.try_send(Command::Dispose);
    }
}

#[derive(Clone)]
pub struct SessionService {
    questions: Arc<dyn QuestionSource>,
    tutor: Arc<dyn ExplanationSource>,
    profiles: Arc<dyn ProfileStore>,
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
    settle_timeout: Duration,
}

impl SessionService {
    pub fn new(
        questions: Arc<dyn QuestionSource>,
        tutor: Arc<dyn ExplanationSource>,
        profiles: Arc<dyn ProfileStore>,
        settle_timeout: Duration,
    ) -> Self {
        Self {
            questions,
            tutor,
            profiles,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            settle_timeout,
        }
    }

    /// Opens a session for `owner` and waits for question acquisition to settle.
    ///
    /// Policy denials and acquisition failures are reported on the returned view,
    /// not as errors.
    pub async fn create(&self, owner: Uuid, setup: SessionSetup) -> Result<SessionView> {
        let profile =
            quota_service::load_profile_for_month(self.profiles.as_ref(), owner, Utc::now())
                .await?;
        let learner = LearnerSnapshot::from(&profile);

        let id = SessionId::new();
        let (session, request) = ExamSession::open(id, owner, setup, learner);
        if let Some(failure) = session.failure() {
            tracing::info!(session_id = %id, user_id = %owner, kind = %failure.kind, "Session denied");
        }

        let (view_tx, view_rx) = watch::channel(session.view());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let actor = SessionActor {
            session,
            questions: Arc::clone(&self.questions),
            profiles: Arc::clone(&self.profiles),
            view: view_tx,
            commands: cmd_rx,
        };
        tokio::spawn(actor.run(request));

        self.sessions.write().await.insert(
            id,
            SessionHandle {
                owner,
                commands: cmd_tx,
                view: view_rx.clone(),
                touched: Arc::new(Mutex::new(Instant::now())),
            },
        );
        tracing::info!(session_id = %id, user_id = %owner, "Session created");

        Ok(self.settled(view_rx).await)
    }

    pub async fn view(&self, owner: Uuid, id: SessionId) -> Result<SessionView> {
        let handle = self.handle(owner, id).await?;
        let view = handle.view.borrow().clone();
        Ok(view)
    }

    pub async fn apply(&self, owner: Uuid, id: SessionId, action: Action) -> Result<SessionView> {
        let handle = self.handle(owner, id).await?;
        let (reply, rx) = oneshot::channel();
        handle
            .commands
            .send(Command::Apply { action, reply })
            .await
            .map_err(|_| session_gone(id))?;
        let view = rx.await.map_err(|_| session_gone(id))??;
        Ok(view)
    }

    /// Re-issues the question request after a retryable failure and waits for it to settle.
    pub async fn retry(&self, owner: Uuid, id: SessionId) -> Result<SessionView> {
        self.apply(owner, id, Action::Retry).await?;
        let handle = self.handle(owner, id).await?;
        Ok(self.settled(handle.view).await)
    }

    pub async fn review(&self, owner: Uuid, id: SessionId) -> Result<ReviewResponse> {
        let handle = self.handle(owner, id).await?;
        let (reply, rx) = oneshot::channel();
        handle
            .commands
            .send(Command::Review { reply })
            .await
            .map_err(|_| session_gone(id))?;
        let review = rx.await.map_err(|_| session_gone(id))??;
        Ok(review)
    }

    /// Asks the tutor for a plainer explanation of one reviewed question.
    ///
    /// Collaborator failures produce the fallback text; session state never changes.
    pub async fn simplify(
        &self,
        owner: Uuid,
        id: SessionId,
        index: usize,
    ) -> Result<SimplifyResponse> {
        let handle = self.handle(owner, id).await?;
        let (reply, rx) = oneshot::channel();
        handle
            .commands
            .send(Command::Explain { index, reply })
            .await
            .map_err(|_| session_gone(id))?;
        let request = rx.await.map_err(|_| session_gone(id))??;

        match self.tutor.simplify(&request).await {
            Ok(explanation) => Ok(SimplifyResponse {
                index,
                explanation,
                simplified: true,
            }),
            Err(e) => {
                tracing::warn!(session_id = %id, index, error = %e, "explanation-failed");
                Ok(SimplifyResponse {
                    index,
                    explanation: SIMPLIFY_FALLBACK.to_string(),
                    simplified: false,
                })
            }
        }
    }

    pub async fn dispose(&self, owner: Uuid, id: SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&id) {
            Some(handle) if handle.owner == owner => {
                if let Some(handle) = sessions.remove(&id) {
                    handle.dispose();
                }
                tracing::info!(session_id = %id, user_id = %owner, "Session disposed");
                Ok(())
            }
            _ => Err(Error::NotFound("Session not found".to_string())),
        }
    }

    /// Disposes every session of `owner`. Returns how many were stopped.
    pub async fn dispose_owned_by(&self, owner: Uuid) -> usize {
        let mut sessions = self.sessions.write().await;
        let ids: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, h)| h.owner == owner)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(handle) = sessions.remove(id) {
                handle.dispose();
            }
        }
        ids.len()
    }

    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, handle| {
            if handle.idle_for() < max_idle {
                return true;
            }
            tracing::info!(session_id = %id, user_id = %handle.owner, "Disposing idle session");
            handle.dispose();
            false
        });
        before - sessions.len()
    }

    pub fn spawn_idle_sweeper(&self, max_idle: Duration, every: Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let swept = service.sweep_idle(max_idle).await;
                if swept > 0 {
                    tracing::info!(swept, "Idle sessions swept");
                }
            }
        })
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn handle(&self, owner: Uuid, id: SessionId) -> Result<SessionHandle> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(&id)
            .filter(|h| h.owner == owner)
            .cloned()
            .ok_or_else(|| Error::NotFound("Session not found".to_string()))?;
        handle.touch();
        Ok(handle)
    }

    async fn settled(&self, mut view: watch::Receiver<SessionView>) -> SessionView {
        let settled = match tokio::time::timeout(
            self.settle_timeout,
            view.wait_for(|v| v.phase != ExamPhase::Loading),
        )
        .await
        {
            Ok(Ok(v)) => Some(v.clone()),
            _ => None,
        };
        settled.unwrap_or_else(|| view.borrow().clone())
    }
}

fn session_gone(id: SessionId) -> Error {
    tracing::warn!(session_id = %id, "Session actor is no longer running");
    Error::NotFound("Session not found".to_string())
}

struct SessionActor {
    session: ExamSession,
    questions: Arc<dyn QuestionSource>,
    profiles: Arc<dyn ProfileStore>,
    view: watch::Sender<SessionView>,
    commands: mpsc::Receiver<Command>,
}

impl SessionActor {
    async fn run(mut self, request: Option<QuestionRequest>) {
        let mut inflight = request.map(|r| self.acquire(r));
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Apply { action, reply }) => {
                        let result = self.apply(action, &mut inflight);
                        self.publish();
                        let _ = reply.send(result.map(|_| self.session.view()));
                    }
                    Some(Command::Review { reply }) => {
                        let _ = reply.send(self.review());
                    }
                    Some(Command::Explain { index, reply }) => {
                        let _ = reply.send(self.session.explanation_request(index));
                    }
                    Some(Command::Dispose) | None => break,
                },
                outcome = settle(&mut inflight) => {
                    inflight = None;
                    self.on_questions(outcome, &mut ticker);
                }
                _ = ticker.tick(), if self.session.timer_running() => {
                    if let Some(delta) = self.session.tick() {
                        tracing::info!(session_id = %self.session.id(), "Session timed out");
                        self.report_usage(delta);
                    }
                    self.publish();
                }
            }
        }

        tracing::debug!(session_id = %self.session.id(), phase = %self.session.phase(), "Session stopped");
    }

    fn apply(
        &mut self,
        action: Action,
        inflight: &mut Option<Acquisition>,
    ) -> std::result::Result<(), SessionError> {
        match action {
            Action::SelectAnswer { index, choice } => self.session.select_answer(index, choice),
            Action::Advance => {
                if let Some(delta) = self.session.advance()? {
                    self.report_usage(delta);
                }
                Ok(())
            }
            Action::Back => self.session.back(),
            Action::OpenReview => self.session.open_review(),
            Action::Retry => {
                let request = self.session.retry()?;
                tracing::info!(
                    session_id = %self.session.id(),
                    attempt = self.session.attempts(),
                    "Retrying question request"
                );
                *inflight = Some(self.acquire(request));
                Ok(())
            }
        }
    }

    fn review(&self) -> std::result::Result<ReviewResponse, SessionError> {
        let items = self.session.review_items()?;
        Ok(ReviewResponse {
            session_id: self.session.id(),
            subject: self.session.config().subject.clone(),
            summary: self.session.summary(),
            items,
        })
    }

    fn acquire(&self, request: QuestionRequest) -> Acquisition {
        let source = Arc::clone(&self.questions);
        Box::pin(async move { source.generate(&request).await })
    }

    fn on_questions(&mut self, outcome: Result<Vec<Question>>, ticker: &mut Interval) {
        if let Err(e) = self.session.apply_questions(outcome) {
            tracing::warn!(session_id = %self.session.id(), error = %e, "Discarded question set");
            return;
        }

        match self.session.failure() {
            Some(failure) => tracing::warn!(
                session_id = %self.session.id(),
                kind = %failure.kind,
                message = %failure.message,
                "Question request failed"
            ),
            None => tracing::info!(
                session_id = %self.session.id(),
                questions = self.session.questions().len(),
                timed = self.session.config().timed,
                "Session ready"
            ),
        }

        if self.session.timer_running() {
            ticker.reset();
        }
        self.publish();
    }

    /// Detached so the summary never waits on the store.
    fn report_usage(&self, delta: UsageDelta) {
        let profiles = Arc::clone(&self.profiles);
        let owner = self.session.owner();
        let id = self.session.id();
        tokio::spawn(async move {
            if let Err(e) = profiles.record_usage(owner, delta).await {
                tracing::warn!(session_id = %id, user_id = %owner, error = %e, "usage-update-failed");
            }
        });
    }

    fn publish(&self) {
        self.view.send_replace(self.session.view());
    }
}

async fn settle(inflight: &mut Option<Acquisition>) -> Result<Vec<Question>> {
    match inflight.as_mut() {
        Some(acquisition) => acquisition.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::models::exam::{ExamType, FailureKind};
    use crate::services::ai_service::{MockExplanationSource, MockQuestionSource};
    use crate::models::profile::{
        Medium, NewProfile, PlanType, Profile, Role, SubjectStream, UsageCounters,
    };

    #[derive(Default)]
    struct FakeQuestions {
        calls: AtomicUsize,
        requests: Mutex<Vec<QuestionRequest>>,
        outcomes: Mutex<VecDeque<Result<Vec<Question>>>>,
    }

    impl FakeQuestions {
        fn with(outcomes: Vec<Result<Vec<Question>>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl QuestionSource for FakeQuestions {
        async fn generate(&self, request: &QuestionRequest) -> Result<Vec<Question>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            let next = self.outcomes.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(questions(request.count)))
        }
    }

    struct FakeTutor {
        reply: Option<String>,
    }

    #[async_trait]
    impl ExplanationSource for FakeTutor {
        async fn simplify(&self, _request: &ExplanationRequest) -> Result<String> {
            self.reply
                .clone()
                .ok_or_else(|| Error::Internal("tutor offline".into()))
        }
    }

    struct FakeProfiles {
        plan: PlanType,
        questions_used: u32,
        usage: Mutex<Vec<UsageDelta>>,
    }

    impl FakeProfiles {
        fn new(plan: PlanType, questions_used: u32) -> Arc<Self> {
            Arc::new(Self {
                plan,
                questions_used,
                usage: Mutex::new(Vec::new()),
            })
        }

        fn recorded(&self) -> Vec<UsageDelta> {
            self.usage.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProfileStore for FakeProfiles {
        async fn fetch(&self, id: Uuid) -> Result<Profile> {
            Ok(Profile {
                id,
                full_name: "Nimali Perera".into(),
                preferred_name: "Nimali".into(),
                whatsapp_no: None,
                school: None,
                al_year: Some("2026".into()),
                plan: self.plan,
                subject_stream: SubjectStream::PhysicalScience,
                email: "nimali@example.com".into(),
                role: Role::Student,
                medium: Medium::Sinhala,
                usage: UsageCounters {
                    questions_answered_this_month: self.questions_used,
                    papers_answered_this_month: 0,
                    last_reset_date: Utc::now(),
                },
            })
        }

        async fn list(&self) -> Result<Vec<Profile>> {
            Ok(vec![])
        }

        async fn create(&self, _profile: NewProfile) -> Result<()> {
            Ok(())
        }

        async fn reset_month(
            &self,
            _id: Uuid,
            _previous: DateTime<Utc>,
            _now: DateTime<Utc>,
        ) -> Result<bool> {
            Ok(true)
        }

        async fn record_usage(&self, _id: Uuid, usage: UsageDelta) -> Result<()> {
            self.usage.lock().unwrap().push(usage);
            Ok(())
        }

        async fn set_medium(&self, _id: Uuid, _medium: Medium) -> Result<()> {
            Ok(())
        }

        async fn set_role(&self, _id: Uuid, _role: Role) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _id: Uuid) -> Result<()> {
            Ok(())
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                question: format!("Q{}", i),
                options: ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect(),
                correct_answer: i % 5,
                explanation: "Ohm's law".into(),
            })
            .collect()
    }

    fn setup(exam_type: ExamType, timed: bool) -> SessionSetup {
        SessionSetup {
            subject: "Physics".into(),
            topic: None,
            exam_type,
            timed,
        }
    }

    fn service(
        questions: Arc<FakeQuestions>,
        profiles: Arc<FakeProfiles>,
        tutor: Option<&str>,
    ) -> SessionService {
        SessionService::new(
            questions,
            Arc::new(FakeTutor {
                reply: tutor.map(str::to_string),
            }),
            profiles,
            Duration::from_secs(90),
        )
    }

    async fn settle_background() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_free_plan_never_calls_question_source() {
        let mut questions = MockQuestionSource::new();
        questions.expect_generate().never();
        let mut tutor = MockExplanationSource::new();
        tutor.expect_simplify().never();
        let svc = SessionService::new(
            Arc::new(questions),
            Arc::new(tutor),
            FakeProfiles::new(PlanType::Free, 20),
            Duration::from_secs(90),
        );

        let view = svc.create(Uuid::new_v4(), setup(ExamType::Quick, false)).await.unwrap();
        assert_eq!(view.phase, ExamPhase::Error);
        assert_eq!(view.failure.unwrap().kind, FailureKind::QuotaExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn free_user_request_is_clamped() {
        let questions = FakeQuestions::with(vec![]);
        let svc = service(questions.clone(), FakeProfiles::new(PlanType::Free, 18), None);

        let view = svc.create(Uuid::new_v4(), setup(ExamType::Quick, false)).await.unwrap();
        assert_eq!(view.phase, ExamPhase::Testing);
        assert_eq!(view.question_count, 2);
        let requests = questions.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].count, 2);
        assert_eq!(requests[0].topic, "general");
        assert_eq!(requests[0].medium, Medium::Sinhala);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_paper_reports_usage_once() {
        let profiles = FakeProfiles::new(PlanType::Plus, 0);
        let svc = service(FakeQuestions::with(vec![]), profiles.clone(), None);
        let owner = Uuid::new_v4();

        let view = svc.create(owner, setup(ExamType::Past, false)).await.unwrap();
        assert_eq!(view.question_count, 10);
        for i in 0..10 {
            let choice = if i < 7 { i % 5 } else { (i + 1) % 5 };
            svc.apply(owner, view.id, Action::SelectAnswer { index: i, choice })
                .await
                .unwrap();
        }
        let mut last = None;
        for _ in 0..10 {
            last = Some(svc.apply(owner, view.id, Action::Advance).await.unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.phase, ExamPhase::Summary);
        let summary = last.summary.unwrap();
        assert_eq!((summary.score, summary.total, summary.percentage), (7, 10, 70));

        let again = svc.apply(owner, view.id, Action::Advance).await;
        assert!(matches!(again, Err(Error::Conflict(_))));

        settle_background().await;
        assert_eq!(profiles.recorded(), vec![UsageDelta { questions: 10, papers: 1 }]);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expiry_scores_the_session() {
        let profiles = FakeProfiles::new(PlanType::Pro, 0);
        let svc = service(
            FakeQuestions::with(vec![Ok(questions(1))]),
            profiles.clone(),
            None,
        );
        let owner = Uuid::new_v4();

        let view = svc.create(owner, setup(ExamType::Topic, true)).await.unwrap();
        assert_eq!(view.time_left_seconds, Some(72));

        tokio::time::sleep(Duration::from_secs(30)).await;
        let midway = svc.view(owner, view.id).await.unwrap();
        assert_eq!(midway.phase, ExamPhase::Testing);
        assert!(midway.time_left_seconds.unwrap() <= 43);

        tokio::time::sleep(Duration::from_secs(45)).await;
        let done = svc.view(owner, view.id).await.unwrap();
        assert_eq!(done.phase, ExamPhase::Summary);
        assert!(done.timed_out);
        assert_eq!(done.time_left_seconds, Some(0));
        assert_eq!(done.summary.unwrap().score, 0);

        settle_background().await;
        assert_eq!(profiles.recorded(), vec![UsageDelta { questions: 1, papers: 0 }]);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_reissues_identical_request() {
        let questions = FakeQuestions::with(vec![
            Ok(vec![]),
            Err(Error::Anyhow(anyhow::anyhow!("Lumina Engine is currently busy"))),
        ]);
        let svc = service(questions.clone(), FakeProfiles::new(PlanType::Pro, 0), None);
        let owner = Uuid::new_v4();

        let view = svc.create(owner, setup(ExamType::Model, true)).await.unwrap();
        assert_eq!(view.failure.unwrap().kind, FailureKind::GenerationFailed);

        let view = svc.retry(owner, view.id).await.unwrap();
        let failure = view.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::NetworkFailure);
        assert_eq!(failure.message, "Lumina Engine is currently busy");

        let view = svc.retry(owner, view.id).await.unwrap();
        assert_eq!(view.phase, ExamPhase::Testing);
        assert_eq!(view.answered, 0);
        assert_eq!(view.time_left_seconds, Some(720));

        let requests = questions.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| *r == requests[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_are_private_to_their_owner() {
        let svc = service(FakeQuestions::with(vec![]), FakeProfiles::new(PlanType::Free, 0), None);
        let owner = Uuid::new_v4();
        let view = svc.create(owner, setup(ExamType::Quick, false)).await.unwrap();

        let stranger = Uuid::new_v4();
        assert!(matches!(svc.view(stranger, view.id).await, Err(Error::NotFound(_))));
        assert!(matches!(svc.dispose(stranger, view.id).await, Err(Error::NotFound(_))));

        svc.dispose(owner, view.id).await.unwrap();
        assert!(matches!(svc.view(owner, view.id).await, Err(Error::NotFound(_))));
        assert_eq!(svc.active_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_disposes_only_that_users_sessions() {
        let svc = service(FakeQuestions::with(vec![]), FakeProfiles::new(PlanType::Plus, 0), None);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        svc.create(alice, setup(ExamType::Quick, true)).await.unwrap();
        svc.create(alice, setup(ExamType::Past, true)).await.unwrap();
        let kept = svc.create(bob, setup(ExamType::Quick, false)).await.unwrap();

        assert_eq!(svc.dispose_owned_by(alice).await, 2);
        assert_eq!(svc.active_count().await, 1);
        assert!(svc.view(bob, kept.id).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn disposed_timed_session_never_expires() {
        let profiles = FakeProfiles::new(PlanType::Plus, 0);
        let svc = service(FakeQuestions::with(vec![]), profiles.clone(), None);
        let owner = Uuid::new_v4();

        let view = svc.create(owner, setup(ExamType::Quick, true)).await.unwrap();
        assert_eq!(view.time_left_seconds, Some(72 * 5));
        svc.apply(owner, view.id, Action::SelectAnswer { index: 0, choice: 0 })
            .await
            .unwrap();
        svc.dispose(owner, view.id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(72 * 5 + 60)).await;
        settle_background().await;
        assert!(profiles.recorded().is_empty());
        assert_eq!(svc.active_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_swept() {
        let svc = service(FakeQuestions::with(vec![]), FakeProfiles::new(PlanType::Plus, 0), None);
        let owner = Uuid::new_v4();
        let stale = svc.create(owner, setup(ExamType::Quick, false)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(60 * 60)).await;
        let fresh = svc.create(owner, setup(ExamType::Quick, false)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60 * 61)).await;

        assert_eq!(svc.sweep_idle(Duration::from_secs(2 * 60 * 60)).await, 1);
        assert!(svc.view(owner, stale.id).await.is_err());
        assert!(svc.view(owner, fresh.id).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn simplify_falls_back_without_touching_state() {
        let svc = service(FakeQuestions::with(vec![]), FakeProfiles::new(PlanType::Plus, 0), None);
        let owner = Uuid::new_v4();
        let view = svc.create(owner, setup(ExamType::Quick, false)).await.unwrap();

        let early = svc.simplify(owner, view.id, 0).await;
        assert!(matches!(early, Err(Error::Conflict(_))));

        for _ in 0..5 {
            svc.apply(owner, view.id, Action::Advance).await.unwrap();
        }
        svc.apply(owner, view.id, Action::OpenReview).await.unwrap();

        let simplified = svc.simplify(owner, view.id, 2).await.unwrap();
        assert!(!simplified.simplified);
        assert_eq!(simplified.explanation, SIMPLIFY_FALLBACK);
        assert_eq!(svc.view(owner, view.id).await.unwrap().phase, ExamPhase::Review);

        let review = svc.review(owner, view.id).await.unwrap();
        assert_eq!(review.items.len(), 5);
        assert!(review.items.iter().all(|i| i.selected.is_none()));
        assert_eq!(review.summary.unwrap().score, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn simplify_returns_tutor_text() {
        let mut tutor = MockExplanationSource::new();
        tutor
            .expect_simplify()
            .withf(|r| r.subject == "Physics" && r.question == "Q0" && r.medium == Medium::Sinhala)
            .times(1)
            .returning(|_| Ok("Think of voltage as water pressure.".to_string()));
        let svc = SessionService::new(
            FakeQuestions::with(vec![]),
            Arc::new(tutor),
            FakeProfiles::new(PlanType::Plus, 0),
            Duration::from_secs(90),
        );
        let owner = Uuid::new_v4();
        let view = svc.create(owner, setup(ExamType::Quick, false)).await.unwrap();
        for _ in 0..5 {
            svc.apply(owner, view.id, Action::Advance).await.unwrap();
        }
        svc.apply(owner, view.id, Action::OpenReview).await.unwrap();

        let simplified = svc.simplify(owner, view.id, 0).await.unwrap();
        assert!(simplified.simplified);
        assert_eq!(simplified.explanation, "Think of voltage as water pressure.");
        assert!(matches!(
            svc.simplify(owner, view.id, 7).await,
            Err(Error::BadRequest(_))
        ));
    }
}
