//! Tutor Client Orchestration
//!
//! `TutorClient` composes the normalizer, fallback synthesizer, quiz
//! session, conversation manager, and session store around a completion
//! transport. It owns the single active lesson for the lifetime of one
//! topic; generating a new lesson discards and replaces the quiz and
//! conversation along with it.
//!
//! Concurrency model: at most one lesson-generation request and at most
//! one chat request may be outstanding at a time, enforced by per-kind
//! compare-and-swap guards. Quiz answering proceeds freely while a chat
//! request is in flight; the two touch the shared state in disjoint,
//! short locking windows.

use crate::{
    SessionEvent,
    conversation::{ChatTurn, Conversation},
    error::{RequestKind, TutorError},
    lesson::LessonRecord,
    normalizer,
    quiz::{QuizPhase, QuizSession},
    store::{SNAPSHOT_KEY, SessionSnapshot, SessionStore},
    transport::{CompletionRequest, Transport},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

/// Fixed instruction for lesson generation. The model is asked for the
/// compact quiz keys (`q`, `a`, `correct`) that the normalizer expects.
const LESSON_SYSTEM_PROMPT: &str = "You are a patient tutor. Given a topic, reply with a single \
JSON object and nothing else, shaped as {\"lesson\": string, \"quiz\": [{\"q\": string, \
\"a\": [string, string, string], \"correct\": string}], \"summary\": string}. The lesson is a \
short instructional text, the quiz has three-option multiple-choice questions whose \"correct\" \
value is one of the options, and the summary is one or two sentences.";

/// Fixed system turn prefixed to every chat request.
const CHAT_SYSTEM_PROMPT: &str = "You are a patient tutor continuing an open-ended conversation \
about the student's current lesson. Answer follow-up questions clearly and concisely.";

/// Appended in place of an assistant reply when the transport fails, so
/// the conversation never shows a dangling user turn.
const CHAT_FAILURE_REPLY: &str = "I couldn't reach the tutoring service just now. Your message \
is still in the conversation; please try again.";

/// Sampling parameters applied to every completion request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            max_tokens: 700,
            temperature: 0.7,
        }
    }
}

/// The mutable session state owned exclusively by the client.
#[derive(Debug, Default)]
struct SessionState {
    lesson: Option<LessonRecord>,
    quiz: QuizSession,
    conversation: Conversation,
}

/// Orchestrates lesson generation, quiz progress, and the follow-up
/// conversation for one active topic.
pub struct TutorClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn SessionStore>,
    options: RequestOptions,
    state: Arc<Mutex<SessionState>>,
    lesson_pending: AtomicBool,
    chat_pending: AtomicBool,
    events: Option<mpsc::Sender<SessionEvent>>,
}

/// Releases an in-flight guard on every exit path, including early
/// returns on transport failure.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, kind: RequestKind) -> Result<Self, TutorError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TutorError::RequestInFlight(kind))?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TutorClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
        options: RequestOptions,
    ) -> Self {
        Self {
            transport,
            store,
            options,
            state: Arc::new(Mutex::new(SessionState::default())),
            lesson_pending: AtomicBool::new(false),
            chat_pending: AtomicBool::new(false),
            events: None,
        }
    }

    /// Attaches a channel on which state changes are broadcast.
    pub fn with_events(mut self, events: mpsc::Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Generates a lesson for `topic`, replacing any prior lesson,
    /// quiz, and conversation.
    ///
    /// Unusable model output is recovered locally via the fallback
    /// synthesizer and never surfaced as an error. A transport failure
    /// leaves all state exactly as it was before the call.
    pub async fn generate_lesson(&self, topic: &str) -> Result<LessonRecord, TutorError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(TutorError::InvalidInput(
                "topic must not be empty".to_string(),
            ));
        }
        let _guard = InFlightGuard::acquire(&self.lesson_pending, RequestKind::Lesson)?;

        let request = CompletionRequest {
            system_prompt: LESSON_SYSTEM_PROMPT.to_string(),
            history: vec![ChatTurn::user(format!("Create a lesson about: {topic}"))],
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };
        info!(%topic, "requesting lesson generation");
        let raw = self
            .transport
            .complete(request)
            .await
            .map_err(TutorError::Transport)?;

        let record = match normalizer::normalize(&raw) {
            Ok(normalized) => LessonRecord {
                topic: topic.to_string(),
                lesson: normalized.lesson,
                quiz: normalized.quiz,
                summary: normalized.summary,
            },
            Err(failure) => {
                warn!(%topic, "model output unusable; synthesizing fallback lesson");
                normalizer::synthesize(topic, &failure.raw)
            }
        };

        {
            let mut state = self.state.lock().await;
            state.quiz = QuizSession::new(record.quiz.clone());
            state.conversation.clear();
            state.lesson = Some(record.clone());
        }
        self.persist().await;
        info!(%topic, quiz_items = record.quiz.len(), "lesson ready");
        self.emit(SessionEvent::LessonReady(record.clone())).await;
        Ok(record)
    }

    /// Sends one chat message and appends both sides of the exchange.
    ///
    /// The request carries the fixed chat system turn plus the
    /// windowed history ending in the new user turn. The assistant
    /// reply is appended unvalidated. On transport failure a fixed
    /// diagnostic assistant turn is appended and the error is still
    /// surfaced to the caller.
    pub async fn send_chat_message(&self, text: &str) -> Result<String, TutorError> {
        let _guard = InFlightGuard::acquire(&self.chat_pending, RequestKind::Chat)?;

        let (user_turn, history) = {
            let mut state = self.state.lock().await;
            let turn = state.conversation.append_user(text)?;
            (turn, state.conversation.window_for_prompt().to_vec())
        };
        self.emit(SessionEvent::TurnAppended(user_turn)).await;

        let request = CompletionRequest {
            system_prompt: CHAT_SYSTEM_PROMPT.to_string(),
            history,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };
        match self.transport.complete(request).await {
            Ok(reply) => {
                let turn = {
                    let mut state = self.state.lock().await;
                    state.conversation.append_assistant(reply.clone())
                };
                self.emit(SessionEvent::TurnAppended(turn)).await;
                self.emit(SessionEvent::Speak(reply.clone())).await;
                Ok(reply)
            }
            Err(e) => {
                warn!(error = ?e, "chat completion failed; appending diagnostic turn");
                let turn = {
                    let mut state = self.state.lock().await;
                    state.conversation.append_assistant(CHAT_FAILURE_REPLY)
                };
                self.emit(SessionEvent::TurnAppended(turn)).await;
                Err(TutorError::Transport(e))
            }
        }
    }

    /// Records an answer for the quiz question at `index`. A no-op
    /// after the quiz has been graded or for an out-of-range index.
    pub async fn select_answer(&self, index: usize, option: &str) -> bool {
        let accepted = {
            let mut state = self.state.lock().await;
            state.quiz.select(index, option)
        };
        if accepted {
            self.persist().await;
            self.emit(SessionEvent::SelectionRecorded {
                index,
                option: option.to_string(),
            })
            .await;
        }
        accepted
    }

    /// Grades the quiz. Returns `None` when there is nothing to grade;
    /// a repeat call returns the recorded score unchanged.
    pub async fn submit_quiz(&self) -> Option<usize> {
        let (score, total, newly_graded) = {
            let mut state = self.state.lock().await;
            let newly_graded = state.quiz.score().is_none();
            let score = state.quiz.submit();
            (score, state.quiz.items().len(), newly_graded)
        };
        if let Some(score) = score {
            if newly_graded {
                self.persist().await;
                info!(score, total, "quiz graded");
                self.emit(SessionEvent::QuizGraded { score, total }).await;
            }
        }
        score
    }

    /// Clears the active lesson, quiz, and conversation and deletes the
    /// persisted snapshot.
    pub async fn reset(&self) {
        {
            let mut state = self.state.lock().await;
            state.quiz.reset();
            state.conversation.clear();
            state.lesson = None;
        }
        if let Err(e) = self.store.delete(SNAPSHOT_KEY).await {
            warn!(error = ?e, "failed to delete session snapshot");
        }
        self.emit(SessionEvent::SessionCleared).await;
    }

    /// Rehydrates the lesson and quiz progress from the persisted
    /// snapshot, if one exists. Chat history is never persisted, so the
    /// conversation starts empty.
    pub async fn restore(&self) -> Option<LessonRecord> {
        let snapshot = match self.store.load(SNAPSHOT_KEY).await {
            Ok(snapshot) => snapshot?,
            Err(e) => {
                warn!(error = ?e, "failed to load session snapshot");
                return None;
            }
        };

        let record = snapshot.lesson_record();
        let mut state = self.state.lock().await;
        state.quiz = QuizSession::restore(
            snapshot.quiz,
            snapshot.selections,
            snapshot.score,
        );
        state.conversation.clear();
        state.lesson = Some(record.clone());
        info!(topic = %record.topic, "session restored from snapshot");
        Some(record)
    }

    /// The active lesson, if any.
    pub async fn lesson(&self) -> Option<LessonRecord> {
        self.state.lock().await.lesson.clone()
    }

    /// The full chat history, for rendering.
    pub async fn history(&self) -> Vec<ChatTurn> {
        self.state.lock().await.conversation.history().to_vec()
    }

    /// The quiz phase the session is currently in.
    pub async fn quiz_phase(&self) -> QuizPhase {
        self.state.lock().await.quiz.phase()
    }

    /// The recorded score, once graded.
    pub async fn quiz_score(&self) -> Option<usize> {
        self.state.lock().await.quiz.score()
    }

    /// Writes the current snapshot. Persistence is best-effort: a store
    /// failure is logged and the session stays usable.
    async fn persist(&self) {
        let snapshot = {
            let state = self.state.lock().await;
            let Some(lesson) = &state.lesson else {
                return;
            };
            SessionSnapshot {
                topic: lesson.topic.clone(),
                lesson: lesson.lesson.clone(),
                quiz: lesson.quiz.clone(),
                summary: lesson.summary.clone(),
                selections: state.quiz.selections().clone(),
                score: state.quiz.score(),
            }
        };
        if let Err(e) = self.store.save(SNAPSHOT_KEY, &snapshot).await {
            warn!(error = ?e, "failed to persist session snapshot");
        }
    }

    async fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).await.is_err() {
                warn!("state event receiver dropped");
            }
        }
    }
}
