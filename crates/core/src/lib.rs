pub mod client;
pub mod conversation;
pub mod error;
pub mod lesson;
pub mod normalizer;
pub mod quiz;
pub mod store;
pub mod transport;

pub use client::{RequestOptions, TutorClient};
pub use error::{RequestKind, TutorError};

use conversation::ChatTurn;
use lesson::LessonRecord;

/// Represents observable state changes that the core emits to an external runtime.
///
/// This enum is the primary API for decoupling the session's state
/// transitions from the runtime's rendering and side effects (like
/// speaking an assistant reply out loud).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A lesson finished generating and the quiz is ready to answer.
    LessonReady(LessonRecord),
    /// A quiz answer was recorded for the question at `index`.
    SelectionRecorded { index: usize, option: String },
    /// The quiz was submitted and graded.
    QuizGraded { score: usize, total: usize },
    /// The session was reset to an empty state.
    SessionCleared,
    /// A turn was appended to the chat history.
    TurnAppended(ChatTurn),
    /// Command the runtime to speak the given text to the user.
    Speak(String),
}
