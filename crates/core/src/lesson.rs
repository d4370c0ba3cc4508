//! Lesson Data Model
//!
//! The structures produced by lesson generation. The serde field names
//! follow the compact keys the model is instructed to emit (`q`, `a`,
//! `correct`), so the same types serve as both the wire format and the
//! persisted snapshot format.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One multiple-choice question with exactly one correct option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    #[serde(rename = "q")]
    pub question: String,
    #[serde(rename = "a")]
    pub options: Vec<String>,
    #[serde(rename = "correct")]
    pub correct_option: String,
}

impl QuizItem {
    /// Checks the structural invariant: exactly three distinct options,
    /// and the correct option is one of them.
    pub fn is_valid(&self) -> bool {
        if self.options.len() != 3 {
            return false;
        }
        let distinct: HashSet<&str> = self.options.iter().map(String::as_str).collect();
        distinct.len() == self.options.len()
            && self.options.iter().any(|o| o == &self.correct_option)
    }
}

/// A generated lesson together with its quiz and summary.
///
/// Once a generation attempt completes, `lesson` and `summary` are
/// non-empty by construction (either normalized from model output or
/// produced by the fallback synthesizer). The quiz may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRecord {
    pub topic: String,
    pub lesson: String,
    pub quiz: Vec<QuizItem>,
    pub summary: String,
}
