//! Quiz Session State Machine
//!
//! A pure, synchronous state machine: Empty → (items loaded) →
//! Answering → (submit) → Graded, with Graded terminal until `reset`.
//! Persistence and change notification are the orchestrator's job, so
//! mutating operations report whether they were accepted.

use crate::lesson::QuizItem;
use std::collections::BTreeMap;

/// The phase the session is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Empty,
    Answering,
    Graded,
}

/// Holds the quiz items, the user's per-question selections, and the
/// score once graded.
///
/// Once `score` is set the selections are frozen: `select` becomes a
/// no-op and a second `submit` returns the recorded score without
/// re-scoring.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    items: Vec<QuizItem>,
    selections: BTreeMap<usize, String>,
    score: Option<usize>,
}

impl QuizSession {
    pub fn new(items: Vec<QuizItem>) -> Self {
        Self {
            items,
            selections: BTreeMap::new(),
            score: None,
        }
    }

    /// Rebuilds a session from persisted progress. Selections for
    /// indices outside the item range are discarded.
    pub fn restore(
        items: Vec<QuizItem>,
        selections: BTreeMap<usize, String>,
        score: Option<usize>,
    ) -> Self {
        let len = items.len();
        let selections = selections.into_iter().filter(|(i, _)| *i < len).collect();
        Self {
            items,
            selections,
            score,
        }
    }

    pub fn phase(&self) -> QuizPhase {
        if self.items.is_empty() {
            QuizPhase::Empty
        } else if self.score.is_some() {
            QuizPhase::Graded
        } else {
            QuizPhase::Answering
        }
    }

    pub fn items(&self) -> &[QuizItem] {
        &self.items
    }

    pub fn selections(&self) -> &BTreeMap<usize, String> {
        &self.selections
    }

    pub fn score(&self) -> Option<usize> {
        self.score
    }

    /// Records the chosen option for the question at `index`.
    ///
    /// Returns `false` without mutating anything when the session is
    /// already graded or the index is out of range.
    pub fn select(&mut self, index: usize, option: impl Into<String>) -> bool {
        if self.score.is_some() || index >= self.items.len() {
            return false;
        }
        self.selections.insert(index, option.into());
        true
    }

    /// Grades the session and freezes the selections.
    ///
    /// Returns `None` when there are no items to grade. Calling again
    /// after grading returns the recorded score without re-scoring.
    pub fn submit(&mut self) -> Option<usize> {
        if let Some(score) = self.score {
            return Some(score);
        }
        if self.items.is_empty() {
            return None;
        }
        let score = self
            .items
            .iter()
            .enumerate()
            .filter(|(i, item)| {
                self.selections.get(i).map(String::as_str) == Some(item.correct_option.as_str())
            })
            .count();
        self.score = Some(score);
        Some(score)
    }

    /// Clears items, selections, and score, returning to Empty.
    pub fn reset(&mut self) {
        self.items.clear();
        self.selections.clear();
        self.score = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_items() -> Vec<QuizItem> {
        (0..3)
            .map(|i| QuizItem {
                question: format!("Q{i}"),
                options: vec!["a".into(), "b".into(), "c".into()],
                correct_option: "b".into(),
            })
            .collect()
    }

    #[test]
    fn phases_follow_the_state_machine() {
        let mut session = QuizSession::default();
        assert_eq!(session.phase(), QuizPhase::Empty);

        session = QuizSession::new(three_items());
        assert_eq!(session.phase(), QuizPhase::Answering);

        session.submit();
        assert_eq!(session.phase(), QuizPhase::Graded);

        session.reset();
        assert_eq!(session.phase(), QuizPhase::Empty);
    }

    #[test]
    fn score_counts_final_selections_only() {
        let mut session = QuizSession::new(three_items());
        assert!(session.select(0, "a"));
        assert!(session.select(0, "b")); // re-selection overrides
        assert!(session.select(1, "c")); // wrong
        // index 2 never chosen: must not count as correct
        assert_eq!(session.submit(), Some(1));
    }

    #[test]
    fn submit_is_idempotent() {
        let mut session = QuizSession::new(three_items());
        session.select(0, "b");
        let first = session.submit();
        let selections_after_first = session.selections().clone();

        assert_eq!(session.submit(), first);
        assert_eq!(session.selections(), &selections_after_first);
        assert_eq!(session.score(), Some(1));
    }

    #[test]
    fn submit_on_empty_session_is_a_noop() {
        let mut session = QuizSession::default();
        assert_eq!(session.submit(), None);
        assert_eq!(session.score(), None);
        assert_eq!(session.phase(), QuizPhase::Empty);
    }

    #[test]
    fn select_after_submit_does_not_mutate() {
        let mut session = QuizSession::new(three_items());
        session.select(0, "b");
        session.submit();

        let before = session.selections().clone();
        assert!(!session.select(1, "b"));
        assert!(!session.select(0, "c"));
        assert_eq!(session.selections(), &before);
        assert_eq!(session.score(), Some(1));
    }

    #[test]
    fn out_of_range_select_is_rejected() {
        let mut session = QuizSession::new(three_items());
        assert!(!session.select(3, "b"));
        assert!(session.selections().is_empty());
    }

    #[test]
    fn restore_discards_out_of_range_selections() {
        let selections: BTreeMap<usize, String> =
            [(0, "b".to_string()), (7, "a".to_string())].into();
        let session = QuizSession::restore(three_items(), selections, None);
        assert_eq!(session.selections().len(), 1);
        assert_eq!(session.selections().get(&0).map(String::as_str), Some("b"));
    }

    #[test]
    fn all_correct_scores_full_marks() {
        let mut session = QuizSession::new(three_items());
        for i in 0..3 {
            session.select(i, "b");
        }
        assert_eq!(session.submit(), Some(3));
    }
}
