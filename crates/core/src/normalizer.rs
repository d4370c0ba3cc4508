//! Response Normalization and Fallback Synthesis
//!
//! The completion endpoint is untrusted: it may return clean JSON, JSON
//! wrapped in prose or markdown fences, malformed JSON, or an outright
//! refusal in plain text. `normalize` shapes whatever came back into a
//! validated lesson structure or reports failure; `synthesize` builds a
//! deterministic placeholder lesson so the user never sees a broken or
//! empty lesson. The two are deliberately separate concerns: parsing
//! lives here in `normalize`, and the orchestrator decides when to
//! degrade via `synthesize`.

use crate::lesson::{LessonRecord, QuizItem};
use serde_json::Value;
use tracing::{debug, warn};

/// Model output that could not be shaped into a usable lesson.
///
/// Carries the original raw text so the caller can hand it to the
/// fallback synthesizer or log it for diagnosis.
#[derive(Debug, thiserror::Error)]
#[error("model output did not contain a usable lesson structure")]
pub struct NormalizationFailure {
    pub raw: String,
}

/// The validated payload of a lesson response, before the owning topic
/// is attached by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLesson {
    pub lesson: String,
    pub quiz: Vec<QuizItem>,
    pub summary: String,
}

/// Attempts to turn raw model text into a validated lesson structure.
///
/// The whole string is parsed first; if that fails, the first substring
/// bounded by an outermost balanced `{...}` or `[...]` pair is parsed
/// instead. Success requires an object with non-empty `lesson` and
/// `summary` strings and a present `quiz` key. A `quiz` value that is
/// not an array is coerced to an empty sequence; array elements that do
/// not satisfy the quiz-item invariant are dropped. No partial record
/// is ever surfaced as success.
pub fn normalize(raw: &str) -> Result<NormalizedLesson, NormalizationFailure> {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => Some(value),
        Err(_) => extract_balanced(raw).and_then(|candidate| {
            debug!(len = candidate.len(), "whole-string parse failed; trying embedded block");
            serde_json::from_str::<Value>(candidate).ok()
        }),
    };

    value
        .and_then(validate)
        .ok_or_else(|| NormalizationFailure {
            raw: raw.to_string(),
        })
}

/// Checks the required fields and coerces the quiz into a sequence of
/// valid items.
fn validate(value: Value) -> Option<NormalizedLesson> {
    let object = value.as_object()?;
    let lesson = non_empty_str(object.get("lesson")?)?;
    let summary = non_empty_str(object.get("summary")?)?;

    let quiz = match object.get("quiz")?.as_array() {
        Some(items) => items
            .iter()
            .filter_map(|item| match serde_json::from_value::<QuizItem>(item.clone()) {
                Ok(parsed) if parsed.is_valid() => Some(parsed),
                _ => {
                    warn!("dropping malformed quiz item from model output");
                    None
                }
            })
            .collect(),
        None => Vec::new(),
    };

    Some(NormalizedLesson {
        lesson: lesson.to_string(),
        quiz,
        summary: summary.to_string(),
    })
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

/// Finds the first substring bounded by an outermost balanced `{...}`
/// or `[...]` pair.
///
/// The scanner tracks string literals and escape sequences, so
/// delimiters inside JSON strings cannot unbalance the count. Only the
/// opener's own delimiter kind is counted; properly nested JSON keeps
/// the count correct regardless of what is nested inside.
fn extract_balanced(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        if b == b'"' {
            in_string = true;
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..=i]);
            }
        }
    }
    None
}

const FALLBACK_OPTION_FUNDAMENTALS: &str = "The fundamentals covered in the lesson text";
const FALLBACK_OPTION_SUMMARY: &str = "Memorising the summary word for word";

/// Builds a deterministic placeholder lesson for `topic`.
///
/// The lesson body is the raw model text when it is non-blank (a
/// refusal or prose answer is still worth showing), otherwise a
/// templated failure sentence naming the topic. The quiz is always
/// exactly two templated items.
pub fn synthesize(topic: &str, raw: &str) -> LessonRecord {
    let lesson = if raw.trim().is_empty() {
        format!(
            "Lesson generation for \"{topic}\" failed; no usable content came back. \
             Try generating the lesson again."
        )
    } else {
        raw.to_string()
    };

    let quiz = vec![
        QuizItem {
            question: "What is the main topic of this lesson?".to_string(),
            options: vec![
                topic.to_string(),
                format!("Common misconceptions about {topic}"),
                format!("Subjects unrelated to {topic}"),
            ],
            correct_option: topic.to_string(),
        },
        QuizItem {
            question: format!("Where should you focus first when studying {topic}?"),
            options: vec![
                FALLBACK_OPTION_FUNDAMENTALS.to_string(),
                format!("Advanced edge cases of {topic}"),
                FALLBACK_OPTION_SUMMARY.to_string(),
            ],
            correct_option: FALLBACK_OPTION_FUNDAMENTALS.to_string(),
        },
    ];

    LessonRecord {
        topic: topic.to_string(),
        lesson,
        quiz,
        summary: format!(
            "This lesson gives a first look at {topic}; review the material and retake the quiz."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_A: &str = r#"{"lesson":"X is a thing","quiz":[{"q":"Q1","a":["x","y","z"],"correct":"y"}],"summary":"S"}"#;

    #[test]
    fn clean_json_round_trips() {
        let normalized = normalize(SCENARIO_A).unwrap();
        assert_eq!(normalized.lesson, "X is a thing");
        assert_eq!(normalized.summary, "S");
        assert_eq!(normalized.quiz.len(), 1);
        assert_eq!(normalized.quiz[0].question, "Q1");
        assert_eq!(normalized.quiz[0].correct_option, "y");
    }

    #[test]
    fn json_wrapped_in_prose_is_extracted() {
        let raw = format!("Sure! Here is your lesson:\n\n{SCENARIO_A}\n\nEnjoy studying.");
        let normalized = normalize(&raw).unwrap();
        assert_eq!(normalized.lesson, "X is a thing");
        assert_eq!(normalized.quiz.len(), 1);
    }

    #[test]
    fn json_inside_markdown_fence_is_extracted() {
        let raw = format!("```json\n{SCENARIO_A}\n```");
        let normalized = normalize(&raw).unwrap();
        assert_eq!(normalized.summary, "S");
    }

    #[test]
    fn braces_inside_strings_do_not_unbalance_the_scanner() {
        let raw = r#"Note: {"lesson":"Use {braces} and \"quotes\" carefully","quiz":[],"summary":"About } and {"} trailing text"#;
        let normalized = normalize(raw).unwrap();
        assert_eq!(normalized.lesson, "Use {braces} and \"quotes\" carefully");
        assert_eq!(normalized.summary, "About } and {");
    }

    #[test]
    fn plain_prose_fails() {
        let raw = "Sorry, I can't help with that.";
        let failure = normalize(raw).unwrap_err();
        assert_eq!(failure.raw, raw);
    }

    #[test]
    fn missing_required_keys_fail() {
        assert!(normalize(r#"{"lesson":"L","summary":"S"}"#).is_err());
        assert!(normalize(r#"{"lesson":"L","quiz":[]}"#).is_err());
        assert!(normalize(r#"{"quiz":[],"summary":"S"}"#).is_err());
    }

    #[test]
    fn empty_required_fields_fail() {
        assert!(normalize(r#"{"lesson":"","quiz":[],"summary":"S"}"#).is_err());
        assert!(normalize(r#"{"lesson":"L","quiz":[],"summary":"  "}"#).is_err());
    }

    #[test]
    fn non_object_json_fails() {
        assert!(normalize("42").is_err());
        assert!(normalize(r#""just a string""#).is_err());
        assert!(normalize("[1, 2, 3]").is_err());
    }

    #[test]
    fn non_array_quiz_coerces_to_empty() {
        let raw = r#"{"lesson":"L","quiz":"none","summary":"S"}"#;
        let normalized = normalize(raw).unwrap();
        assert!(normalized.quiz.is_empty());
    }

    #[test]
    fn malformed_quiz_items_are_dropped() {
        let raw = r#"{"lesson":"L","quiz":[
            {"q":"ok","a":["x","y","z"],"correct":"z"},
            {"q":"two options","a":["x","y"],"correct":"x"},
            {"q":"correct missing","a":["x","y","z"],"correct":"w"},
            "not an object"
        ],"summary":"S"}"#;
        let normalized = normalize(raw).unwrap();
        assert_eq!(normalized.quiz.len(), 1);
        assert_eq!(normalized.quiz[0].question, "ok");
    }

    #[test]
    fn extract_balanced_picks_first_block() {
        assert_eq!(extract_balanced("abc {\"a\":1} def {\"b\":2}"), Some("{\"a\":1}"));
        assert_eq!(extract_balanced("pre [1,[2,3]] post"), Some("[1,[2,3]]"));
        assert_eq!(extract_balanced("no json here"), None);
        assert_eq!(extract_balanced("unclosed {\"a\":1"), None);
    }

    #[test]
    fn synthesize_uses_raw_text_as_lesson_body() {
        let raw = "Sorry, I can't help with that.";
        let record = synthesize("Recursion", raw);
        assert_eq!(record.lesson, raw);
        assert_eq!(record.topic, "Recursion");
        assert_eq!(record.quiz.len(), 2);
        for item in &record.quiz {
            assert!(item.is_valid());
        }
        assert!(record.summary.contains("Recursion"));
    }

    #[test]
    fn synthesize_templates_failure_message_when_raw_is_empty() {
        let record = synthesize("Recursion", "");
        assert!(record.lesson.contains("Recursion"));
        assert!(record.lesson.contains("failed"));
        assert_eq!(record.quiz.len(), 2);
    }

    #[test]
    fn synthesize_is_deterministic() {
        assert_eq!(synthesize("Ohm's law", "text"), synthesize("Ohm's law", "text"));
    }
}
