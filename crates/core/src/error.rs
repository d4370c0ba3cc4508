use std::fmt;

/// The two request kinds the client serializes independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Lesson,
    Chat,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Lesson => write!(f, "lesson generation"),
            RequestKind::Chat => write!(f, "chat"),
        }
    }
}

/// Errors surfaced by the tutor client to its caller.
///
/// Normalization failures are deliberately absent: they are recovered
/// internally via the fallback synthesizer and never reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("a {0} request is already in flight")]
    RequestInFlight(RequestKind),
    #[error("completion transport failed")]
    Transport(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TutorError::InvalidInput("topic must not be empty".to_string());
        assert_eq!(format!("{err}"), "invalid input: topic must not be empty");

        let err = TutorError::RequestInFlight(RequestKind::Lesson);
        assert_eq!(
            format!("{err}"),
            "a lesson generation request is already in flight"
        );

        let err = TutorError::RequestInFlight(RequestKind::Chat);
        assert_eq!(format!("{err}"), "a chat request is already in flight");
    }

    #[test]
    fn transport_error_carries_source() {
        let err = TutorError::Transport(anyhow::anyhow!("connection refused"));
        let source = std::error::Error::source(&err).expect("source should be set");
        assert_eq!(source.to_string(), "connection refused");
    }
}
