//! Command parsing for the interactive loop.
//!
//! Slash-prefixed lines are session commands; any other non-blank line
//! is a chat message (a finalized speech transcript arrives through the
//! same path).

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// `/lesson <topic>` — generate a lesson.
    Lesson(String),
    /// `/answer <n> <option>` — answer question `n` (1-based).
    Answer { number: usize, option: String },
    /// `/submit` — grade the quiz.
    Submit,
    /// `/reset` — clear the session and its snapshot.
    Reset,
    /// `/help` — print the command reference.
    Help,
    /// `/quit` — exit.
    Quit,
    /// Anything else: a chat message for the tutor.
    Chat(String),
}

/// Parses one input line. Returns `None` for blank lines and malformed
/// commands (the caller prints usage for the latter via `Help`).
pub fn parse(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if !line.starts_with('/') {
        return Some(ReplCommand::Chat(line.to_string()));
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    match command {
        "/lesson" if !rest.is_empty() => Some(ReplCommand::Lesson(rest.to_string())),
        "/answer" => {
            let (number, option) = rest.split_once(char::is_whitespace)?;
            let number = number.trim().parse::<usize>().ok()?;
            let option = option.trim();
            if option.is_empty() {
                return None;
            }
            Some(ReplCommand::Answer {
                number,
                option: option.to_string(),
            })
        }
        "/submit" => Some(ReplCommand::Submit),
        "/reset" => Some(ReplCommand::Reset),
        "/help" => Some(ReplCommand::Help),
        "/quit" | "/exit" => Some(ReplCommand::Quit),
        _ => Some(ReplCommand::Help),
    }
}

pub const HELP_TEXT: &str = "\
Commands:
  /lesson <topic>       generate a lesson and quiz for a topic
  /answer <n> <option>  answer quiz question n with the given option text
  /submit               grade the quiz (answers lock in)
  /reset                clear the session and its saved snapshot
  /help                 show this help
  /quit                 exit
Anything else is sent to the tutor as a chat message.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_parse_to_none() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   \t"), None);
    }

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(
            parse("why does this work?"),
            Some(ReplCommand::Chat("why does this work?".to_string()))
        );
    }

    #[test]
    fn lesson_requires_a_topic() {
        assert_eq!(
            parse("/lesson Ohm's law"),
            Some(ReplCommand::Lesson("Ohm's law".to_string()))
        );
        assert_eq!(parse("/lesson"), Some(ReplCommand::Help));
        assert_eq!(parse("/lesson   "), Some(ReplCommand::Help));
    }

    #[test]
    fn answer_parses_number_and_multiword_option() {
        assert_eq!(
            parse("/answer 2 the mitochondria"),
            Some(ReplCommand::Answer {
                number: 2,
                option: "the mitochondria".to_string()
            })
        );
        assert_eq!(parse("/answer two x"), None);
        assert_eq!(parse("/answer 2"), None);
    }

    #[test]
    fn bare_commands_parse() {
        assert_eq!(parse("/submit"), Some(ReplCommand::Submit));
        assert_eq!(parse("/reset"), Some(ReplCommand::Reset));
        assert_eq!(parse("/quit"), Some(ReplCommand::Quit));
        assert_eq!(parse("/exit"), Some(ReplCommand::Quit));
    }

    #[test]
    fn unknown_slash_command_shows_help() {
        assert_eq!(parse("/frobnicate"), Some(ReplCommand::Help));
    }
}
