//! REPL input parsing.

/// Keywords offered for completion.
pub const KEYWORDS: [&str; 9] = [
    "help", "settings", "reset", "info", "open", "accept", "refine", "exit", "quit",
];

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    Help,
    Settings,
    Reset,
    Info(&'a str),
    Open(&'a str),
    Accept,
    Refine,
    Exit,
    /// Anything else is a natural-language request for the agent.
    Request(&'a str),
}

impl<'a> ReplCommand<'a> {
    /// Parses a trimmed, non-empty line. Keywords are case-insensitive; file
    /// arguments keep their case.
    pub fn parse(line: &'a str) -> Self {
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match (head.to_ascii_lowercase().as_str(), rest.is_empty()) {
            ("help", true) => ReplCommand::Help,
            ("settings", true) => ReplCommand::Settings,
            ("reset", true) => ReplCommand::Reset,
            ("accept", true) => ReplCommand::Accept,
            ("refine", true) => ReplCommand::Refine,
            ("exit" | "quit" | "q", true) => ReplCommand::Exit,
            ("info", false) => ReplCommand::Info(rest),
            ("open", false) => ReplCommand::Open(rest),
            _ => ReplCommand::Request(line),
        }
    }
}

/// Whether a confirmation answer means yes. Anything else declines.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
