/// Registered command tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Ai,
    Export,
}

impl CommandName {
    pub const ALL: [CommandName; 2] = [CommandName::Ai, CommandName::Export];

    /// Match a command token, ignoring case
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.as_str().eq_ignore_ascii_case(token))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::Ai => "ai",
            CommandName::Export => "export",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CommandName::Ai => "Ask the AI a question",
            CommandName::Export => "Export the message log as CSV",
        }
    }

    /// Usage line for the given command marker, e.g. `/ai <your question>`
    pub fn usage(&self, prefix: &str) -> String {
        match self {
            CommandName::Ai => format!("{}ai <your question>", prefix),
            CommandName::Export => format!("{}export", prefix),
        }
    }
}

/// A parsed command, consumed by its handler and then discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub name: CommandName,
    /// Remainder of the input after the token, trimmed. May be empty.
    pub argument: String,
}

impl CommandInvocation {
    pub fn new(name: CommandName, argument: impl Into<String>) -> Self {
        Self {
            name,
            argument: argument.into(),
        }
    }
}

/// Help text listing every registered command
pub fn command_list(prefix: &str) -> String {
    let mut help = "Available commands:\n".to_string();
    for cmd in CommandName::ALL {
        help.push_str(&format!("  {} - {}\n", cmd.usage(prefix), cmd.description()));
    }
    help
}
