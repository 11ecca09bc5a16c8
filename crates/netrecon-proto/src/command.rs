//! Commands sent to a device.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Answer supplied when a command triggers an interactive prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPrompt {
    /// Prompt text (or pattern) the device is expected to emit.
    pub prompt: String,
    /// Answer sent back when the prompt appears.
    pub answer: String,
}

/// A single command sent to a device.
///
/// Deserializes from either a bare string or a mapping:
///
/// ```yaml
/// commands:
///   - show version
///   - command: "clear counters"
///     prompt: "[confirm]"
///     answer: "y"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CommandSpec", into = "CommandSpec")]
pub struct Command {
    text: String,
    answer_prompt: Option<AnswerPrompt>,
}

impl Command {
    /// Creates a command with no prompt handling.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            answer_prompt: None,
        }
    }

    /// Attaches a prompt/answer pair to the command.
    pub fn with_answer(mut self, prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        self.answer_prompt = Some(AnswerPrompt {
            prompt: prompt.into(),
            answer: answer.into(),
        });
        self
    }

    /// The command text as sent to the device.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The prompt/answer pair, if any.
    pub fn answer_prompt(&self) -> Option<&AnswerPrompt> {
        self.answer_prompt.as_ref()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Wire form of a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CommandSpec {
    // Order matters for serde untagged - most specific first
    Interactive {
        command: String,
        prompt: String,
        answer: String,
    },
    Full {
        command: String,
    },
    Plain(String),
}

impl From<CommandSpec> for Command {
    fn from(spec: CommandSpec) -> Self {
        match spec {
            CommandSpec::Interactive {
                command,
                prompt,
                answer,
            } => Command::new(command).with_answer(prompt, answer),
            CommandSpec::Full { command } | CommandSpec::Plain(command) => Command::new(command),
        }
    }
}

impl From<Command> for CommandSpec {
    fn from(command: Command) -> Self {
        match command.answer_prompt {
            Some(AnswerPrompt { prompt, answer }) => CommandSpec::Interactive {
                command: command.text,
                prompt,
                answer,
            },
            None => CommandSpec::Plain(command.text),
        }
    }
}
