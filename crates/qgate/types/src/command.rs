use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypesError, TypesResult};

/// Operation requested by a control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Open,
    Close,
    Queue,
    Toggle,
    Trigger,
    Flush,
    Reset,
    Peek,
    Drop,
    Status,
    Default,
    Renege,
}

impl Command {
    pub const ALL: [Command; 12] = [
        Command::Open,
        Command::Close,
        Command::Queue,
        Command::Toggle,
        Command::Trigger,
        Command::Flush,
        Command::Reset,
        Command::Peek,
        Command::Drop,
        Command::Status,
        Command::Default,
        Command::Renege,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Open => "open",
            Command::Close => "close",
            Command::Queue => "queue",
            Command::Toggle => "toggle",
            Command::Trigger => "trigger",
            Command::Flush => "flush",
            Command::Reset => "reset",
            Command::Peek => "peek",
            Command::Drop => "drop",
            Command::Status => "status",
            Command::Default => "default",
            Command::Renege => "renege",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from command token to [`Command`].
///
/// Every token defaults to the command's own name. Tokens are matched
/// case-insensitively; [`CommandVocabulary::normalize`] lowercases them once
/// at configuration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandVocabulary {
    pub open: String,
    pub close: String,
    pub queue: String,
    pub toggle: String,
    pub trigger: String,
    pub flush: String,
    pub reset: String,
    pub peek: String,
    pub drop: String,
    pub status: String,
    pub default: String,
    pub renege: String,
}

impl Default for CommandVocabulary {
    fn default() -> Self {
        Self {
            open: Command::Open.as_str().into(),
            close: Command::Close.as_str().into(),
            queue: Command::Queue.as_str().into(),
            toggle: Command::Toggle.as_str().into(),
            trigger: Command::Trigger.as_str().into(),
            flush: Command::Flush.as_str().into(),
            reset: Command::Reset.as_str().into(),
            peek: Command::Peek.as_str().into(),
            drop: Command::Drop.as_str().into(),
            status: Command::Status.as_str().into(),
            default: Command::Default.as_str().into(),
            renege: Command::Renege.as_str().into(),
        }
    }
}

impl CommandVocabulary {
    /// Token configured for `command`.
    pub fn token(&self, command: Command) -> &str {
        match command {
            Command::Open => &self.open,
            Command::Close => &self.close,
            Command::Queue => &self.queue,
            Command::Toggle => &self.toggle,
            Command::Trigger => &self.trigger,
            Command::Flush => &self.flush,
            Command::Reset => &self.reset,
            Command::Peek => &self.peek,
            Command::Drop => &self.drop,
            Command::Status => &self.status,
            Command::Default => &self.default,
            Command::Renege => &self.renege,
        }
    }

    /// Resolve an incoming payload token. When two commands share a token the
    /// first in [`Command::ALL`] order wins.
    pub fn resolve(&self, token: &str) -> Option<Command> {
        let token = token.trim().to_lowercase();
        Command::ALL
            .into_iter()
            .find(|command| self.token(*command).to_lowercase() == token)
    }

    /// Lowercase every token and reject empty ones.
    pub fn normalize(&mut self) -> TypesResult<()> {
        for command in Command::ALL {
            let slot = self.token_mut(command);
            let normalized = slot.trim().to_lowercase();
            if normalized.is_empty() {
                return Err(TypesError::InvalidConfig(format!(
                    "command token for {} is empty",
                    command
                )));
            }
            *slot = normalized;
        }
        Ok(())
    }

    fn token_mut(&mut self, command: Command) -> &mut String {
        match command {
            Command::Open => &mut self.open,
            Command::Close => &mut self.close,
            Command::Queue => &mut self.queue,
            Command::Toggle => &mut self.toggle,
            Command::Trigger => &mut self.trigger,
            Command::Flush => &mut self.flush,
            Command::Reset => &mut self.reset,
            Command::Peek => &mut self.peek,
            Command::Drop => &mut self.drop,
            Command::Status => &mut self.status,
            Command::Default => &mut self.default,
            Command::Renege => &mut self.renege,
        }
    }
}
