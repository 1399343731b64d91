use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Operating mode of a gate.
///
/// Exactly one mode holds at any time. The mode alone decides what happens to
/// a data message: forwarded, discarded, or buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    /// Data messages pass through unchanged.
    Open,

    /// Data messages are discarded.
    Closed,

    /// Data messages are buffered in the queue.
    Queueing,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Open => "open",
            Mode::Closed => "closed",
            Mode::Queueing => "queueing",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Mode::Open),
            "closed" => Ok(Mode::Closed),
            "queueing" => Ok(Mode::Queueing),
            _ => Err(TypesError::InvalidMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.as_str().to_string()
    }
}

/// Behavior of the `toggle` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ToggleMode {
    /// Open and Closed swap; no effect while queueing.
    #[default]
    Binary,

    /// Open moves to Queueing; Queueing releases the queue and opens; no
    /// effect while closed.
    Queue,
}

impl ToggleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleMode::Binary => "binary",
            ToggleMode::Queue => "queue",
        }
    }
}

impl FromStr for ToggleMode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "binary" | "open-close" => Ok(ToggleMode::Binary),
            "queue" | "queue-toggle" | "open-queue" => Ok(ToggleMode::Queue),
            _ => Err(TypesError::InvalidToggle(s.to_string())),
        }
    }
}

impl TryFrom<String> for ToggleMode {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ToggleMode> for String {
    fn from(toggle: ToggleMode) -> Self {
        toggle.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("OPEN".parse::<Mode>().unwrap(), Mode::Open);
        assert_eq!(" Closed ".parse::<Mode>().unwrap(), Mode::Closed);
        assert_eq!("queueing".parse::<Mode>().unwrap(), Mode::Queueing);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = "half-open".parse::<Mode>().unwrap_err();
        assert_eq!(err, TypesError::InvalidMode("half-open".into()));
    }

    #[test]
    fn mode_serializes_as_lowercase_string() {
        let json = serde_json::to_string(&Mode::Queueing).unwrap();
        assert_eq!(json, "\"queueing\"");
        let back: Mode = serde_json::from_str("\"Open\"").unwrap();
        assert_eq!(back, Mode::Open);
        assert!(serde_json::from_str::<Mode>("\"ajar\"").is_err());
    }

    #[test]
    fn toggle_accepts_aliases() {
        assert_eq!("queue-toggle".parse::<ToggleMode>().unwrap(), ToggleMode::Queue);
        assert_eq!("Binary".parse::<ToggleMode>().unwrap(), ToggleMode::Binary);
        assert!("sideways".parse::<ToggleMode>().is_err());
    }
}
