use serde::{Deserialize, Serialize};

use crate::config::Capacity;
use crate::mode::Mode;

/// Indicator shape shown by a status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusShape {
    /// Solid: open, closed, or a queue at capacity.
    Dot,

    /// Hollow: queueing with headroom.
    Ring,
}

/// Indicator color shown by a status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFill {
    Green,
    Red,
    Yellow,
}

/// Status descriptor published after every event that can change the mode
/// or the queue length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStatus {
    pub mode: Mode,
    pub shape: StatusShape,
    pub fill: StatusFill,
    pub text: String,
    pub queue_len: usize,
}

impl GateStatus {
    /// Derive the descriptor for a mode and queue length.
    pub fn derive(mode: Mode, queue_len: usize, capacity: Capacity) -> Self {
        match mode {
            Mode::Open => Self {
                mode,
                shape: StatusShape::Dot,
                fill: StatusFill::Green,
                text: "open".to_string(),
                queue_len,
            },
            Mode::Closed => Self {
                mode,
                shape: StatusShape::Dot,
                fill: StatusFill::Red,
                text: "closed".to_string(),
                queue_len,
            },
            Mode::Queueing => Self {
                mode,
                shape: if capacity.has_headroom(queue_len) {
                    StatusShape::Ring
                } else {
                    StatusShape::Dot
                },
                fill: StatusFill::Yellow,
                text: format!("queuing: {}", queue_len),
                queue_len,
            },
        }
    }

    /// Whether the queue could still accept a message without overflow.
    pub fn has_headroom(&self) -> bool {
        self.shape == StatusShape::Ring
    }
}
