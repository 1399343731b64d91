//! Disposition of data messages.

use qgate_types::Mode;

/// What happens to a data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Forward unchanged, immediately.
    Forward,

    /// Drop silently.
    Discard,

    /// Offer to the queue.
    Enqueue,
}

/// Route a data message according to the current mode.
pub fn route(mode: Mode) -> Disposition {
    match mode {
        Mode::Open => Disposition::Forward,
        Mode::Closed => Disposition::Discard,
        Mode::Queueing => Disposition::Enqueue,
    }
}
