//! The disposition an actor declares for its next message.

/// Returned by [super::Behavior::on_message] to tell the worker loop what to
/// do with the message that comes after the one just handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Handle the next message normally.
    Running,

    /// Drop the next `n` messages without invoking the handler, then go back
    /// to [Signal::Running]. A count of zero is the same as `Running`.
    Ignoring(usize),

    /// Drop every future message. An actor never leaves this state.
    Stopped,
}

impl Signal {
    /// Ignore exactly the next message.
    pub fn ignore_next() -> Signal {
        Signal::Ignoring(1)
    }

    /// The signal in effect after one message was discarded in this state.
    pub(crate) fn after_skip(self) -> Signal {
        match self {
            Signal::Ignoring(n) if n > 1 => Signal::Ignoring(n - 1),
            Signal::Ignoring(_) => Signal::Running,
            other => other,
        }
    }

    /// Normalizes `Ignoring(0)` into `Running`.
    pub(crate) fn normalized(self) -> Signal {
        match self {
            Signal::Ignoring(0) => Signal::Running,
            other => other,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Signal::Stopped)
    }
}

impl Default for Signal {
    fn default() -> Self {
        Signal::Running
    }
}
