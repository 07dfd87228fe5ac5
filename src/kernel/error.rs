use std::time::Duration;
use thiserror::Error;

/// An error occuring while exchanging messages with an actor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActorError {
    /// The ask bound was exhausted without a reply arriving.
    #[error("no reply after {attempts} attempts in {elapsed:?}")]
    Timeout { attempts: usize, elapsed: Duration },

    /// A value was requested before anything was ever delivered.
    #[error("no value has been produced yet")]
    Idle,

    /// The requester stopped waiting for the reply before it arrived.
    #[error("request was cancelled before a reply arrived")]
    Cancelled,

    /// The actor's handler failed and the actor can make no further progress.
    #[error("message handler of {actor} failed")]
    HandlerFault { actor: String },
}

impl ActorError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ActorError::Timeout { .. })
    }
}
