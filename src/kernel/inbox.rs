//! Single-value holders used to capture replies.

use super::{receiver::lock, ActorError, AskPolicy, Receiver, Recipient};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::{
    sync::Notify,
    time::{self, Instant},
};

struct Slot<T> {
    value: Mutex<Option<T>>,
    arrived: Notify,
}

impl<T> Slot<T> {
    fn put(&self, value: T) {
        *lock(&self.value) = Some(value);
        self.arrived.notify_one();
    }

    fn take(&self) -> Option<T> {
        lock(&self.value).take()
    }
}

/// A one-value mailbox capturing the reply of an ask.
///
/// Writing to a full Inbox replaces the previous value; the last write is the
/// one a reader sees.
pub struct Inbox<T> {
    slot: Arc<Slot<T>>,
}

impl<T: Send + 'static> Inbox<T> {
    pub fn new() -> Inbox<T> {
        Inbox {
            slot: Arc::new(Slot {
                value: Mutex::new(None),
                arrived: Notify::new(),
            }),
        }
    }

    /// A [Recipient] writing into this Inbox.
    pub fn recipient(&self) -> Recipient<T> {
        Recipient::new(InboxReceiver {
            slot: Arc::clone(&self.slot),
        })
    }

    /// Takes the value out of the Inbox, if there is one.
    pub fn take(&self) -> Option<T> {
        self.slot.take()
    }

    /// Waits for a value until the bounds of the [AskPolicy] are exhausted.
    ///
    /// Every attempt checks the Inbox and then sleeps until either a value is
    /// written or the poll interval elapses. The poll interval is cut short
    /// so that a deadline is never overshot by more than scheduler slack.
    pub async fn wait(&self, policy: &AskPolicy) -> Result<T, ActorError> {
        let started = Instant::now();
        let mut attempts = 0;
        loop {
            if let Some(value) = self.take() {
                return Ok(value);
            }
            attempts += 1;

            let mut pause = policy.poll_interval();
            if let Some(deadline) = policy.deadline() {
                pause = pause.min(deadline.saturating_sub(started.elapsed()));
            }
            // Timing out here only ends the attempt
            let _ = time::timeout(pause, self.slot.arrived.notified()).await;

            if let Some(value) = self.take() {
                return Ok(value);
            }
            let elapsed = started.elapsed();
            let out_of_time = policy.deadline().map_or(false, |d| elapsed >= d);
            let out_of_attempts = policy.max_attempts().map_or(false, |m| attempts >= m);
            if out_of_time || out_of_attempts {
                return Err(ActorError::Timeout { attempts, elapsed });
            }
        }
    }
}

impl<T: Send + 'static> Default for Inbox<T> {
    fn default() -> Self {
        Inbox::new()
    }
}

/// The writing side of an [Inbox].
pub struct InboxReceiver<T> {
    slot: Arc<Slot<T>>,
}

#[async_trait]
impl<T: Send + 'static> Receiver<T> for InboxReceiver<T> {
    fn tell(&self, value: T) {
        self.slot.put(value)
    }

    async fn send(&self, value: T) {
        self.slot.put(value)
    }
}

/// A shared cell holding the latest value delivered to it.
///
/// Unlike an [Inbox], reading does not consume the value.
pub struct Capsule<T> {
    value: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Capsule<T> {
    fn clone(&self) -> Self {
        Capsule {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: Clone + Send + 'static> Capsule<T> {
    pub fn new() -> Capsule<T> {
        Capsule {
            value: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_value(value: T) -> Capsule<T> {
        Capsule {
            value: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// The latest value, or [ActorError::Idle] if nothing was ever delivered.
    pub fn get(&self) -> Result<T, ActorError> {
        lock(&self.value).clone().ok_or(ActorError::Idle)
    }

    pub fn set(&self, value: T) {
        *lock(&self.value) = Some(value);
    }

    pub fn recipient(&self) -> Recipient<T> {
        Recipient::new(self.clone())
    }
}

impl<T: Clone + Send + 'static> Default for Capsule<T> {
    fn default() -> Self {
        Capsule::new()
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> Receiver<T> for Capsule<T> {
    fn tell(&self, value: T) {
        self.set(value)
    }

    async fn send(&self, value: T) {
        self.set(value)
    }
}
