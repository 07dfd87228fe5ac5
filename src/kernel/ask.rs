//! The initiator side of the request-reply protocol.

use super::{ActorError, Handle, Inbox, Recipient};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::task::JoinHandle;

const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Bounds how long an ask waits for its reply.
///
/// A policy has a wall-clock deadline, a retry budget, or both, in which case
/// whichever runs out first ends the wait. There is no way to build a policy
/// without any bound.
///
/// A retry budget of `n` allows `n + 1` attempts. Each attempt waits at most
/// one poll interval for the reply to show up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AskPolicy {
    deadline: Option<Duration>,
    retries: Option<usize>,
    poll_interval: Duration,
}

impl AskPolicy {
    /// Give up once `deadline` has elapsed.
    pub fn timeout(deadline: Duration) -> AskPolicy {
        AskPolicy {
            deadline: Some(deadline),
            retries: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Give up after `retries + 1` attempts.
    pub fn retry(retries: usize) -> AskPolicy {
        AskPolicy {
            deadline: None,
            retries: Some(retries),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn and_timeout(self, deadline: Duration) -> AskPolicy {
        AskPolicy {
            deadline: Some(deadline),
            ..self
        }
    }

    pub fn and_retry(self, retries: usize) -> AskPolicy {
        AskPolicy {
            retries: Some(retries),
            ..self
        }
    }

    pub fn poll_every(self, poll_interval: Duration) -> AskPolicy {
        AskPolicy {
            poll_interval,
            ..self
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn retry_budget(&self) -> Option<usize> {
        self.retries
    }

    pub fn max_attempts(&self) -> Option<usize> {
        self.retries.map(|r| r.saturating_add(1))
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for AskPolicy {
    fn default() -> Self {
        AskPolicy::timeout(DEFAULT_DEADLINE)
    }
}

impl<M: Send + 'static> Handle<M> {
    /// Sends the message built by `build` and waits for the reply it
    /// triggers.
    ///
    /// `build` gets a fresh [Recipient] the actor is expected to deliver its
    /// reply to. The message is sent with [Handle::tell], so nothing is known
    /// about it being processed: if the actor never replies (because it is
    /// stopped, ignoring messages or simply chose not to), the ask fails with
    /// [ActorError::Timeout] once the policy is exhausted. The actor is never
    /// told that the requester gave up, and a late reply is lost.
    pub async fn ask<R, F>(&self, build: F, policy: AskPolicy) -> Result<R, ActorError>
    where
        R: Send + 'static,
        F: FnOnce(Recipient<R>) -> M,
    {
        let inbox = Inbox::new();
        self.tell(build(inbox.recipient()));
        let result = inbox.wait(&policy).await;
        if let Err(e) = &result {
            log::debug!("Ask to {} failed: {}", self.name(), e);
        }
        result
    }

    /// [Handle::ask] with the default policy.
    pub async fn request<R, F>(&self, build: F) -> Result<R, ActorError>
    where
        R: Send + 'static,
        F: FnOnce(Recipient<R>) -> M,
    {
        self.ask(build, AskPolicy::default()).await
    }

    /// Starts an ask in the background and returns immediately.
    ///
    /// The message is built and told right away, on the caller's side, so a
    /// panic in `build` unwinds the caller. Only the wait for the reply runs
    /// in the background. The returned [Deferred] can be awaited later for
    /// the outcome.
    pub fn query<R, F>(&self, build: F, policy: AskPolicy) -> Deferred<R>
    where
        R: Send + 'static,
        F: FnOnce(Recipient<R>) -> M,
    {
        let inbox = Inbox::new();
        self.tell(build(inbox.recipient()));
        let actor = self.name().to_owned();
        let waiting_for = actor.clone();
        Deferred {
            actor,
            task: tokio::spawn(async move {
                let result = inbox.wait(&policy).await;
                if let Err(e) = &result {
                    log::debug!("Query to {} failed: {}", waiting_for, e);
                }
                result
            }),
        }
    }
}

/// The pending outcome of a [Handle::query].
#[derive(Debug)]
pub struct Deferred<R> {
    actor: String,
    task: JoinHandle<Result<R, ActorError>>,
}

impl<R> Deferred<R> {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Gives up on the reply. Awaiting afterwards yields
    /// [ActorError::Cancelled]; the actor is not told and may still reply.
    pub fn abort(&self) {
        self.task.abort()
    }
}

impl<R> Future for Deferred<R> {
    type Output = Result<R, ActorError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_cancelled() => {
                log::debug!("Query to {} was cancelled", self.actor);
                Poll::Ready(Err(ActorError::Cancelled))
            }
            Poll::Ready(Err(e)) => {
                log::error!("Waiting for {} failed: {}", self.actor, e);
                Poll::Ready(Err(ActorError::Cancelled))
            }
        }
    }
}
