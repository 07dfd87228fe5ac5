//! Destinations values can be delivered to.

use super::Handle;
use async_trait::async_trait;
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::oneshot;

/// Anything accepting values of type `T`.
///
/// `tell` hands the value over without waiting, `send` waits until the
/// destination has accepted it. Neither reports failure: a destination which
/// is gone simply never sees the value, which gets logged.
#[async_trait]
pub trait Receiver<T: Send + 'static>: Send + Sync {
    fn tell(&self, value: T);

    async fn send(&self, value: T);
}

#[async_trait]
impl<M: Send + 'static> Receiver<M> for Handle<M> {
    fn tell(&self, value: M) {
        Handle::tell(self, value)
    }

    async fn send(&self, value: M) {
        if let Err(e) = Handle::send(self, value).await {
            log::warn!("{} did not accept value: {}", self.name(), e);
        }
    }
}

/// A clone-able, type-erased [Receiver].
///
/// This is what request builders of the ask pattern get handed, so an actor
/// can reply without knowing whether it talks to another actor, an inbox or a
/// plain task.
pub struct Recipient<T>(Arc<dyn Receiver<T>>);

impl<T> Clone for Recipient<T> {
    fn clone(&self) -> Self {
        Recipient(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Recipient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Recipient")
    }
}

impl<T: Send + 'static> Recipient<T> {
    pub fn new(receiver: impl Receiver<T> + 'static) -> Recipient<T> {
        Recipient(Arc::new(receiver))
    }

    pub fn tell(&self, value: T) {
        self.0.tell(value)
    }

    pub async fn send(&self, value: T) {
        self.0.send(value).await
    }

    /// Accept values of another type, converting them before delivery.
    pub fn map<U, F>(self, transform: F) -> Recipient<U>
    where
        U: Send + 'static,
        F: Fn(U) -> T + Send + Sync + 'static,
    {
        Recipient::new(TransformReceiver::new(self, transform))
    }
}

#[async_trait]
impl<T: Send + 'static> Receiver<T> for Recipient<T> {
    fn tell(&self, value: T) {
        self.0.tell(value)
    }

    async fn send(&self, value: T) {
        self.0.send(value).await
    }
}

/// Converts values with a pure function before passing them on.
pub struct TransformReceiver<U, T> {
    inner: Recipient<T>,
    transform: Box<dyn Fn(U) -> T + Send + Sync>,
}

impl<U, T> TransformReceiver<U, T> {
    pub fn new<F>(inner: Recipient<T>, transform: F) -> Self
    where
        F: Fn(U) -> T + Send + Sync + 'static,
    {
        TransformReceiver {
            inner,
            transform: Box::new(transform),
        }
    }
}

#[async_trait]
impl<U, T> Receiver<U> for TransformReceiver<U, T>
where
    U: Send + 'static,
    T: Send + 'static,
{
    fn tell(&self, value: U) {
        self.inner.tell((self.transform)(value))
    }

    async fn send(&self, value: U) {
        let converted = (self.transform)(value);
        self.inner.send(converted).await
    }
}

/// Resumes a waiting task with the first value it receives.
///
/// Only the first delivery counts. Later ones are logged and dropped; code
/// must not rely on delivering twice.
pub struct ContinuationReceiver<T> {
    continuation: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T: Send + 'static> ContinuationReceiver<T> {
    /// Creates the receiver together with the [oneshot::Receiver] the
    /// waiting task awaits.
    pub fn new() -> (ContinuationReceiver<T>, oneshot::Receiver<T>) {
        let (sender, receiver) = oneshot::channel();
        (
            ContinuationReceiver {
                continuation: Mutex::new(Some(sender)),
            },
            receiver,
        )
    }

    fn resume(&self, value: T) {
        match lock(&self.continuation).take() {
            Some(sender) => {
                if sender.send(value).is_err() {
                    log::debug!("Continuation dropped before being resumed");
                }
            }
            None => log::warn!("Continuation resumed twice, dropping value"),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Receiver<T> for ContinuationReceiver<T> {
    fn tell(&self, value: T) {
        self.resume(value)
    }

    async fn send(&self, value: T) {
        self.resume(value)
    }
}

/// Locks a mutex guarding plain data. A panic while holding one of these locks
/// cannot leave the data half-updated, so poisoning is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
