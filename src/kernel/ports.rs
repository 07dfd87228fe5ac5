//! Basic primitives for talking to an actor running in a Tokio task.

use super::{ActorError, Recipient, TransformReceiver};
use std::{fmt, sync::Arc};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_stream::{Stream, StreamExt};

/// A message travelling through an actor's mailbox.
///
/// An Envelope sent with [Handle::send] carries a [oneshot] channel which the
/// worker loop resolves once it has decided what to do with the message
/// (handled it, ignored it or dropped it because the actor is stopped).
pub(crate) struct Envelope<M> {
    pub message: M,
    pub acknowledgement: Option<oneshot::Sender<()>>,
}

impl<M> Envelope<M> {
    /// Creates an Envelope together with the receiving end of its
    /// acknowledgement channel.
    pub fn acknowledged(message: M) -> (Envelope<M>, oneshot::Receiver<()>) {
        let (acknowledgement, receiver) = oneshot::channel();
        let envelope = Envelope {
            message,
            acknowledgement: Some(acknowledgement),
        };
        (envelope, receiver)
    }

    pub fn unacknowledged(message: M) -> Envelope<M> {
        Envelope {
            message,
            acknowledgement: None,
        }
    }
}

/// A reference to a running actor.
///
/// Handles are clone-able and cheap. Every clone routes into the same mailbox,
/// which is drained by exactly one worker task, so at most one message is
/// being handled for an actor at any instant no matter how many tasks hold a
/// Handle to it.
///
/// Messages sent by one caller through one Handle are processed in the order
/// they were sent. Nothing is guaranteed about the interleaving of messages
/// coming from different callers.
///
/// The mailbox is unbounded. A producer is never slowed down by a slow actor,
/// which means a flooded actor grows its queue without limit.
///
/// Once every Handle is dropped, the actor tears down and its task finishes.
pub struct Handle<M> {
    name: Arc<str>,
    message_sender: mpsc::UnboundedSender<Envelope<M>>,
}

// #[derive(Clone)] would only apply if M was Clone too.
impl<M> Clone for Handle<M> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            message_sender: self.message_sender.clone(),
        }
    }
}

impl<M> fmt::Debug for Handle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("name", &self.name)
            .field("closed", &self.message_sender.is_closed())
            .finish()
    }
}

impl<M: Send + 'static> Handle<M> {
    /// Creates a Handle together with the [Mailbox] its messages end up in.
    ///
    /// The Mailbox is moved into the actor's task while the Handle is returned
    /// to the caller.
    pub(crate) fn make(name: impl Into<Arc<str>>) -> (Handle<M>, Mailbox<M>) {
        let (message_sender, message_receiver) = mpsc::unbounded_channel();
        (
            Handle {
                name: name.into(),
                message_sender,
            },
            Mailbox { message_receiver },
        )
    }

    /// Name of the actor, as returned by its
    /// [get_name](super::Behavior::get_name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true when the actor's task is gone and messages can no longer
    /// be delivered.
    pub fn is_closed(&self) -> bool {
        self.message_sender.is_closed()
    }

    /// Enqueues a message and returns immediately, without waiting for it to
    /// be handled.
    pub fn tell(&self, message: M) {
        if self
            .message_sender
            .send(Envelope::unacknowledged(message))
            .is_err()
        {
            log::warn!("{} is gone, dropping message", self.name);
        }
    }

    /// Enqueues a message and waits until the actor is done with it.
    ///
    /// The wait ends once the handler returned, or once the message was
    /// discarded because the actor was ignoring messages or had stopped. An
    /// error means the actor's task died, either before or while handling the
    /// message.
    pub async fn send(&self, message: M) -> Result<(), ActorError> {
        let (envelope, acknowledgement) = Envelope::acknowledged(message);
        if self.message_sender.send(envelope).is_err() {
            return Err(self.fault());
        }
        acknowledgement.await.map_err(|_| self.fault())
    }

    /// A [Recipient] delivering straight into this actor's mailbox.
    pub fn recipient(&self) -> Recipient<M> {
        Recipient::new(self.clone())
    }

    /// A [Recipient] accepting values of another type, converting each one
    /// into a message of this actor before delivering it.
    pub fn recipient_with<T, F>(&self, transform: F) -> Recipient<T>
    where
        T: Send + 'static,
        F: Fn(T) -> M + Send + Sync + 'static,
    {
        Recipient::new(TransformReceiver::new(self.recipient(), transform))
    }

    /// Feeds every item of `stream` into the actor, waiting for each one to be
    /// handled before pulling the next, then sends `on_complete` if given.
    ///
    /// Feeding stops early if the actor dies.
    pub fn pipe_stream<S>(&self, stream: S, on_complete: Option<M>) -> JoinHandle<()>
    where
        S: Stream<Item = M> + Send + 'static,
    {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::pin!(stream);
            while let Some(message) = stream.next().await {
                if let Err(e) = handle.send(message).await {
                    log::error!("Stopped piping stream into {}: {}", handle.name, e);
                    return;
                }
            }
            if let Some(message) = on_complete {
                if let Err(e) = handle.send(message).await {
                    log::error!("{} did not receive stream completion: {}", handle.name, e);
                }
            }
        })
    }

    fn fault(&self) -> ActorError {
        ActorError::HandlerFault {
            actor: self.name.to_string(),
        }
    }
}

/// The receiving side of a [Handle].
///
/// Returns None from `recv` once every Handle has been dropped, which the
/// worker loop treats as the signal to tear the actor down.
#[derive(Debug)]
pub(crate) struct Mailbox<M> {
    message_receiver: mpsc::UnboundedReceiver<Envelope<M>>,
}

impl<M> Mailbox<M> {
    pub async fn recv(&mut self) -> Option<Envelope<M>> {
        self.message_receiver.recv().await
    }
}
