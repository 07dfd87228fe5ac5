//! Hot, broadcasting streams.

use super::{Nozzle, NozzleId, Pipe};
use crate::kernel::{spawn, Behavior, Handle, Receiver, Recipient, Signal};
use async_trait::async_trait;
use std::{collections::HashMap, fmt};
use tokio_stream::{Stream, StreamExt};

pub(crate) enum Supply<T> {
    Next(T),
    Complete,
    Attach(Pipe<T>),
    Detach(NozzleId),
    #[cfg(test)]
    Subscribers(Recipient<usize>),
}

struct Distributor<T> {
    subscribers: HashMap<NozzleId, Pipe<T>>,
    closed: bool,
}

#[async_trait]
impl<T: Clone + Send + 'static> Behavior for Distributor<T> {
    type Message = Supply<T>;

    fn get_name(&self) -> String {
        "source".to_owned()
    }

    async fn on_message(&mut self, message: Supply<T>) -> Signal {
        match message {
            Supply::Next(value) => {
                if self.closed {
                    log::trace!("Source is complete, dropping value");
                } else {
                    for pipe in self.subscribers.values() {
                        pipe.push(value.clone());
                    }
                }
            }
            Supply::Complete => {
                if !self.closed {
                    log::debug!("Source completing {} subscribers", self.subscribers.len());
                    self.closed = true;
                    for (_, pipe) in self.subscribers.drain() {
                        pipe.close();
                    }
                }
            }
            Supply::Attach(pipe) => {
                if self.closed {
                    pipe.close();
                } else {
                    self.subscribers.insert(pipe.id(), pipe);
                }
            }
            Supply::Detach(id) => {
                if self.subscribers.remove(&id).is_some() {
                    log::trace!("{} detached from source", id);
                }
            }
            #[cfg(test)]
            Supply::Subscribers(reply) => reply.tell(self.subscribers.len()),
        }
        Signal::Running
    }
}

/// A hot stream broadcasting every value to the [Nozzle]s attached to it.
///
/// Values are not retained: a Nozzle only sees what was broadcast after it
/// got attached. Every attached Nozzle receives the same values in the same
/// order, since broadcasting happens inside the Source's own serialized
/// handler.
///
/// Attaching is serialized with broadcasting too. An attach racing with a
/// broadcast from another task is resolved by the order in which the Source
/// happens to receive the two, which need not match the order in which they
/// were issued from the attaching task's point of view.
///
/// Once completed, the Source stays completed: later values are dropped and
/// later attaches get an already terminated Nozzle.
pub struct Source<T> {
    handle: Handle<Supply<T>>,
}

/// Another name for [Source].
pub type Jet<T> = Source<T>;

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Source {
            handle: self.handle.clone(),
        }
    }
}

impl<T> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Source").field(&self.handle).finish()
    }
}

impl<T: Clone + Send + 'static> Source<T> {
    pub fn new() -> Source<T> {
        Source {
            handle: spawn(Distributor {
                subscribers: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// A Source broadcasting every item of `stream`, completed once the
    /// stream ends.
    pub fn upstream<S>(stream: S) -> Source<T>
    where
        S: Stream<Item = T> + Send + 'static,
    {
        let source = Source::new();
        source
            .handle
            .pipe_stream(stream.map(Supply::Next), Some(Supply::Complete));
        source
    }

    /// Creates a Nozzle receiving every value broadcast from now on.
    ///
    /// The Nozzle is detached automatically once it terminates.
    pub fn attach(&self) -> Nozzle<T> {
        let (nozzle, pipe) = Nozzle::pair();
        let id = nozzle.id();
        let source = self.handle.clone();
        self.handle.tell(Supply::Attach(pipe.clone()));
        pipe.on_termination(move || source.tell(Supply::Detach(id)));
        nozzle
    }

    /// Stops broadcasting to a Nozzle. The Nozzle itself is left open.
    pub fn detach(&self, id: NozzleId) {
        self.handle.tell(Supply::Detach(id))
    }

    /// Broadcasts a value without waiting.
    pub fn next(&self, value: T) {
        self.handle.tell(Supply::Next(value))
    }

    /// Broadcasts a value, waiting until it was handed to every Nozzle.
    pub async fn emit(&self, value: T) {
        Receiver::send(&self.handle, Supply::Next(value)).await
    }

    /// Ends every attached Nozzle and the Source itself.
    pub fn complete(&self) {
        self.handle.tell(Supply::Complete)
    }

    /// Like [Source::complete], waiting until every Nozzle was told.
    pub async fn end(&self) {
        Receiver::send(&self.handle, Supply::Complete).await
    }

    #[cfg(test)]
    pub(crate) async fn subscriber_count(&self) -> usize {
        self.handle
            .request(Supply::Subscribers)
            .await
            .unwrap_or(usize::MAX)
    }

    /// A [Recipient] broadcasting whatever it is given.
    pub fn recipient(&self) -> Recipient<T> {
        self.handle.recipient_with(Supply::Next)
    }
}

impl<T: Clone + Send + 'static> Default for Source<T> {
    fn default() -> Self {
        Source::new()
    }
}
