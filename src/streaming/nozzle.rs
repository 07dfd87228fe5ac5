//! Cold, buffered, single-consumer streams.

use crate::kernel::{spawn, Behavior, Handle, Receiver, Signal};
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    fmt,
    future::{poll_fn, Future},
    pin::Pin,
    sync::atomic::{AtomicU64, Ordering},
    task::{Context, Poll},
};
use tokio::sync::oneshot;
use tokio_stream::Stream;

static NEXT_NOZZLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique identity of a [Nozzle].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NozzleId(u64);

impl NozzleId {
    fn next() -> NozzleId {
        NozzleId(NEXT_NOZZLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NozzleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nozzle-{}", self.0)
    }
}

type TerminationCallback = Box<dyn FnOnce() + Send>;

pub(crate) enum Flow<T> {
    Push(T),
    Close,
    Pull(oneshot::Sender<Option<T>>),
    OnTermination(TerminationCallback),
}

/// The actor behind a Nozzle.
///
/// Once `ended` is set the buffer only shrinks. Pullers are parked only while
/// the buffer is empty and the flow is still open.
struct Current<T> {
    id: NozzleId,
    buffer: VecDeque<T>,
    ended: bool,
    pullers: VecDeque<oneshot::Sender<Option<T>>>,
    on_termination: Vec<TerminationCallback>,
}

impl<T> Current<T> {
    fn new(id: NozzleId) -> Current<T> {
        Current {
            id,
            buffer: VecDeque::new(),
            ended: false,
            pullers: VecDeque::new(),
            on_termination: Vec::new(),
        }
    }

    fn push(&mut self, mut value: T) {
        if self.ended {
            log::trace!("{} is closed, dropping pushed value", self.id);
            return;
        }
        // A puller whose consumer went away hands the value back
        while let Some(puller) = self.pullers.pop_front() {
            match puller.send(Some(value)) {
                Ok(()) => return,
                Err(returned) => match returned {
                    Some(v) => value = v,
                    None => return,
                },
            }
        }
        self.buffer.push_back(value);
    }

    fn pull(&mut self, puller: oneshot::Sender<Option<T>>) {
        if let Some(value) = self.buffer.pop_front() {
            if let Err(Some(value)) = puller.send(Some(value)) {
                self.buffer.push_front(value);
            }
        } else if self.ended {
            let _ = puller.send(None);
        } else {
            self.pullers.push_back(puller);
        }
    }

    fn close(&mut self) {
        if self.ended {
            return;
        }
        log::debug!("{} closing with {} buffered values", self.id, self.buffer.len());
        self.ended = true;
        for puller in self.pullers.drain(..) {
            let _ = puller.send(None);
        }
        for callback in self.on_termination.drain(..) {
            callback();
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Behavior for Current<T> {
    type Message = Flow<T>;

    fn get_name(&self) -> String {
        self.id.to_string()
    }

    async fn on_message(&mut self, message: Flow<T>) -> Signal {
        match message {
            Flow::Push(value) => self.push(value),
            Flow::Close => self.close(),
            Flow::Pull(puller) => self.pull(puller),
            Flow::OnTermination(callback) => {
                if self.ended {
                    callback();
                } else {
                    self.on_termination.push(callback);
                }
            }
        }
        Signal::Running
    }
}

/// The producing side of a [Nozzle].
///
/// Pipes are clone-able; values pushed through clones used by one task arrive
/// in the order they were pushed. Nothing limits how many values may be
/// waiting in the buffer, so a producer outrunning its consumer makes the
/// buffer grow without bound.
pub struct Pipe<T> {
    id: NozzleId,
    handle: Handle<Flow<T>>,
}

impl<T> Clone for Pipe<T> {
    fn clone(&self) -> Self {
        Pipe {
            id: self.id,
            handle: self.handle.clone(),
        }
    }
}

impl<T> fmt::Debug for Pipe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pipe").field(&self.id).finish()
    }
}

impl<T: Send + 'static> Pipe<T> {
    pub fn id(&self) -> NozzleId {
        self.id
    }

    /// Appends a value to the buffer unless the Nozzle was closed.
    pub fn push(&self, value: T) {
        self.handle.tell(Flow::Push(value))
    }

    /// Like [Pipe::push] but waits until the value is buffered or handed to
    /// the consumer.
    pub async fn feed(&self, value: T) {
        Receiver::send(&self.handle, Flow::Push(value)).await
    }

    /// Ends the stream. Values already buffered can still be pulled. Closing
    /// more than once has no further effect.
    pub fn close(&self) {
        self.handle.tell(Flow::Close)
    }

    /// Like [Pipe::close] but waits until the termination callbacks ran.
    pub async fn finish(&self) {
        Receiver::send(&self.handle, Flow::Close).await
    }

    /// Registers a callback run once when the Nozzle is closed. Callbacks run
    /// in registration order; one registered after closing runs right away.
    pub fn on_termination(&self, callback: impl FnOnce() + Send + 'static) {
        self.handle.tell(Flow::OnTermination(Box::new(callback)))
    }

    fn pull(&self) -> oneshot::Receiver<Option<T>> {
        let (puller, receiver) = oneshot::channel();
        self.handle.tell(Flow::Pull(puller));
        receiver
    }
}

#[async_trait]
impl<T: Send + 'static> Receiver<T> for Pipe<T> {
    fn tell(&self, value: T) {
        self.push(value)
    }

    async fn send(&self, value: T) {
        self.feed(value).await
    }
}

/// A cold stream: values pushed before anyone pulls them are buffered.
///
/// A Nozzle is meant to have a single consumer. After the stream has been
/// closed the consumer still gets every buffered value before seeing the end
/// of the stream, and once the end has been reported every further pull
/// reports it again.
///
/// Dropping a Nozzle closes it.
pub struct Nozzle<T: Send + 'static> {
    pipe: Pipe<T>,
    pending: Option<oneshot::Receiver<Option<T>>>,
    exhausted: bool,
}

impl<T: Send + 'static> Nozzle<T> {
    /// Creates an open, empty Nozzle.
    pub fn new() -> Nozzle<T> {
        Nozzle::pair().0
    }

    /// Creates an open Nozzle together with a [Pipe] feeding it.
    pub fn pair() -> (Nozzle<T>, Pipe<T>) {
        let id = NozzleId::next();
        let pipe = Pipe {
            id,
            handle: spawn(Current::new(id)),
        };
        let nozzle = Nozzle {
            pipe: pipe.clone(),
            pending: None,
            exhausted: false,
        };
        (nozzle, pipe)
    }

    /// A Nozzle which is already over.
    pub fn empty() -> Nozzle<T> {
        let (nozzle, pipe) = Nozzle::pair();
        pipe.close();
        nozzle
    }

    /// A Nozzle yielding `value` and then ending.
    pub fn single(value: T) -> Nozzle<T> {
        Nozzle::of(std::iter::once(value))
    }

    /// A Nozzle yielding every item of `values` and then ending.
    pub fn of(values: impl IntoIterator<Item = T>) -> Nozzle<T> {
        let (nozzle, pipe) = Nozzle::pair();
        for value in values {
            pipe.push(value);
        }
        pipe.close();
        nozzle
    }

    /// A Nozzle fed by a producer task. The Nozzle is closed once the future
    /// returned by `producer` completes, if the producer didn't close it
    /// already.
    pub fn generate<F, Fut>(producer: F) -> Nozzle<T>
    where
        F: FnOnce(Pipe<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (nozzle, pipe) = Nozzle::pair();
        let production = producer(pipe.clone());
        tokio::spawn(async move {
            production.await;
            pipe.close();
        });
        nozzle
    }

    pub fn id(&self) -> NozzleId {
        self.pipe.id
    }

    /// Another producing side for this Nozzle.
    pub fn pipe(&self) -> Pipe<T> {
        self.pipe.clone()
    }

    pub fn push(&self, value: T) {
        self.pipe.push(value)
    }

    pub fn close(&self) {
        self.pipe.close()
    }

    /// Stops the stream from the consumer side. Calling it repeatedly is
    /// harmless.
    pub fn shutdown(&self) {
        self.pipe.close()
    }

    pub fn on_termination(&self, callback: impl FnOnce() + Send + 'static) {
        self.pipe.on_termination(callback)
    }

    /// Waits for the next value. Returns None once the Nozzle is closed and
    /// drained.
    ///
    /// Cancelling this future loses nothing: the pull stays registered and
    /// the next call picks up its value.
    pub async fn next(&mut self) -> Option<T> {
        poll_fn(|cx| self.poll_pull(cx)).await
    }

    fn poll_pull(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        if self.exhausted {
            return Poll::Ready(None);
        }
        let pipe = &self.pipe;
        let pending = self.pending.get_or_insert_with(|| pipe.pull());
        let pulled = match Pin::new(pending).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(pulled) => pulled,
        };
        self.pending = None;
        match pulled {
            Ok(Some(value)) => Poll::Ready(Some(value)),
            // A dead actor can't produce anything anymore either
            Ok(None) | Err(_) => {
                self.exhausted = true;
                Poll::Ready(None)
            }
        }
    }
}

impl<T: Send + 'static> Default for Nozzle<T> {
    fn default() -> Self {
        Nozzle::new()
    }
}

impl<T: Send + 'static> fmt::Debug for Nozzle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nozzle")
            .field("id", &self.pipe.id)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl<T: Send + 'static> Stream for Nozzle<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().poll_pull(cx)
    }
}

impl<T: Send + 'static> Drop for Nozzle<T> {
    fn drop(&mut self) {
        if !self.exhausted {
            self.pipe.close();
        }
    }
}
