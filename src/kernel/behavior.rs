//! Behavior abstraction on top of [super::ports]

use super::{ports::Mailbox, Handle, Signal};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::marker::PhantomData;
use tokio::sync::oneshot;

/// A trait which allows you to write actors in a structured way. Actors run in
/// Tokio tasks and have three lifecycle phases.
///
/// Initialization occurs first, inside the actor's task, before the first
/// message is handled. [spawn_checked] doesn't return until it has finished.
///
/// Then, in handling phase, `on_message` is invoked for each message sent to
/// the [Handle], one at a time. The returned [Signal] decides the fate of the
/// next message.
///
/// The teardown phase is entered once the actor returns [Signal::Stopped] or
/// once every [Handle] to it is dropped, whichever comes first. It runs at
/// most once.
///
/// # Examples
///
/// ```rust
/// use sluice::{Behavior, Signal};
/// use async_trait::async_trait;
///
/// struct Tally {
///     seen: usize,
///     limit: usize,
/// }
///
/// #[async_trait]
/// impl Behavior for Tally {
///     type Message = ();
///
///     fn get_name(&self) -> String {
///         "tally".to_owned()
///     }
///
///     async fn on_message(&mut self, _: ()) -> Signal {
///         self.seen += 1;
///         if self.seen == self.limit {
///             Signal::Stopped
///         } else {
///             Signal::Running
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Behavior: Send + 'static {
    /// Type of the messages this actor accepts.
    type Message: Send + 'static;

    /// Returns the name of the actor, which is used in logging messages
    fn get_name(&self) -> String;

    /// Handle a single message and decide what happens to the next one.
    async fn on_message(&mut self, message: Self::Message) -> Signal;

    /// Performs initialization tasks.
    ///
    /// An error in this method makes the actor behave as if it was stopped
    /// and, for actors started with [spawn_checked], is returned to the
    /// spawner. Default implementation just returns `Ok(())`
    async fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Perform teardown / cleanup tasks.
    ///
    /// Since this method is invoked at a non-deterministic time, the errors
    /// are only logged, nothing else is done with them.
    async fn tear_down(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Starts a task for the given [Behavior] and returns a [Handle] to it right
/// away.
///
/// Must be called from within a Tokio runtime.
pub fn spawn<B: Behavior>(behavior: B) -> Handle<B::Message> {
    let name = behavior.get_name();
    log::debug!("{} spawning", name);
    let (handle, mailbox) = Handle::make(name);
    tokio::spawn(run(behavior, mailbox, None));
    handle
}

/// Starts a task for the given [Behavior], waiting for its initialization to
/// be done before returning the [Handle]. If initialization fails, an error is
/// returned instead.
pub async fn spawn_checked<B: Behavior>(behavior: B) -> Result<Handle<B::Message>> {
    let name = behavior.get_name();
    log::debug!("{} spawning", name);
    let (handle, mailbox) = Handle::make(name.as_str());
    let (initialization_sender, initialization_receiver) = oneshot::channel::<Result<()>>();
    tokio::spawn(run(behavior, mailbox, Some(initialization_sender)));

    match initialization_receiver.await {
        Ok(Ok(_)) => Ok(handle),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(anyhow!(e).context(format!("{} died during initialization", name))),
    }
}

/// Spawns an actor made of a piece of state and a handler function.
pub fn spawn_fn<S, M, F>(name: impl Into<String>, state: S, handler: F) -> Handle<M>
where
    S: Send + 'static,
    M: Send + 'static,
    F: FnMut(&mut S, M) -> Signal + Send + 'static,
{
    spawn(FnBehavior::new(name, state, handler))
}

/// The worker loop. Owns the behavior, so handler invocations can never
/// overlap.
async fn run<B: Behavior>(
    mut behavior: B,
    mut mailbox: Mailbox<B::Message>,
    initialization_sender: Option<oneshot::Sender<Result<()>>>,
) {
    let name = behavior.get_name();
    let mut signal = Signal::Running;
    let mut torn_down = false;

    let init_result = behavior.initialize().await;
    match &init_result {
        Ok(_) => log::info!("{} initialized successfully", name),
        Err(e) => {
            log::error!("Error initializing {}: {}", name, e);
            signal = Signal::Stopped;
            torn_down = true;
        }
    }
    if let Some(sender) = initialization_sender {
        if sender.send(init_result).is_err() {
            log::debug!("{} spawner went away before initialization finished", name);
        }
    }

    while let Some(envelope) = mailbox.recv().await {
        match signal {
            Signal::Running => {
                signal = behavior.on_message(envelope.message).await.normalized();
                if signal.is_stopped() {
                    log::debug!("{} stopping", name);
                    tear_down(&mut behavior, &name).await;
                    torn_down = true;
                }
            }
            Signal::Ignoring(remaining) => {
                log::trace!("{} ignoring message, {} left", name, remaining - 1);
                signal = signal.after_skip();
            }
            Signal::Stopped => log::trace!("{} is stopped, dropping message", name),
        }
        if let Some(acknowledgement) = envelope.acknowledgement {
            if acknowledgement.send(()).is_err() {
                log::trace!("{} finished a message nobody waits for anymore", name);
            }
        }
    }

    if !torn_down {
        log::debug!("{} stopping", name);
        tear_down(&mut behavior, &name).await;
    }
    log::debug!("{} stopped", name);
}

async fn tear_down<B: Behavior>(behavior: &mut B, name: &str) {
    if let Err(e) = behavior.tear_down().await {
        log::error!("{} failed to tear down: {}", name, e);
    }
}

/// A [Behavior] assembled from a piece of state and a function handling
/// messages against it.
pub struct FnBehavior<S, M, F> {
    name: String,
    state: S,
    handler: F,
    _message: PhantomData<fn(M)>,
}

impl<S, M, F> FnBehavior<S, M, F>
where
    F: FnMut(&mut S, M) -> Signal,
{
    pub fn new(name: impl Into<String>, state: S, handler: F) -> Self {
        FnBehavior {
            name: name.into(),
            state,
            handler,
            _message: PhantomData,
        }
    }
}

#[async_trait]
impl<S, M, F> Behavior for FnBehavior<S, M, F>
where
    S: Send + 'static,
    M: Send + 'static,
    F: FnMut(&mut S, M) -> Signal + Send + 'static,
{
    type Message = M;

    fn get_name(&self) -> String {
        self.name.clone()
    }

    async fn on_message(&mut self, message: M) -> Signal {
        (self.handler)(&mut self.state, message)
    }
}
