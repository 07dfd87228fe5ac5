//! A registry of broadcast streams addressed by key.

use super::{Nozzle, Source};
use crate::kernel::{spawn, ActorError, AskPolicy, Behavior, Handle, Receiver, Recipient, Signal};
use async_trait::async_trait;
use std::{collections::HashMap, fmt, hash::Hash};

pub(crate) enum Spill<K, T: Send + 'static> {
    Acquire(K, Recipient<Source<T>>),
    Subscribe(K, Recipient<Nozzle<T>>),
    Dispatch(K, T),
    Close(K),
}

struct Spillway<K, T> {
    sources: HashMap<K, Source<T>>,
}

impl<K: Eq + Hash, T: Clone + Send + 'static> Spillway<K, T> {
    fn source_for(&mut self, key: K) -> &Source<T> {
        self.sources.entry(key).or_insert_with(Source::new)
    }
}

#[async_trait]
impl<K, T> Behavior for Spillway<K, T>
where
    K: Eq + Hash + Send + 'static,
    T: Clone + Send + 'static,
{
    type Message = Spill<K, T>;

    fn get_name(&self) -> String {
        "reservoir".to_owned()
    }

    async fn on_message(&mut self, message: Spill<K, T>) -> Signal {
        match message {
            Spill::Acquire(key, reply) => reply.tell(self.source_for(key).clone()),
            Spill::Subscribe(key, reply) => reply.tell(self.source_for(key).attach()),
            Spill::Dispatch(key, value) => match self.sources.get(&key) {
                Some(source) => source.next(value),
                None => log::trace!("Nothing registered under dispatched key"),
            },
            Spill::Close(key) => {
                if let Some(source) = self.sources.remove(&key) {
                    source.complete();
                }
            }
        }
        Signal::Running
    }
}

/// Lazily keeps one [Source] per key and routes values and closures by key.
///
/// Until a key is closed, every acquire or subscribe with it reaches the same
/// Source. Closing completes that Source, ending all its Nozzles; the next
/// acquire with the key starts an unrelated Source.
///
/// Dispatching to a key nobody acquired (or which was closed) does nothing.
pub struct Reservoir<K, T: Send + 'static> {
    handle: Handle<Spill<K, T>>,
    policy: AskPolicy,
}

impl<K, T: Send + 'static> Clone for Reservoir<K, T> {
    fn clone(&self) -> Self {
        Reservoir {
            handle: self.handle.clone(),
            policy: self.policy,
        }
    }
}

impl<K, T: Send + 'static> fmt::Debug for Reservoir<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservoir")
            .field("handle", &self.handle)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<K, T> Reservoir<K, T>
where
    K: Eq + Hash + Send + 'static,
    T: Clone + Send + 'static,
{
    pub fn new() -> Reservoir<K, T> {
        Reservoir::with_policy(AskPolicy::default())
    }

    /// A Reservoir bounding its acquire and subscribe calls with `policy`.
    pub fn with_policy(policy: AskPolicy) -> Reservoir<K, T> {
        Reservoir {
            handle: spawn(Spillway {
                sources: HashMap::new(),
            }),
            policy,
        }
    }

    /// The Source registered under `key`, created if there is none.
    pub async fn acquire(&self, key: K) -> Result<Source<T>, ActorError> {
        self.handle
            .ask(|reply| Spill::Acquire(key, reply), self.policy)
            .await
    }

    /// A Nozzle attached to the Source under `key`, which is created if there
    /// is none. The Nozzle detaches itself from the Source when it terminates.
    pub async fn subscribe(&self, key: K) -> Result<Nozzle<T>, ActorError> {
        self.handle
            .ask(|reply| Spill::Subscribe(key, reply), self.policy)
            .await
    }

    /// Broadcasts `value` on the Source under `key`, if there is one.
    pub fn dispatch(&self, key: K, value: T) {
        self.handle.tell(Spill::Dispatch(key, value))
    }

    /// Like [Reservoir::dispatch], waiting until the value was routed.
    pub async fn emit(&self, key: K, value: T) {
        Receiver::send(&self.handle, Spill::Dispatch(key, value)).await
    }

    /// Completes and forgets the Source under `key`.
    pub fn close(&self, key: K) {
        self.handle.tell(Spill::Close(key))
    }
}

impl<K, T> Default for Reservoir<K, T>
where
    K: Eq + Hash + Send + 'static,
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Reservoir::new()
    }
}
