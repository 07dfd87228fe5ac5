//! A key-value store actor announcing every change it makes.

use crate::{
    kernel::{Behavior, Recipient, Signal},
    streaming::Reservoir,
};
use async_trait::async_trait;
use std::{collections::HashMap, fmt};

pub enum StoreMessage {
    /// Sets `key` to `item`, creating it if needed.
    Update { key: String, item: String },
    /// Stores `item` under a freshly generated key, which is replied.
    Insert { item: String, reply: Recipient<String> },
    Get { key: String, reply: Recipient<Option<String>> },
    /// Replies every item, least recently written first.
    GetAll(Recipient<Vec<String>>),
    Delete { key: String },
}

impl fmt::Display for StoreMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreMessage::Update { key, item } => write!(f, "PUT {} -> {:?}", key, item),
            StoreMessage::Insert { item, .. } => write!(f, "POST {:?}", item),
            StoreMessage::Get { key, .. } => write!(f, "GET {}", key),
            StoreMessage::GetAll(_) => write!(f, "GET *"),
            StoreMessage::Delete { key } => write!(f, "DELETE {}", key),
        }
    }
}

/// What happened to a key, as seen by its watchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Stored(String),
    Deleted,
}

pub struct Store {
    storage: HashMap<String, (String, u64)>,
    writes: u64,
    changes: Reservoir<String, Change>,
}

impl Store {
    /// A Store dispatching its [Change]s into `changes`, keyed by the key
    /// that changed. A key's stream is closed after it is deleted.
    pub fn new(changes: Reservoir<String, Change>) -> Store {
        Store {
            storage: HashMap::new(),
            writes: 0,
            changes,
        }
    }

    fn write(&mut self, key: String, item: String) {
        self.writes += 1;
        self.changes.dispatch(key.clone(), Change::Stored(item.clone()));
        self.storage.insert(key, (item, self.writes));
    }

    fn fresh_key(&self) -> String {
        let mut n = self.writes + 1;
        while self.storage.contains_key(&format!("item-{}", n)) {
            n += 1;
        }
        format!("item-{}", n)
    }
}

#[async_trait]
impl Behavior for Store {
    type Message = StoreMessage;

    fn get_name(&self) -> String {
        "store".to_owned()
    }

    async fn on_message(&mut self, message: StoreMessage) -> Signal {
        log::debug!("store received {}", message);
        match message {
            StoreMessage::Update { key, item } => self.write(key, item),
            StoreMessage::Insert { item, reply } => {
                let key = self.fresh_key();
                self.write(key.clone(), item);
                reply.tell(key);
            }
            StoreMessage::Get { key, reply } => {
                reply.tell(self.storage.get(&key).map(|(item, _)| item.clone()))
            }
            StoreMessage::GetAll(reply) => {
                let mut entries: Vec<_> = self.storage.values().collect();
                entries.sort_by_key(|(_, written)| *written);
                reply.tell(entries.into_iter().map(|(item, _)| item.clone()).collect());
            }
            StoreMessage::Delete { key } => {
                if self.storage.remove(&key).is_some() {
                    self.changes.dispatch(key.clone(), Change::Deleted);
                    self.changes.close(key);
                }
            }
        }
        Signal::Running
    }
}
