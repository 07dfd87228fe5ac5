use crate::kernel::{Behavior, Recipient, Signal};
use anyhow::Result;
use async_trait::async_trait;

pub enum CounterMessage {
    Increment(u64),
    Reset,
    Total(Recipient<u64>),
    /// Stop counting. Everything sent afterwards is dropped.
    Stop,
}

/// Keeps a running total of the increments it is told about.
pub struct Counter {
    name: String,
    total: u64,
}

impl Counter {
    pub fn new(name: impl Into<String>) -> Counter {
        Counter {
            name: name.into(),
            total: 0,
        }
    }
}

#[async_trait]
impl Behavior for Counter {
    type Message = CounterMessage;

    fn get_name(&self) -> String {
        self.name.clone()
    }

    async fn on_message(&mut self, message: CounterMessage) -> Signal {
        match message {
            CounterMessage::Increment(by) => self.total = self.total.saturating_add(by),
            CounterMessage::Reset => self.total = 0,
            CounterMessage::Total(reply) => reply.tell(self.total),
            CounterMessage::Stop => return Signal::Stopped,
        }
        Signal::Running
    }

    async fn tear_down(&mut self) -> Result<()> {
        log::info!("{} finished at {}", self.name, self.total);
        Ok(())
    }
}
