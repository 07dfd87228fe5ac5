//! The actor kernel: serialized message handling behind clone-able handles,
//! the destinations replies can be delivered to and the ask pattern built on
//! top of both.

mod ask;
mod behavior;
mod error;
mod inbox;
mod ports;
mod receiver;
mod signal;

pub use ask::*;
pub use behavior::*;
pub use error::*;
pub use inbox::*;
pub use ports::Handle;
pub use receiver::{ContinuationReceiver, Receiver, Recipient, TransformReceiver};
pub use signal::*;


#[cfg(test)]
mod test_behavior;
