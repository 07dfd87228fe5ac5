//! Small actors built on the kernel, used by the `sluice` binary.

pub mod counter;
pub mod store;

pub use counter::{Counter, CounterMessage};
pub use store::{Change, Store, StoreMessage};
