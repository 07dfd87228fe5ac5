//! Actors on top of Tokio tasks, and streams built out of them.
//!
//! An actor is a [Behavior] running in its own task, reachable through a
//! clone-able [Handle]. Messages are handled one at a time in the order each
//! sender sent them. Replies travel through [Recipient]s, which is what the
//! ask pattern ([Handle::ask]) is built on.
//!
//! The [streaming] module uses actors to provide buffered single-consumer
//! streams ([Nozzle]), broadcasting streams ([Source]) and keyed collections
//! of the latter ([Reservoir]).

pub mod bridge;
pub mod config;
pub mod kernel;
pub mod samples;
pub mod streaming;

pub use kernel::*;
pub use streaming::*;
