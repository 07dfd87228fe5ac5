//! Streams built out of actors: the cold, single-consumer [Nozzle], the hot,
//! broadcasting [Source] and the key-addressed [Reservoir] of Sources.
//!
//! None of these apply backpressure. A producer is never slowed down, and a
//! Nozzle nobody reads from buffers everything it is given.

mod nozzle;
mod reservoir;
mod source;

pub use nozzle::{Nozzle, NozzleId, Pipe};
pub use reservoir::Reservoir;
pub use source::{Jet, Source};


#[cfg(test)]
mod test_reservoir;

#[cfg(test)]
mod test_source;
