//! Channel module: Bounded MPMC Channel
//!
//! Menyusun `CircularBuffer` (storage) dengan dua `Event` (parking) untuk
//! send/receive blocking dan non-blocking, timeout, dan graceful shutdown.

mod bounded;
mod handle;

pub use bounded::{Channel, Iter, TryIter};
pub use handle::{bounded, bounded_with_config, IntoIter, Receiver, Sender};
