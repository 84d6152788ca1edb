//! Sync module: parking primitive untuk menghindari busy-wait
//!
//! Dipakai channel saat buffer penuh/kosong. Independen dari `CircularBuffer`.

mod event;
mod futex;

pub use event::{Event, ResetMode, WaitStatus};
pub use futex::{Futex, WaitResult};
