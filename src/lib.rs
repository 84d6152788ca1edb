//! Corong - Bounded Lock-Free MPMC Channel
//!
//! Arsitektur (tiap lapisan hanya bergantung pada lapisan sebelumnya):
//! - `core`: Lock-free circular buffer, slot state machine per index
//! - `sync`: Event auto-reset / manual-reset di atas futex
//! - `channel`: Blocking + non-blocking send/receive, timeout, close
//!
//! ```
//! use corong::{bounded, ChannelError};
//!
//! let (tx, rx) = bounded(8);
//! tx.send(1, None).unwrap();
//! tx.try_send(2).unwrap();
//! drop(tx);
//!
//! assert_eq!(rx.receive(None), Ok(1));
//! assert_eq!(rx.receive(None), Ok(2));
//! assert_eq!(rx.receive(None), Err(ChannelError::Eof));
//! ```

pub mod channel;
pub mod config;
pub mod core;
pub mod error;
pub mod sync;

pub use channel::{bounded, bounded_with_config, Channel, Receiver, Sender};
pub use config::ChannelConfig;
pub use error::{ChannelError, ConfigError, Result, SendError, TrySendError};
