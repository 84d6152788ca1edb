//! Sender/Receiver handle dengan shared ownership
//!
//! Channel hidup selama masih ada handle. Sender terakhir yang di-drop menutup
//! channel (receiver menguras sisa lalu `Eof`); receiver terakhir yang di-drop
//! juga menutup channel supaya sender tidak menunggu selamanya.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ChannelConfig;
use crate::error::{ConfigError, Result, SendError, TrySendError};

use super::bounded::{Channel, Iter, TryIter};

struct Shared<T> {
    channel: Channel<T>,
    senders: AtomicUsize,
    receivers: AtomicUsize,
}

/// Buat channel dengan `capacity` slot, dibagi menjadi sender dan receiver.
///
/// # Panics
/// Panic jika `capacity < 2`
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    split(Channel::new(capacity))
}

pub fn bounded_with_config<T>(
    config: ChannelConfig,
) -> std::result::Result<(Sender<T>, Receiver<T>), ConfigError> {
    Channel::with_config(config).map(split)
}

fn split<T>(channel: Channel<T>) -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        channel,
        senders: AtomicUsize::new(1),
        receivers: AtomicUsize::new(1),
    });
    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared },
    )
}

// State query + close, sama untuk kedua sisi
macro_rules! channel_state {
    ($handle:ident) => {
        impl<T> $handle<T> {
            pub fn close(&self) -> bool {
                self.shared.channel.close()
            }

            pub fn is_closed(&self) -> bool {
                self.shared.channel.is_closed()
            }

            pub fn len(&self) -> usize {
                self.shared.channel.len()
            }

            pub fn is_empty(&self) -> bool {
                self.shared.channel.is_empty()
            }

            pub fn is_full(&self) -> bool {
                self.shared.channel.is_full()
            }

            pub fn capacity(&self) -> usize {
                self.shared.channel.capacity()
            }
        }
    };
}

pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

channel_state!(Sender);

impl<T> Sender<T> {
    pub fn try_send(&self, value: T) -> std::result::Result<(), TrySendError<T>> {
        self.shared.channel.try_send(value)
    }

    pub fn send(&self, value: T, timeout: Option<Duration>) -> std::result::Result<(), SendError<T>> {
        self.shared.channel.send(value, timeout)
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.channel.close();
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sender").field(&self.shared.channel).finish()
    }
}

pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

channel_state!(Receiver);

impl<T> Receiver<T> {
    pub fn try_receive(&self) -> Result<T> {
        self.shared.channel.try_receive()
    }

    pub fn receive(&self, timeout: Option<Duration>) -> Result<T> {
        self.shared.channel.receive(timeout)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.shared.channel.iter()
    }

    pub fn try_iter(&self) -> TryIter<'_, T> {
        self.shared.channel.try_iter()
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        self.shared.receivers.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        if self.shared.receivers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.channel.close();
        }
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Receiver").field(&self.shared.channel).finish()
    }
}

impl<'a, T> IntoIterator for &'a Receiver<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T> IntoIterator for Receiver<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter { receiver: self }
    }
}

/// Owning blocking iterator, berhenti saat `Eof`
#[derive(Debug)]
pub struct IntoIter<T> {
    receiver: Receiver<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.receive(None).ok()
    }
}
